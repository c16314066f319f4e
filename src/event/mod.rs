// Event Module - UI event queue
//
// This module carries log lines and refresh requests to the UI thread

pub mod sink;

pub use sink::{LogScope, LogSink, UiEvent};
