// Config Module - Persisted harvest settings
//
// This module reads and writes solXENconfig.json and watches it for edits

pub mod harvest;
pub mod watcher;

pub use harvest::{read_config, write_config, HarvestConfig, HarvestInterval, CONFIG_FILE_NAME};
pub use watcher::{start_config_watcher, ReloadSignal};
