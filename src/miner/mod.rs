// Miner Module - External miner supervision
//
// This module launches mining executables, streams their output
// and tears them down

pub mod backend;
pub mod process;
pub mod stream;
pub mod supervisor;

pub use backend::{Backend, LaunchSpec, MiningParams, BACKENDS};
pub use supervisor::{MinerSupervisor, StartOutcome};
