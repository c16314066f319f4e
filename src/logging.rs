// Logging Setup
//
// The terminal belongs to the UI, so tracing output is appended to
// debug.log beside the executable. RUST_LOG overrides the default level.
//

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "info";

pub fn init(log_file: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    Ok(())
}
