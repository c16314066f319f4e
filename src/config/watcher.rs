// Config Watcher Thread
//
// Watches the directory holding solXENconfig.json using notify
// (inotify/FSEvents) and raises a reload signal when the file changes.
//

use super::harvest::CONFIG_FILE_NAME;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Ask the harvest scheduler to abandon its wait and re-read config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSignal;

/// Start config watcher thread
pub fn start_config_watcher(
    config_path: PathBuf,
    reload_sender: Sender<ReloadSignal>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = run_config_watcher(&config_path, reload_sender) {
            tracing::error!("[ConfigWatcher] Error: {}", e);
        }
    })
}

fn run_config_watcher(config_path: &Path, reload_sender: Sender<ReloadSignal>) -> notify::Result<()> {
    let watch_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    tracing::info!("[ConfigWatcher] Watching: {}", watch_dir.display());

    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

    let mut last_signal: Option<Instant> = None;

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(event)) => {
                if !is_config_write(&event) {
                    continue;
                }
                if last_signal.is_some_and(|t| t.elapsed() < DEBOUNCE) {
                    continue;
                }

                tracing::info!("[ConfigWatcher] Config changed on disk");
                last_signal = Some(Instant::now());

                if reload_sender.send(ReloadSignal).is_err() {
                    tracing::info!("[ConfigWatcher] Scheduler gone, shutting down");
                    break;
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("[ConfigWatcher] Watch error: {}", e);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("[ConfigWatcher] Channel disconnected, shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn is_config_write(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == CONFIG_FILE_NAME))
}
