// Miner Supervisor
//
// Owns at most one running miner per backend. A session is two reader
// threads (stdout, stderr) plus a waiter thread that owns the child
// and reports its exit.
//

use super::backend::{Backend, LaunchSpec};
use super::process;
use super::stream::{OutputFilter, StreamReader, EOF_BACKOFF, MINING_WINDOW};
use crate::error::MinerError;
use crate::event::LogSink;
use std::fs;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

const STOP_GRACE: Duration = Duration::from_secs(3);

/// Timing knobs for the supervisor
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub eof_backoff: Duration,
    pub mining_window: Duration,
    pub stop_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            eof_backoff: EOF_BACKOFF,
            mining_window: MINING_WINDOW,
            stop_grace: STOP_GRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: u32 },
    /// A session was already active; nothing was spawned
    AlreadyRunning,
    /// A stop is still tearing the previous session down
    Stopping,
}

/// The active mining session
#[derive(Debug, Clone)]
pub struct MiningSession {
    pub pid: u32,
    pub generation: u64,
    pub started_at: Instant,
    pub launch: LaunchSpec,
}

#[derive(Debug, Clone)]
pub struct MinerSupervisor {
    backend: &'static Backend,
    sink: LogSink,
    config: SupervisorConfig,
    mining: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    session: Arc<Mutex<Option<MiningSession>>>,
    /// Held for the whole of start and stop
    lifecycle: Arc<Mutex<()>>,
}

impl MinerSupervisor {
    pub fn new(backend: &'static Backend, sink: LogSink) -> Self {
        Self::with_config(backend, sink, SupervisorConfig::default())
    }

    pub fn with_config(backend: &'static Backend, sink: LogSink, config: SupervisorConfig) -> Self {
        Self {
            backend,
            sink,
            config,
            mining: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            session: Arc::new(Mutex::new(None)),
            lifecycle: Arc::new(Mutex::new(())),
        }
    }

    pub fn backend(&self) -> &'static Backend {
        self.backend
    }

    pub fn is_active(&self) -> bool {
        self.mining.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> Option<MiningSession> {
        self.session.lock().unwrap().clone()
    }

    /// Spawn the miner. A no-op while a session is active.
    pub fn start(&self, launch: LaunchSpec) -> Result<StartOutcome, MinerError> {
        // A stop's by-name sweep would kill anything spawned while it runs
        let _lifecycle = match self.lifecycle.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                self.sink
                    .log(self.backend.scope, "Miner is still stopping, try again in a moment");
                return Ok(StartOutcome::Stopping);
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        if self
            .mining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(StartOutcome::AlreadyRunning);
        }

        match self.spawn_session(launch) {
            Ok(pid) => Ok(StartOutcome::Started { pid }),
            Err(e) => {
                self.mining.store(false, Ordering::SeqCst);
                self.sink.log(self.backend.scope, format!("Error: {}", e));
                Err(e)
            }
        }
    }

    fn spawn_session(&self, launch: LaunchSpec) -> Result<u32, MinerError> {
        match fs::metadata(&launch.work_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(MinerError::Directory {
                    path: launch.work_dir.clone(),
                    reason: "not a directory".to_string(),
                })
            }
            Err(e) => {
                return Err(MinerError::Directory {
                    path: launch.work_dir.clone(),
                    reason: e.to_string(),
                })
            }
        }

        self.sink.log(
            self.backend.scope,
            format!("Start Mining with {}... initiating takes a while", self.backend.name),
        );

        let mut child = Command::new(&launch.executable)
            .args(&launch.args)
            .current_dir(&launch.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MinerError::Spawn {
                exe: launch.executable.clone(),
                source,
            })?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            (out, _) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MinerError::Stream(if out.is_none() { "stdout" } else { "stderr" }));
            }
        };

        let pid = child.id();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.session.lock().unwrap() = Some(MiningSession {
            pid,
            generation,
            started_at: Instant::now(),
            launch,
        });
        tracing::info!("[MinerSupervisor] {} started, PID {}", self.backend.name, pid);

        let filter = OutputFilter::new(self.config.mining_window);
        self.spawn_reader("stdout", stdout, filter.clone(), generation);
        self.spawn_reader("stderr", stderr, filter, generation);
        self.spawn_waiter(child, generation);

        Ok(pid)
    }

    fn spawn_reader<R: std::io::Read + Send + 'static>(
        &self,
        name: &'static str,
        stream: R,
        filter: OutputFilter,
        generation: u64,
    ) {
        let mining = self.mining.clone();
        let current = self.generation.clone();
        let reader = StreamReader {
            name,
            scope: self.backend.scope,
            filter,
            sink: self.sink.clone(),
            eof_backoff: self.config.eof_backoff,
            still_alive: move || {
                mining.load(Ordering::SeqCst) && current.load(Ordering::SeqCst) == generation
            },
        };

        thread::spawn(move || {
            reader.run(stream);
        });
    }

    fn spawn_waiter(&self, mut child: Child, generation: u64) {
        let supervisor = self.clone();

        thread::spawn(move || {
            let scope = supervisor.backend.scope;
            match child.wait() {
                Ok(status) if status.success() => {
                    supervisor.sink.log(scope, "Mining completed successfully");
                }
                Ok(status) => {
                    supervisor
                        .sink
                        .log(scope, format!("Miner exited with error: {}", status));
                }
                Err(e) => {
                    supervisor
                        .sink
                        .log(scope, format!("Miner exited with error: {}", e));
                }
            }

            // A stop or a newer session owns the state now
            if supervisor.generation.load(Ordering::SeqCst) == generation {
                supervisor.session.lock().unwrap().take();
                supervisor.mining.store(false, Ordering::SeqCst);
            }
        });
    }

    /// Terminate the tracked miner, then sweep stray processes by name.
    /// Safe to call when idle. The session counts as active until the
    /// sweep is done, and starts are refused meanwhile.
    pub fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        self.generation.fetch_add(1, Ordering::SeqCst);
        let session = self.session.lock().unwrap().take();
        let was_active = self.mining.load(Ordering::SeqCst);

        if let Some(session) = &session {
            if !process::terminate(session.pid, self.config.stop_grace) {
                tracing::warn!("[MinerSupervisor] PID {} still alive after stop", session.pid);
            }
        }

        let swept = process::kill_matching(self.backend.kill_pattern);
        if swept > 0 {
            tracing::info!("[MinerSupervisor] Swept {} stray {} processes", swept, self.backend.name);
        }
        self.mining.store(false, Ordering::SeqCst);

        if was_active || session.is_some() {
            self.sink.log(self.backend.scope, "Mining stopped");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::event::sink::drain_lines;
    use crate::event::{LogScope, UiEvent};
    use std::path::PathBuf;
    use std::sync::mpsc::Receiver;
    use tempfile::tempdir;

    static TEST_BACKEND: Backend = Backend {
        name: "test-miner",
        scope: LogScope::Cpu,
        dir_name: "testMiner",
        exe_unix: "sh",
        exe_windows: "sh.exe",
        kill_pattern: "xoon-no-such-miner-4d1e",
        args: &[],
        algorithms: &[],
        default_algorithm: "",
        ports: &[],
        ssl_ports: &[],
        uses_threads: false,
    };

    fn shell(script: &str, work_dir: PathBuf) -> LaunchSpec {
        LaunchSpec {
            executable: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            work_dir,
        }
    }

    fn supervisor() -> (MinerSupervisor, Receiver<UiEvent>) {
        let (sink, rx) = LogSink::channel();
        let config = SupervisorConfig {
            eof_backoff: Duration::from_millis(5),
            mining_window: MINING_WINDOW,
            stop_grace: Duration::from_secs(2),
        };
        (MinerSupervisor::with_config(&TEST_BACKEND, sink, config), rx)
    }

    fn wait_until_idle(supervisor: &MinerSupervisor) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while supervisor.is_active() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_double_start_is_noop() {
        let dir = tempdir().unwrap();
        let (supervisor, rx) = supervisor();

        let first = supervisor.start(shell("sleep 30", dir.path().into())).unwrap();
        assert!(matches!(first, StartOutcome::Started { .. }));
        assert!(supervisor.is_active());

        let second = supervisor.start(shell("sleep 30", dir.path().into())).unwrap();
        assert_eq!(second, StartOutcome::AlreadyRunning);

        supervisor.stop();
        assert!(!supervisor.is_active());

        let lines = drain_lines(&rx, LogScope::Cpu);
        assert_eq!(lines.iter().filter(|l| l.starts_with("Start Mining")).count(), 1);
        assert!(lines.contains(&"Mining stopped".to_string()));
    }

    #[test]
    fn test_stop_when_idle() {
        let (supervisor, rx) = supervisor();
        supervisor.stop();
        supervisor.stop();

        assert!(!supervisor.is_active());
        assert!(drain_lines(&rx, LogScope::Cpu).is_empty());
    }

    #[test]
    fn test_missing_directory_aborts_start() {
        let dir = tempdir().unwrap();
        let (supervisor, rx) = supervisor();

        let result = supervisor.start(shell("true", dir.path().join("absent")));
        assert!(matches!(result, Err(MinerError::Directory { .. })));
        assert!(!supervisor.is_active());
        assert_eq!(drain_lines(&rx, LogScope::Cpu).len(), 1);
    }

    #[test]
    fn test_missing_executable_aborts_start() {
        let dir = tempdir().unwrap();
        let (supervisor, _rx) = supervisor();

        let launch = LaunchSpec {
            executable: dir.path().join("no-such-miner"),
            args: vec![],
            work_dir: dir.path().into(),
        };
        assert!(matches!(supervisor.start(launch), Err(MinerError::Spawn { .. })));
        assert!(!supervisor.is_active());
        assert!(supervisor.session().is_none());
    }

    #[test]
    fn test_output_filtered_and_exit_reported() {
        let dir = tempdir().unwrap();
        let (supervisor, rx) = supervisor();

        let script = "echo 'Mining: 1 H/s'; echo 'Mining: 2 H/s'; echo 'Ecosystem'; echo job >&2; exit 3";
        supervisor.start(shell(script, dir.path().into())).unwrap();
        wait_until_idle(&supervisor);
        thread::sleep(Duration::from_millis(50));

        let lines = drain_lines(&rx, LogScope::Cpu);
        assert!(!supervisor.is_active());
        assert!(lines.contains(&"Mining: 1 H/s".to_string()));
        assert!(!lines.contains(&"Mining: 2 H/s".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Ecosystem")));
        assert!(lines.contains(&"job".to_string()));
        assert!(lines.contains(&"Miner exited with error: exit status: 3".to_string()));
    }

    static STUBBORN_BACKEND: Backend = Backend {
        name: "stubborn-miner",
        scope: LogScope::Cpu,
        dir_name: "stubbornMiner",
        exe_unix: "sh",
        exe_windows: "sh.exe",
        kill_pattern: "xoon-stubborn-miner-9b2f",
        args: &[],
        algorithms: &[],
        default_algorithm: "",
        ports: &[],
        ssl_ports: &[],
        uses_threads: false,
    };

    #[test]
    fn test_start_during_stop_is_refused_and_survives() {
        let dir = tempdir().unwrap();
        let (sink, rx) = LogSink::channel();
        let config = SupervisorConfig {
            eof_backoff: Duration::from_millis(5),
            mining_window: MINING_WINDOW,
            stop_grace: Duration::from_millis(800),
        };
        let supervisor = MinerSupervisor::with_config(&STUBBORN_BACKEND, sink, config);

        // Ignores SIGTERM so the stop has to wait out its grace period
        let script = "trap '' TERM; sleep 30; echo xoon-stubborn-miner-9b2f";
        supervisor.start(shell(script, dir.path().into())).unwrap();
        thread::sleep(Duration::from_millis(100));

        let stopper = {
            let supervisor = supervisor.clone();
            thread::spawn(move || supervisor.stop())
        };
        thread::sleep(Duration::from_millis(100));

        assert!(supervisor.is_active());
        let during = supervisor.start(shell(script, dir.path().into())).unwrap();
        assert_eq!(during, StartOutcome::Stopping);

        stopper.join().unwrap();
        assert!(!supervisor.is_active());

        let after = supervisor.start(shell("sleep 30", dir.path().into())).unwrap();
        let StartOutcome::Started { pid } = after else {
            panic!("expected a fresh session, got {:?}", after);
        };
        thread::sleep(Duration::from_millis(200));
        assert!(supervisor.is_active());
        assert!(process::is_process_alive(pid));

        supervisor.stop();
        let lines = drain_lines(&rx, LogScope::Cpu);
        assert_eq!(lines.iter().filter(|l| l.starts_with("Start Mining")).count(), 2);
        assert!(lines.iter().any(|l| l.contains("still stopping")));
    }

    #[test]
    fn test_clean_exit_and_restart() {
        let dir = tempdir().unwrap();
        let (supervisor, rx) = supervisor();

        supervisor.start(shell("pwd", dir.path().into())).unwrap();
        wait_until_idle(&supervisor);
        thread::sleep(Duration::from_millis(50));

        let lines = drain_lines(&rx, LogScope::Cpu);
        assert!(lines.contains(&"Mining completed successfully".to_string()));
        let canonical = dir.path().canonicalize().unwrap();
        assert!(lines.iter().any(|l| PathBuf::from(l).canonicalize().ok() == Some(canonical.clone())));

        // Parent working directory is untouched
        assert_ne!(std::env::current_dir().unwrap(), canonical);

        let again = supervisor.start(shell("true", dir.path().into())).unwrap();
        assert!(matches!(again, StartOutcome::Started { .. }));
        wait_until_idle(&supervisor);
    }
}
