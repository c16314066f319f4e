// Miner Process Control
//
// OS-level liveness checks and termination for miner processes:
// graceful signal to the tracked child, then a by-name sweep.
//

use std::thread;
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Check if a process is still alive
pub fn is_process_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }

    let mut sys = System::new();
    sys.refresh_process(Pid::from_u32(pid));
    sys.process(Pid::from_u32(pid)).is_some()
}

/// Ask `pid` to exit, force-kill it once `grace` has passed.
/// Returns true if the process is gone afterwards.
pub fn terminate(pid: u32, grace: Duration) -> bool {
    if !is_process_alive(pid) {
        return true;
    }

    send_terminate(pid);

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if !is_process_alive(pid) {
            tracing::debug!("[MinerProcess] PID {} exited after terminate", pid);
            return true;
        }
        thread::sleep(POLL_INTERVAL);
    }

    tracing::warn!("[MinerProcess] PID {} ignored terminate, killing", pid);
    let mut sys = System::new();
    sys.refresh_process(Pid::from_u32(pid));
    if let Some(process) = sys.process(Pid::from_u32(pid)) {
        process.kill();
    }
    thread::sleep(POLL_INTERVAL);
    !is_process_alive(pid)
}

#[cfg(unix)]
fn send_terminate(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid as NixPid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = kill(NixPid::from_raw(raw), Signal::SIGTERM) {
        tracing::warn!("[MinerProcess] SIGTERM to {} failed: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn send_terminate(pid: u32) {
    let mut sys = System::new();
    sys.refresh_process(Pid::from_u32(pid));
    if let Some(process) = sys.process(Pid::from_u32(pid)) {
        process.kill();
    }
}

/// Force-kill every process whose name or command line contains
/// `pattern`, except this one. Returns how many were signalled.
pub fn kill_matching(pattern: &str) -> usize {
    if pattern.is_empty() {
        return 0;
    }

    let own_pid = sysinfo::get_current_pid().ok();
    let mut sys = System::new();
    sys.refresh_processes();

    let mut killed = 0;
    for (pid, process) in sys.processes() {
        if Some(*pid) == own_pid {
            continue;
        }
        let matches = process.name().contains(pattern)
            || process.cmd().iter().any(|arg| arg.contains(pattern));
        if matches && process.kill() {
            tracing::info!("[MinerProcess] Killed PID {} ({})", pid.as_u32(), process.name());
            killed += 1;
        }
    }

    killed
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_pid_zero_is_never_alive() {
        assert!(!is_process_alive(0));
    }

    #[test]
    fn test_terminate_stops_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();
        assert!(is_process_alive(pid));

        let reaper = thread::spawn(move || child.wait());
        assert!(terminate(pid, Duration::from_secs(2)));
        assert!(!reaper.join().unwrap().unwrap().success());
    }

    #[test]
    fn test_kill_matching_sweeps_by_command_line() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 30; echo xoon-sweep-marker-51a7"])
            .spawn()
            .unwrap();
        thread::sleep(Duration::from_millis(100));

        assert_eq!(kill_matching("xoon-sweep-marker-51a7"), 1);
        assert!(!child.wait().unwrap().success());
    }

    #[test]
    fn test_kill_matching_ignores_unknown_pattern() {
        assert_eq!(kill_matching("xoon-no-such-miner-9f3c"), 0);
        assert_eq!(kill_matching(""), 0);
    }
}
