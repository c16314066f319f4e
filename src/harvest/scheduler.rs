// Harvest Scheduler Thread
//
// Re-reads the config each cycle, waits out the interval while
// logging a countdown, then fires one harvest. A reload signal
// abandons the wait and starts a new cycle.
//

use super::harvester::Harvester;
use super::interval::{format_remaining, IntervalPlan};
use crate::config::harvest::UnknownInterval;
use crate::config::{read_config, HarvestInterval, ReloadSignal};
use crate::event::{LogScope, LogSink};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Scheduler wait periods
#[derive(Debug, Clone)]
pub struct SchedulerTiming {
    pub off: IntervalPlan,
    pub ten_minutes: IntervalPlan,
    pub one_hour: IntervalPlan,
    pub one_day: IntervalPlan,
    /// Wait before retrying an unreadable config
    pub config_retry: Duration,
    /// Extra reload signals arriving within this window are merged
    pub reload_coalesce: Duration,
}

impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            off: IntervalPlan::for_interval(HarvestInterval::Off),
            ten_minutes: IntervalPlan::for_interval(HarvestInterval::TenMinutes),
            one_hour: IntervalPlan::for_interval(HarvestInterval::OneHour),
            one_day: IntervalPlan::for_interval(HarvestInterval::OneDay),
            config_retry: Duration::from_secs(60 * 60),
            reload_coalesce: Duration::from_millis(300),
        }
    }
}

impl SchedulerTiming {
    pub fn plan(&self, interval: HarvestInterval) -> IntervalPlan {
        match interval {
            HarvestInterval::Off => self.off,
            HarvestInterval::TenMinutes => self.ten_minutes,
            HarvestInterval::OneHour => self.one_hour,
            HarvestInterval::OneDay => self.one_day,
        }
    }
}

/// Why a wait ended
enum Wake {
    Deadline,
    Reload,
    Shutdown,
}

pub struct HarvestScheduler {
    config_path: PathBuf,
    harvester: Harvester,
    sink: LogSink,
    timing: SchedulerTiming,
}

impl HarvestScheduler {
    pub fn new(config_path: PathBuf, harvester: Harvester, sink: LogSink) -> Self {
        Self {
            config_path,
            harvester,
            sink,
            timing: SchedulerTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: SchedulerTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Start scheduler thread. Runs until every reload sender is dropped.
    pub fn start(self, reload: Receiver<ReloadSignal>) -> thread::JoinHandle<()> {
        thread::spawn(move || self.run(reload))
    }

    fn log(&self, line: impl Into<String>) {
        self.sink.log(LogScope::Harvest, line);
    }

    fn run(&self, reload: Receiver<ReloadSignal>) {
        tracing::info!("[Scheduler] Started for {}", self.config_path.display());

        loop {
            let config = match read_config(&self.config_path) {
                Ok(config) => config,
                Err(e) => {
                    self.log(format!("Failed to read config: {}", e));
                    match self.wait(&reload, Instant::now() + self.timing.config_retry) {
                        Wake::Shutdown => break,
                        _ => continue,
                    }
                }
            };

            let interval = match config.interval() {
                Ok(interval) => {
                    self.log(format!("Time until next harvest: {}", interval));
                    interval
                }
                Err(UnknownInterval(value)) => {
                    self.log(format!("Invalid harvest interval: {}. Using default Off.", value));
                    HarvestInterval::Off
                }
            };

            match self.countdown(&reload, self.timing.plan(interval)) {
                Wake::Deadline => {
                    let outcome = self.harvester.fire_once(&config);
                    tracing::debug!("[Scheduler] Harvest finished: {:?}", outcome);
                }
                Wake::Reload => self.log("Reloading configuration..."),
                Wake::Shutdown => break,
            }
        }

        tracing::info!("[Scheduler] Reload channel disconnected, shutting down");
    }

    /// Wait out `plan.main`, logging the remaining time every `plan.countdown`
    fn countdown(&self, reload: &Receiver<ReloadSignal>, plan: IntervalPlan) -> Wake {
        let started = Instant::now();
        let deadline = started + plan.main;
        let mut next_tick = started + plan.countdown;

        loop {
            match self.wait(reload, next_tick.min(deadline)) {
                Wake::Deadline if Instant::now() >= deadline => return Wake::Deadline,
                Wake::Deadline => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if !remaining.is_zero() {
                        self.log(format!("Time until next harvest: {}", format_remaining(remaining)));
                    }
                    next_tick += plan.countdown;
                }
                other => return other,
            }
        }
    }

    /// Block until `until` or a reload signal
    fn wait(&self, reload: &Receiver<ReloadSignal>, until: Instant) -> Wake {
        let timeout = until.saturating_duration_since(Instant::now());
        match reload.recv_timeout(timeout) {
            Ok(ReloadSignal) => {
                // The UI save and the file watcher both signal for one edit
                while reload.recv_timeout(self.timing.reload_coalesce).is_ok() {}
                Wake::Reload
            }
            Err(RecvTimeoutError::Timeout) => Wake::Deadline,
            Err(RecvTimeoutError::Disconnected) => Wake::Shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{write_config, HarvestConfig};
    use crate::event::sink::drain_lines;
    use crate::harvest::harvester::tests::{harvester, harvester_with, FlakyBalances, StubBalances, StubExchange};
    use crate::types::HarvestToken;
    use std::sync::mpsc::channel;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn fast_timing() -> SchedulerTiming {
        SchedulerTiming {
            ten_minutes: IntervalPlan::new(Duration::from_millis(150), Duration::from_millis(40)),
            config_retry: Duration::from_millis(50),
            reload_coalesce: Duration::from_millis(20),
            ..SchedulerTiming::default()
        }
    }

    fn wait_for_calls(exchange: &StubExchange, count: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if exchange.calls().len() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_reload_switches_interval() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solXENconfig.json");
        write_config(&path, &HarvestConfig::default()).unwrap();

        let exchange = Arc::new(StubExchange::default());
        let (core, rx) = harvester(1.0, 50_000.0, exchange.clone());
        let (reload_tx, reload_rx) = channel();
        let handle = HarvestScheduler::new(path.clone(), core, LogSink::channel().0)
            .with_timing(fast_timing())
            .start(reload_rx);

        // Off never fires
        thread::sleep(Duration::from_millis(300));
        assert!(exchange.calls().is_empty());

        let mut config = HarvestConfig::default();
        config.set_interval(HarvestInterval::TenMinutes);
        config.token_to_harvest = HarvestToken::SolXen;
        write_config(&path, &config).unwrap();
        reload_tx.send(ReloadSignal).unwrap();

        assert!(wait_for_calls(&exchange, 1));
        assert_eq!(exchange.calls()[0], (HarvestToken::SolXen, 0.001));

        drop(reload_tx);
        handle.join().unwrap();
        drop(rx);
    }

    #[test]
    fn test_balance_error_returns_to_idle_and_keeps_scheduling() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solXENconfig.json");
        let mut config = HarvestConfig::default();
        config.set_interval(HarvestInterval::TenMinutes);
        config.token_to_harvest = HarvestToken::SolXen;
        write_config(&path, &config).unwrap();

        let exchange = Arc::new(StubExchange::default());
        let balances = FlakyBalances {
            failures: Mutex::new(1),
            inner: StubBalances { native: 1.0, governance: 50_000.0 },
        };
        let (core, core_rx) = harvester_with(Arc::new(balances), exchange.clone());
        let (reload_tx, reload_rx) = channel();
        let handle = HarvestScheduler::new(path, core, LogSink::channel().0)
            .with_timing(fast_timing())
            .start(reload_rx);

        // First firing fails on the balance read, the next one swaps
        assert!(wait_for_calls(&exchange, 1));
        assert_eq!(exchange.calls()[0], (HarvestToken::SolXen, 0.001));

        drop(reload_tx);
        handle.join().unwrap();

        let lines = drain_lines(&core_rx, LogScope::Harvest);
        assert!(lines[0].starts_with("Error getting SOL balance:"));
        assert!(lines.iter().any(|l| l == "SOL: 0.001 -> solXEN: 1 successfully"));
    }

    #[test]
    fn test_reload_and_countdown_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solXENconfig.json");
        let mut config = HarvestConfig::default();
        config.set_interval(HarvestInterval::OneDay);
        write_config(&path, &config).unwrap();

        let exchange = Arc::new(StubExchange::default());
        let (core, _core_rx) = harvester(1.0, 50_000.0, exchange.clone());
        let (sink, rx) = LogSink::channel();
        let mut timing = fast_timing();
        timing.one_day = IntervalPlan::new(Duration::from_secs(3600), Duration::from_millis(30));

        let (reload_tx, reload_rx) = channel();
        let handle = HarvestScheduler::new(path, core, sink)
            .with_timing(timing)
            .start(reload_rx);

        thread::sleep(Duration::from_millis(120));
        reload_tx.send(ReloadSignal).unwrap();
        reload_tx.send(ReloadSignal).unwrap();
        thread::sleep(Duration::from_millis(100));
        drop(reload_tx);
        handle.join().unwrap();

        let lines = drain_lines(&rx, LogScope::Harvest);
        assert_eq!(lines[0], "Time until next harvest: 1d");
        assert!(lines.iter().any(|l| l == "Time until next harvest: 1h0m0s"));
        // two signals, one reload
        assert_eq!(lines.iter().filter(|l| *l == "Reloading configuration...").count(), 1);
        assert!(exchange.calls().is_empty());
    }

    #[test]
    fn test_unknown_interval_falls_back_to_off() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solXENconfig.json");
        let config = HarvestConfig {
            harvest_interval: "5m".into(),
            ..HarvestConfig::default()
        };
        write_config(&path, &config).unwrap();

        let exchange = Arc::new(StubExchange::default());
        let (core, _core_rx) = harvester(1.0, 50_000.0, exchange.clone());
        let (sink, rx) = LogSink::channel();
        let (reload_tx, reload_rx) = channel();
        let handle = HarvestScheduler::new(path, core, sink)
            .with_timing(fast_timing())
            .start(reload_rx);

        thread::sleep(Duration::from_millis(100));
        drop(reload_tx);
        handle.join().unwrap();

        assert_eq!(
            drain_lines(&rx, LogScope::Harvest),
            vec!["Invalid harvest interval: 5m. Using default Off."]
        );
        assert!(exchange.calls().is_empty());
    }

    #[test]
    fn test_unreadable_config_retries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solXENconfig.json");
        std::fs::write(&path, "{ not json").unwrap();

        let exchange = Arc::new(StubExchange::default());
        let (core, _core_rx) = harvester(1.0, 50_000.0, exchange);
        let (sink, rx) = LogSink::channel();
        let (reload_tx, reload_rx) = channel();
        let handle = HarvestScheduler::new(path, core, sink)
            .with_timing(fast_timing())
            .start(reload_rx);

        thread::sleep(Duration::from_millis(180));
        drop(reload_tx);
        handle.join().unwrap();

        let failures = drain_lines(&rx, LogScope::Harvest)
            .into_iter()
            .filter(|l| l.starts_with("Failed to read config:"))
            .count();
        assert!(failures >= 2);
    }
}
