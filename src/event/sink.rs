// Log Sink
//
// Background threads never touch UI state. Every log line and refresh
// request goes through one mpsc queue that only the UI thread drains.
//

use crate::pool::PoolStats;
use crate::types::TokenBalance;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Which on-screen log view a line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogScope {
    Cpu,
    AmdGpu,
    NvidiaGpu,
    Harvest,
    Wallet,
    Dashboard,
}

impl LogScope {
    pub const ALL: [LogScope; 6] = [
        LogScope::Cpu,
        LogScope::AmdGpu,
        LogScope::NvidiaGpu,
        LogScope::Harvest,
        LogScope::Wallet,
        LogScope::Dashboard,
    ];

    pub fn title(self) -> &'static str {
        match self {
            LogScope::Cpu => "CPU Miner",
            LogScope::AmdGpu => "AMD GPU Miner",
            LogScope::NvidiaGpu => "NVIDIA GPU Miner",
            LogScope::Harvest => "Token Harvest",
            LogScope::Wallet => "Wallet",
            LogScope::Dashboard => "Dashboard",
        }
    }
}

impl fmt::Display for LogScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Events sent from worker threads to the UI thread
#[derive(Debug, Clone)]
pub enum UiEvent {
    Log {
        scope: LogScope,
        at: DateTime<Local>,
        line: String,
    },
    /// Ask the UI to re-read wallet balances
    RefreshRequested,
    Balances {
        native: f64,
        tokens: Vec<TokenBalance>,
    },
    Prices(HashMap<String, f64>),
    Pool(PoolStats),
}

/// Cloneable producer handle for the UI queue
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: Sender<UiEvent>,
}

impl LogSink {
    pub fn new(tx: Sender<UiEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiver the UI drains
    pub fn channel() -> (Self, Receiver<UiEvent>) {
        let (tx, rx) = channel();
        (Self::new(tx), rx)
    }

    /// Append a line to a module's log view (and to debug.log)
    pub fn log(&self, scope: LogScope, line: impl Into<String>) {
        let line = line.into();
        tracing::info!("[{}] {}", scope, line);
        self.send(UiEvent::Log {
            scope,
            at: Local::now(),
            line,
        });
    }

    /// Queue an event. A closed queue means the UI is gone; drop silently.
    pub fn send(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }

    pub fn request_refresh(&self) {
        self.send(UiEvent::RefreshRequested);
    }
}

/// Collect the log lines currently queued for `scope`
#[cfg(test)]
pub fn drain_lines(rx: &Receiver<UiEvent>, scope: LogScope) -> Vec<String> {
    rx.try_iter()
        .filter_map(|event| match event {
            UiEvent::Log { scope: s, line, .. } if s == scope => Some(line),
            _ => None,
        })
        .collect()
}
