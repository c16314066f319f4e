// Miner Output Stream
//
// Line filter and reader loop for a miner's stdout/stderr. Hashrate
// lines are throttled across both streams, pool banner lines dropped.
//

use crate::event::{LogScope, LogSink};
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const MINING_MARKER: &str = "Mining:";
pub const DROP_MARKER: &str = "Ecosystem";
pub const MINING_WINDOW: Duration = Duration::from_secs(10);
pub const EOF_BACKOFF: Duration = Duration::from_millis(100);

/// Per-line forwarding policy. Clones share the throttle timestamp.
#[derive(Debug, Clone)]
pub struct OutputFilter {
    last_mining_line: Arc<Mutex<Option<Instant>>>,
    window: Duration,
}

impl OutputFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            last_mining_line: Arc::new(Mutex::new(None)),
            window,
        }
    }

    /// The trimmed line if it should reach the log view
    pub fn admit<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }

        if line.contains(MINING_MARKER) {
            let mut last = self.last_mining_line.lock().unwrap();
            let now = Instant::now();
            if last.is_some_and(|t| now.duration_since(t) < self.window) {
                return None;
            }
            *last = Some(now);
            return Some(line);
        }

        if line.contains(DROP_MARKER) {
            return None;
        }

        Some(line)
    }
}

impl Default for OutputFilter {
    fn default() -> Self {
        Self::new(MINING_WINDOW)
    }
}

/// Everything a reader thread needs besides the stream itself
pub struct StreamReader<F: Fn() -> bool> {
    pub name: &'static str,
    pub scope: LogScope,
    pub filter: OutputFilter,
    pub sink: LogSink,
    pub eof_backoff: Duration,
    /// Checked on end-of-data; false ends the loop
    pub still_alive: F,
}

impl<F: Fn() -> bool> StreamReader<F> {
    /// Forward lines until a read error, or end-of-data once the
    /// session is gone. Returns the number of lines forwarded.
    pub fn run<R: Read>(&self, stream: R) -> usize {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        let mut forwarded = 0;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    if !(self.still_alive)() {
                        break;
                    }
                    tracing::trace!("[MinerStream] {} EOF, waiting", self.name);
                    thread::sleep(self.eof_backoff);
                }
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    if let Some(line) = self.filter.admit(&text) {
                        self.sink.log(self.scope, line);
                        forwarded += 1;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    self.sink.log(self.scope, format!("Error reading pipe: {}", e));
                    break;
                }
            }
        }

        tracing::debug!("[MinerStream] {} reader finished after {} lines", self.name, forwarded);
        forwarded
    }
}
