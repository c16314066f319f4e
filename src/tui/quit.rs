// Quit Guard
//
// The app exits only after 'q' is pressed four times, each press within
// one second of the previous one.
//

use std::time::{Duration, Instant};

pub const QUIT_PRESSES: u32 = 4;
pub const QUIT_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct QuitGuard {
    count: u32,
    last: Option<Instant>,
}

impl QuitGuard {
    /// Record a press at `now`; true once the sequence is complete
    pub fn press(&mut self, now: Instant) -> bool {
        let within = self
            .last
            .is_some_and(|last| now.saturating_duration_since(last) <= QUIT_WINDOW);
        self.count = if within { self.count + 1 } else { 1 };
        self.last = Some(now);
        self.count >= QUIT_PRESSES
    }

    pub fn presses(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_quick_presses_quit() {
        let mut guard = QuitGuard::default();
        let t0 = Instant::now();
        let ms = Duration::from_millis;

        assert!(!guard.press(t0));
        assert!(!guard.press(t0 + ms(300)));
        assert!(!guard.press(t0 + ms(900)));
        assert!(guard.press(t0 + ms(1500)));
    }

    #[test]
    fn test_slow_press_restarts_count() {
        let mut guard = QuitGuard::default();
        let t0 = Instant::now();
        let ms = Duration::from_millis;

        guard.press(t0);
        guard.press(t0 + ms(500));
        guard.press(t0 + ms(1000));
        assert!(!guard.press(t0 + ms(2100)));
        assert_eq!(guard.presses(), 1);

        assert!(!guard.press(t0 + ms(2200)));
        assert!(!guard.press(t0 + ms(2300)));
        assert!(guard.press(t0 + ms(2400)));
    }
}
