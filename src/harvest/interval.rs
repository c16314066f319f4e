// Harvest Interval Plans
//
// Maps a configured interval to the main firing period and the
// shorter countdown period used for "time until next harvest" lines.
//

use crate::config::HarvestInterval;
use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Main and countdown periods for one interval setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPlan {
    pub main: Duration,
    pub countdown: Duration,
}

impl IntervalPlan {
    pub const fn new(main: Duration, countdown: Duration) -> Self {
        Self { main, countdown }
    }

    pub fn for_interval(interval: HarvestInterval) -> Self {
        match interval {
            // effectively never
            HarvestInterval::Off => Self::new(
                Duration::from_secs(1_000_000 * HOUR),
                Duration::from_secs(200_000 * HOUR),
            ),
            HarvestInterval::TenMinutes => Self::new(
                Duration::from_secs(10 * MINUTE),
                Duration::from_secs(2 * MINUTE),
            ),
            HarvestInterval::OneHour => {
                Self::new(Duration::from_secs(HOUR), Duration::from_secs(10 * MINUTE))
            }
            HarvestInterval::OneDay => {
                Self::new(Duration::from_secs(24 * HOUR), Duration::from_secs(2 * HOUR))
            }
        }
    }
}

/// Remaining time rounded to the minute, e.g. "1h50m0s" or "8m0s"
pub fn format_remaining(remaining: Duration) -> String {
    let minutes = (remaining.as_secs() + 30) / MINUTE;
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}h{}m0s", hours, minutes)
    } else {
        format!("{}m0s", minutes)
    }
}
