// Harvest Module - scheduled and manual SOL -> token harvests
//
// This module gates swaps on wallet balances and runs the recurring
// harvest thread that follows solXENconfig.json

pub mod harvester;
pub mod interval;
pub mod scheduler;

pub use harvester::{FireOutcome, Harvester};
pub use interval::IntervalPlan;
pub use scheduler::{HarvestScheduler, SchedulerTiming};
