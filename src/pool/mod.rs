// Pool Module - mining pool statistics and dashboard refresh

pub mod dashboard;
pub mod unmineable;

pub use dashboard::{DashboardRefresher, DASHBOARD_REFRESH_INTERVAL};
pub use unmineable::{PoolStats, PoolStatsSource, UnmineableClient};
