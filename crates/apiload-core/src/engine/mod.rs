pub mod aggregator;
pub mod runner;
pub mod virtual_user;

pub use aggregator::{RequestSample, StatsAggregator, CURRENT_RPS_WINDOW_SECS};
pub use runner::{run_load_test, LoadTestConfig, WaitTime};
