use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
pub const DEFAULT_MINE_INTERVAL_MIN_SECS: u64 = 5;
pub const DEFAULT_MINE_INTERVAL_MAX_SECS: u64 = 9;

pub(crate) const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(3);
pub(crate) const ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const CONSENSUS_TIMEOUT: Duration = Duration::from_secs(10);
