use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Daemon startup polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Delay between readiness probes in milliseconds (valid range: 10-60000).
    pub poll_interval_ms: u64,
    /// Give up after this many probes. 0 = never give up.
    pub max_attempts: u32,
    /// Give up after this many seconds. 0 = no deadline.
    pub timeout_secs: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            max_attempts: 0,
            timeout_secs: 0,
        }
    }
}

impl StartupConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_attempts(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
