//! Polling policy for scan status reads
//!
//! Fixed interval plus random jitter, so batched runs do not synchronize
//! into retry storms against the same API. The deadline lives in the
//! orchestrator's loop; this type only answers "how long until the next
//! read".

use rand::Rng;
use std::time::Duration;

/// Polling parameters for the scan-status loop.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Base interval between scan status reads
    pub interval: Duration,
    /// Random extra delay added to each interval, 0..=jitter
    pub jitter: Duration,
    /// Consecutive `ScanClean` observations required for a Clean verdict
    pub clean_confirmations: u32,
    /// Consecutive `ScanError` observations tolerated before failing
    pub max_scan_errors: u32,
    /// Overall wall-clock budget for the polling loop
    pub overall_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            jitter: Duration::from_millis(1500),
            clean_confirmations: 3,
            max_scan_errors: 3,
            overall_timeout: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    /// Delay before the next scan status read: interval plus jitter.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.interval;
        }
        let extra = rand::thread_rng().gen_range(0..=jitter_ms);
        self.interval + Duration::from_millis(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_stays_within_jitter_window() {
        let policy = PollPolicy {
            interval: Duration::from_millis(200),
            jitter: Duration::from_millis(100),
            ..PollPolicy::default()
        };
        for _ in 0..50 {
            let delay = policy.next_delay();
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(300));
        }
    }

    #[test]
    fn zero_jitter_is_exact_interval() {
        let policy = PollPolicy {
            interval: Duration::from_secs(5),
            jitter: Duration::ZERO,
            ..PollPolicy::default()
        };
        assert_eq!(policy.next_delay(), Duration::from_secs(5));
    }
}
