//! Repeat a reconciliation cycle on an interval, with optional jitter.

use crate::error::{DdnsError, Result};
use rand::Rng;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

/// Intervals below this many seconds disable repetition.
pub const MIN_INTERVAL_SECS: u64 = 10;

/// Parsed `--redo` value: `N` or `N[Rr]` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedoSpec {
    pub secs: u64,
    /// Sleep a random `[N, 2N)` seconds instead of exactly `N`.
    pub jitter: bool,
}

impl FromStr for RedoSpec {
    type Err = DdnsError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DdnsError::Config(format!("redo format: [0-9]+[Rr]?, got {:?}", s));

        let (digits, jitter) = match s.strip_suffix(['r', 'R']) {
            Some(digits) => (digits, true),
            None => (s, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        Ok(Self {
            secs: digits.parse().map_err(|_| invalid())?,
            jitter,
        })
    }
}

impl RedoSpec {
    /// Parse an optional flag value; absent or empty means run once.
    pub fn parse_optional(value: Option<&str>) -> Result<Self> {
        match value {
            None | Some("") => Ok(Self::default()),
            Some(s) => s.parse(),
        }
    }

    pub fn is_repeating(&self) -> bool {
        self.secs >= MIN_INTERVAL_SECS
    }

    /// Delay before the next cycle, or `None` when running once.
    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Option<Duration> {
        if !self.is_repeating() {
            return None;
        }
        let secs = if self.jitter {
            let upper = self.secs.saturating_mul(2).saturating_sub(1).max(self.secs);
            rng.random_range(self.secs..=upper)
        } else {
            self.secs
        };
        Some(Duration::from_secs(secs))
    }
}

/// Drives cycles: once, or forever on the redo interval.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    redo: RedoSpec,
}

impl Scheduler {
    pub fn new(redo: RedoSpec) -> Self {
        Self { redo }
    }

    /// Run `cycle` until the schedule ends.
    ///
    /// In single-shot mode the cycle's result is returned. When repeating,
    /// failures are logged and the loop continues; it only ends with the
    /// process.
    pub async fn run<F, Fut>(&self, mut cycle: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if !self.redo.is_repeating() {
            return cycle().await;
        }

        tracing::info!(
            "Repeating every {}s{}",
            self.redo.secs,
            if self.redo.jitter { " with random delay" } else { "" }
        );

        loop {
            if let Err(e) = cycle().await {
                tracing::error!("Cycle failed: {}", e);
            }

            let Some(delay) = self.redo.next_delay(&mut rand::rng()) else {
                return Ok(());
            };
            tracing::debug!("Sleeping {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_parse_plain() {
        let spec: RedoSpec = "60".parse().unwrap();
        assert_eq!(spec, RedoSpec { secs: 60, jitter: false });
        assert!(spec.is_repeating());
    }

    #[test]
    fn test_parse_jitter_suffix() {
        assert_eq!("20r".parse::<RedoSpec>().unwrap(), RedoSpec { secs: 20, jitter: true });
        assert_eq!("20R".parse::<RedoSpec>().unwrap(), RedoSpec { secs: 20, jitter: true });
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["abc", "r", "10x", "-5", "1 0", "10rr", "99999999999999999999999"] {
            assert!(
                matches!(bad.parse::<RedoSpec>(), Err(DdnsError::Config(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(RedoSpec::parse_optional(None).unwrap(), RedoSpec::default());
        assert_eq!(RedoSpec::parse_optional(Some("")).unwrap(), RedoSpec::default());
        assert!(RedoSpec::parse_optional(Some("abc")).is_err());
    }

    #[test]
    fn test_below_minimum_runs_once() {
        let spec: RedoSpec = "9r".parse().unwrap();
        assert!(!spec.is_repeating());
        assert_eq!(spec.next_delay(&mut rand::rng()), None);
    }

    #[test]
    fn test_fixed_delay() {
        let spec: RedoSpec = "30".parse().unwrap();
        assert_eq!(spec.next_delay(&mut rand::rng()), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_jitter_bounds() {
        let spec: RedoSpec = "20r".parse().unwrap();
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let delay = spec.next_delay(&mut rng).unwrap();
            assert!(delay >= Duration::from_secs(20) && delay < Duration::from_secs(40));
        }
    }

    #[test]
    fn test_jitter_near_u64_max() {
        let spec: RedoSpec = "10000000000000000000r".parse().unwrap();
        let delay = spec.next_delay(&mut rand::rng()).unwrap();
        assert!(delay >= Duration::from_secs(10_000_000_000_000_000_000));

        let spec: RedoSpec = "18446744073709551615r".parse().unwrap();
        assert_eq!(spec.next_delay(&mut rand::rng()), Some(Duration::from_secs(u64::MAX)));
    }

    #[test]
    fn test_single_shot_returns_cycle_result() {
        let scheduler = Scheduler::new("5".parse().unwrap());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let result = tokio_test::block_on(scheduler.run(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DdnsError::IpDetection("offline".to_string()))
            }
        }));

        assert!(matches!(result, Err(DdnsError::IpDetection(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeats_through_failures() {
        let scheduler = Scheduler::new("10".parse().unwrap());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let run = scheduler.run(move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n % 2 == 0 {
                    Err(DdnsError::Network("unreachable".to_string()))
                } else {
                    Ok(())
                }
            }
        });

        // Cycles at t = 0, 10, 20, 30.
        let result = tokio::time::timeout(Duration::from_secs(35), run).await;
        assert!(result.is_err(), "loop must not end on its own");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
