use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Time source for [`Throttle`]; swapped for a fake in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fixed minimum gap between consecutive calls to a rate-limited provider.
pub struct Throttle {
    min_gap: Duration,
    last_call: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl Throttle {
    pub fn new(min_gap: Duration) -> Self {
        Self::with_clock(min_gap, Arc::new(TokioClock))
    }

    pub fn with_clock(min_gap: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_gap,
            last_call: Mutex::new(None),
            clock,
        }
    }

    /// Wait until the gap since the previous call has elapsed, then claim the slot.
    pub async fn ready(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let elapsed = self.clock.now().saturating_duration_since(last);
            let wait = self.min_gap.saturating_sub(elapsed);
            if !wait.is_zero() {
                debug!("Throttle: waiting {:.1}s", wait.as_secs_f64());
                self.clock.sleep(wait).await;
            }
        }
        *last_call = Some(self.clock.now());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Clock that advances only when slept on or told to.
    pub(crate) struct FakeClock {
        origin: Instant,
        offset: StdMutex<Duration>,
        pub sleeps: StdMutex<Vec<Duration>>,
    }

    impl FakeClock {
        pub(crate) fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: StdMutex::new(Duration::ZERO),
                sleeps: StdMutex::new(Vec::new()),
            }
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }

        pub(crate) fn total_slept(&self) -> Duration {
            self.sleeps.lock().unwrap().iter().sum()
        }
    }

    #[async_trait]
    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.origin + *self.offset.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            self.advance(duration);
        }
    }

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let clock = Arc::new(FakeClock::new());
        let throttle = Throttle::with_clock(Duration::from_secs(15), clock.clone());
        throttle.ready().await;
        assert!(clock.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_back_to_back_calls_wait_full_gap() {
        let clock = Arc::new(FakeClock::new());
        let throttle = Throttle::with_clock(Duration::from_secs(15), clock.clone());
        throttle.ready().await;
        throttle.ready().await;
        throttle.ready().await;
        assert_eq!(
            *clock.sleeps.lock().unwrap(),
            vec![Duration::from_secs(15), Duration::from_secs(15)]
        );
    }

    #[tokio::test]
    async fn test_elapsed_time_counts_toward_gap() {
        let clock = Arc::new(FakeClock::new());
        let throttle = Throttle::with_clock(Duration::from_secs(15), clock.clone());
        throttle.ready().await;
        clock.advance(Duration::from_secs(10));
        throttle.ready().await;
        clock.advance(Duration::from_secs(20));
        throttle.ready().await;
        assert_eq!(*clock.sleeps.lock().unwrap(), vec![Duration::from_secs(5)]);
    }
}
