use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Admission gate in front of `grade_answer`. A grade costs two upstream
/// completions, so a burst of uploads is capped at `rps` grades and then
/// refilled continuously.
#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    bucket: Arc<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    capacity: f64,
    available: f64,
    refilled_at: Instant,
}

impl Bucket {
    fn full(capacity: f64) -> Self {
        Self {
            capacity,
            available: capacity,
            refilled_at: Instant::now(),
        }
    }

    /// Takes one grade's worth of budget, or reports how long until one frees up.
    fn take(&mut self, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.refilled_at).as_secs_f64();
        self.available = (self.available + elapsed * self.capacity).min(self.capacity);
        self.refilled_at = now;

        if self.available >= 1.0 {
            self.available -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.available) / self.capacity))
        }
    }
}

impl RateLimiter {
    /// `None` when `rps` is zero, which disables limiting.
    pub fn new(rps: u32) -> Option<Self> {
        (rps > 0).then(|| Self {
            rps,
            bucket: Arc::new(Mutex::new(Bucket::full(f64::from(rps)))),
        })
    }

    pub async fn check(&self) -> Result<(), String> {
        self.bucket
            .lock()
            .await
            .take(Instant::now())
            .map_err(|retry_after| {
                format!(
                    "grading rate limit reached (RATE_LIMIT_RPS={}): retry in ~{}ms",
                    self.rps,
                    retry_after.as_millis()
                )
            })
    }
}
