use crate::domain::jobs::JobId;
use crate::error::{Error, Result};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

/// Forget idle keys once this many are tracked.
const RETAIN_THRESHOLD: usize = 1024;

/// Per-job status polling limit. Each job id has its own budget so one
/// impatient client cannot slow down anybody else.
pub struct PollLimiter {
    limiter: DefaultKeyedRateLimiter<JobId>,
}

impl PollLimiter {
    pub fn per_second(rate: u32) -> Self {
        let rate = NonZeroU32::new(rate).unwrap_or(NonZeroU32::MIN);
        let burst = rate.saturating_mul(NonZeroU32::MIN.saturating_add(1));
        Self {
            limiter: RateLimiter::keyed(Quota::per_second(rate).allow_burst(burst)),
        }
    }

    pub fn check(&self, id: &JobId) -> Result<()> {
        if self.limiter.len() > RETAIN_THRESHOLD {
            self.limiter.retain_recent();
        }
        self.limiter.check_key(id).map_err(|_| Error::RateLimited)
    }
}
