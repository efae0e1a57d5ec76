//! Client-side request pacing.
//!
//! The credential quota is tracked by GitHub; this limiter only spaces
//! requests out so long tag walks do not trip the secondary (abuse)
//! rate limit.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default pace: GitHub allows 5000 requests/hour per credential, bursting
/// above ~10/s is what triggers abuse detection.
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// A shared request pacer built on `governor`.
///
/// Clones share the same budget, so one limiter can be handed to every
/// client built by a factory.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a limiter allowing `requests_per_second` (0 is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Wait until the next request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}
