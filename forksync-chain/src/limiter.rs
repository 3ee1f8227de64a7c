use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota};

/// Client-side request budget for a single JSON-RPC endpoint.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    pub fn per_second(requests: NonZeroU32) -> Self {
        Self {
            inner: Arc::new(DefaultDirectRateLimiter::direct(Quota::per_second(requests))),
        }
    }

    pub async fn until_ready(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}
