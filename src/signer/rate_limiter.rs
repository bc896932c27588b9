//! Token-bucket limiter guarding signer requests.
//!
//! Grounded directly in the teacher's own use of `governor` in its server
//! bootstrap (`RateLimiter::direct(Quota::per_minute(..))`); the original
//! implementation's comment on `t.limiter.Take()` explains why one exists at
//! all: "a safety guard to never go over the signer's advertised
//! capabilities so the client does not exceed limits or get banned."

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorLimiter};

pub(crate) struct SignRateLimiter {
    inner: GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl SignRateLimiter {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(requests_per_minute.max(1)).expect("checked above"),
        );
        SignRateLimiter {
            inner: GovernorLimiter::direct(quota),
        }
    }

    /// Blocks until a slot is available.
    pub async fn take(&self) {
        self.inner.until_ready().await;
    }
}
