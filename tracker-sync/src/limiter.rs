//! Admission gate: a token bucket throttling how fast repository syncs start.
//!
//! The gate limits the *rate of admission* only. Once admitted, a repository's
//! generator runs to completion alongside every other admitted one.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Token bucket with `burst` capacity refilled at `rate` tokens per second.
pub struct AdmissionGate {
    limiter: DirectLimiter,
    rate: NonZeroU32,
    burst: NonZeroU32,
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("rate", &self.rate)
            .field("burst", &self.burst)
            .finish()
    }
}

impl AdmissionGate {
    #[must_use]
    pub fn new(rate: NonZeroU32, burst: NonZeroU32) -> Self {
        let quota = Quota::per_second(rate).allow_burst(burst);
        Self {
            limiter: RateLimiter::direct(quota),
            rate,
            burst,
        }
    }

    /// Wait for one token.
    ///
    /// Returns [`SyncError::Cancelled`] as soon as `cancel` fires, whether it
    /// fired before the call or while waiting.
    pub async fn admit(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            _ = self.limiter.until_ready() => Ok(()),
        }
    }

    pub fn rate(&self) -> NonZeroU32 {
        self.rate
    }

    pub fn burst(&self) -> NonZeroU32 {
        self.burst
    }
}
