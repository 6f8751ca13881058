use crate::throttle::error::ThrottleError;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// A hard ceiling on calls per window for side feeds (warnings, news).
///
/// Unlike [`crate::RequestThrottle`] it never queues or waits: once the window's
/// allowance is spent, [`FeedLimiter::acquire`] fails until the window resets.
#[derive(Debug)]
pub struct FeedLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<(Option<Instant>, u32)>,
}

impl FeedLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new((None, 0)),
        }
    }

    /// Takes one call from the current window's allowance.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::QuotaExceeded`] with the time left until the
    /// window resets when the allowance is spent.
    pub fn acquire(&self) -> Result<(), ThrottleError> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (window_start, count) = &mut *state;

        let start = match *window_start {
            Some(start) if now.duration_since(start) < self.window => start,
            _ => {
                *window_start = Some(now);
                *count = 0;
                now
            }
        };

        if *count >= self.limit {
            return Err(ThrottleError::QuotaExceeded {
                limit: self.limit,
                window: self.window,
                retry_after: (start + self.window).saturating_duration_since(now),
            });
        }
        *count += 1;
        Ok(())
    }

    /// Calls still available in the current window.
    pub fn remaining(&self) -> u32 {
        let now = Instant::now();
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.0 {
            Some(start) if now.duration_since(start) < self.window => {
                self.limit.saturating_sub(state.1)
            }
            _ => self.limit,
        }
    }
}
