//! Rate limiting logic and state management.

mod clock;
mod limiter;

pub use clock::{Clock, SystemClock};
pub use limiter::{Decision, RateLimiter};

#[cfg(test)]
pub(crate) use clock::ManualClock;
