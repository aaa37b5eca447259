//! Rate limiting logic and state management.

mod client_id;
mod clock;
mod limiter;

pub use client_id::client_id;
pub use clock::{Clock, SystemClock};
pub use limiter::{ClientId, RateLimitPolicy, RateLimiter, UNIDENTIFIED_CLIENT};

#[cfg(test)]
pub(crate) use clock::ManualClock;
