//! Core rate limiter implementation.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use parking_lot::Mutex;

use super::clock::{Clock, SystemClock};

/// Compact numeric identifier for a request client.
///
/// For IPv4 clients this is the four address octets packed big-endian
/// (see [`client_id`](super::client_id)). The value `0` is reserved for
/// "no usable client identity" and is never entered into limiter state.
pub type ClientId = u32;

/// Reserved [`ClientId`] meaning the client could not be identified.
pub const UNIDENTIFIED_CLIENT: ClientId = 0;

/// Default number of admitted requests per window.
const DEFAULT_REQUESTS: u32 = 100;
/// Default window length in seconds.
const DEFAULT_PERIOD_SECS: u64 = 3600;

/// A rate limit expressed as a request budget per fixed time window.
///
/// Both fields must be nonzero. The policy is fixed at limiter
/// construction and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum requests admitted per window.
    pub requests: u32,
    /// Window length in seconds.
    pub period_secs: u64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            requests: DEFAULT_REQUESTS,
            period_secs: DEFAULT_PERIOD_SECS,
        }
    }
}

/// Mutable limiter state guarded by a single lock.
///
/// `start` is `None` until the first counted request arrives, so the
/// first call always takes the rollover branch.
#[derive(Default)]
struct Window {
    /// Start of the current accounting window, in whole seconds since
    /// the limiter epoch, aligned to a multiple of the period.
    start: Option<u64>,
    /// Requests counted per client within the current window only.
    counts: HashMap<ClientId, u32>,
    /// Clients subject to limiting. Empty means every client is limited.
    tracked: HashSet<ClientId>,
}

/// Fixed-window request rate limiter keyed by client.
///
/// Call [`admit`](RateLimiter::admit) with the client's ID on every
/// incoming request. A return of `0` admits the request; a positive
/// return denies it and gives the number of seconds until the current
/// window resets. Counts from a finished window are discarded wholesale
/// at rollover, so memory never grows past the number of distinct
/// clients seen within one window.
///
/// Bursts that straddle a window boundary are not smoothed; each window
/// starts with a clean budget.
///
/// This struct is thread-safe and can be shared across tasks.
pub struct RateLimiter {
    /// The configured limit. Immutable, read without locking.
    policy: RateLimitPolicy,
    /// Zero point for all elapsed-time arithmetic.
    epoch: Instant,
    /// Time source, injectable for deterministic tests.
    clock: Box<dyn Clock>,
    /// Window state; every access goes through this lock.
    window: Mutex<Window>,
}

impl RateLimiter {
    /// Create a rate limiter driven by the system clock.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, SystemClock::new())
    }

    /// Create a rate limiter with an explicit time source.
    ///
    /// The limiter epoch is captured from the clock at this point.
    pub fn with_clock<C: Clock + 'static>(policy: RateLimitPolicy, clock: C) -> Self {
        let clock: Box<dyn Clock> = Box::new(clock);
        let epoch = clock.now();
        Self {
            policy,
            epoch,
            clock,
            window: Mutex::new(Window::default()),
        }
    }

    /// Record a request for `client` and decide its admission.
    ///
    /// Returns `0` when the request is admitted, otherwise the number of
    /// seconds to wait until the current window resets. The wait is
    /// advisory; this method never blocks or sleeps.
    ///
    /// The sentinel client `0` is admitted without being counted, as are
    /// all clients outside a non-empty tracked set.
    pub fn admit(&self, client: ClientId) -> u64 {
        let elapsed = self
            .clock
            .now()
            .saturating_duration_since(self.epoch)
            .as_secs();

        let mut window = self.window.lock();

        if client == UNIDENTIFIED_CLIENT {
            return 0;
        }
        if !window.tracked.is_empty() && !window.tracked.contains(&client) {
            return 0;
        }

        let window_start = window.start;
        match window_start {
            Some(start) if elapsed >= start && elapsed < start + self.policy.period_secs => {
                // Request falls within the current window.
                let count = window.counts.entry(client).or_insert(0);
                if *count < self.policy.requests {
                    *count += 1;
                    0
                } else {
                    self.policy.period_secs - (elapsed - start)
                }
            }
            _ => {
                // Window expired, or this is the first counted request.
                // Dropping the old counts is what reclaims memory.
                window.counts.clear();
                window.start = Some(elapsed - elapsed % self.policy.period_secs);
                window.counts.insert(client, 1);
                0
            }
        }
    }

    /// Subject `client` to rate limiting.
    ///
    /// Once the tracked set is non-empty, only tracked clients are
    /// limited; everyone else is admitted unconditionally and without
    /// being counted. The sentinel client `0` is silently ignored.
    pub fn track_client(&self, client: ClientId) {
        if client == UNIDENTIFIED_CLIENT {
            return;
        }
        self.window.lock().tracked.insert(client);
    }

    /// Number of distinct clients counted in the current window.
    pub fn client_count(&self) -> usize {
        self.window.lock().counts.len()
    }

    /// The limit this limiter enforces.
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::clock::ManualClock;
    use super::*;

    fn test_policy() -> RateLimitPolicy {
        RateLimitPolicy {
            requests: 2,
            period_secs: 10,
        }
    }

    fn test_limiter() -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new(Instant::now());
        let limiter = RateLimiter::with_clock(test_policy(), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn first_request_is_admitted() {
        let (limiter, _clock) = test_limiter();
        assert_eq!(limiter.admit(33), 0);
    }

    #[test]
    fn requests_beyond_budget_are_denied_for_the_rest_of_the_window() {
        let (limiter, _clock) = test_limiter();
        assert_eq!(limiter.admit(33), 0);
        assert_eq!(limiter.admit(33), 0);
        // No time has passed, so the full period remains.
        assert_eq!(limiter.admit(33), 10);
    }

    #[test]
    fn next_window_is_independent_of_the_previous_one() {
        let (limiter, clock) = test_limiter();
        assert_eq!(limiter.admit(33), 0);

        clock.advance(Duration::from_secs(11));

        assert_eq!(limiter.admit(33), 0);
        assert_eq!(limiter.admit(33), 0);
        // One second into the second window, nine remain.
        assert_eq!(limiter.admit(33), 9);
    }

    #[test]
    fn rollover_reclaims_counts_from_finished_windows() {
        let (limiter, clock) = test_limiter();
        assert_eq!(limiter.client_count(), 0);

        clock.advance(Duration::from_secs(103));
        limiter.admit(11);
        clock.advance(Duration::from_secs(1));
        limiter.admit(22);
        limiter.admit(11);
        assert_eq!(limiter.client_count(), 2);

        // Crossing into the next window drops both previous clients.
        clock.advance(Duration::from_secs(9));
        limiter.admit(33);
        assert_eq!(limiter.client_count(), 1);

        // Skipping a whole window entirely behaves the same.
        clock.advance(Duration::from_secs(16));
        limiter.admit(33);
        assert_eq!(limiter.client_count(), 1);
    }

    #[test]
    fn only_tracked_clients_are_limited_when_the_set_is_non_empty() {
        let (limiter, _clock) = test_limiter();
        let id1 = 0x7F00_0001;
        let id2 = 0x7F00_0002;

        limiter.track_client(id1);

        limiter.admit(id1);
        limiter.admit(id2);
        limiter.admit(id1);
        limiter.admit(id2);
        let wait1 = limiter.admit(id1);
        let wait2 = limiter.admit(id2);

        assert_eq!(wait1, 10);
        assert_eq!(wait2, 0);
        // Bypassed clients are invisible to the counters.
        assert_eq!(limiter.client_count(), 1);
    }

    #[test]
    fn sentinel_client_is_never_tracked_or_counted() {
        let (limiter, _clock) = test_limiter();

        limiter.track_client(UNIDENTIFIED_CLIENT);
        // The tracked set stayed empty, so ordinary clients are still limited.
        limiter.admit(33);
        limiter.admit(33);
        assert_eq!(limiter.admit(33), 10);

        assert_eq!(limiter.admit(UNIDENTIFIED_CLIENT), 0);
        assert_eq!(limiter.admit(UNIDENTIFIED_CLIENT), 0);
        assert_eq!(limiter.admit(UNIDENTIFIED_CLIENT), 0);
        assert_eq!(limiter.client_count(), 1);
    }

    #[test]
    fn read_accessors_do_not_mutate() {
        let (limiter, _clock) = test_limiter();
        assert_eq!(limiter.policy(), test_policy());

        limiter.admit(33);
        let before = limiter.client_count();
        assert_eq!(limiter.client_count(), before);
        assert_eq!(limiter.policy(), test_policy());
    }

    #[test]
    fn default_policy_matches_documented_limits() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.requests, 100);
        assert_eq!(policy.period_secs, 3600);
    }

    #[test]
    fn concurrent_admits_account_every_request_exactly_once() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(RateLimitPolicy {
            requests: 1000,
            period_secs: 3600,
        }));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    let mut denied = 0u32;
                    for _ in 0..300 {
                        if limiter.admit(33) > 0 {
                            denied += 1;
                        }
                    }
                    denied
                })
            })
            .collect();

        let denied: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 1200 requests against a budget of 1000 within one window.
        assert_eq!(denied, 200);
        assert_eq!(limiter.client_count(), 1);
    }
}
