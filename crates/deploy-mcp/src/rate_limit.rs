//! Sliding-window admission gate keyed by client identity.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_REQUESTS: usize = 50;
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(60_000);

/// Identity shared by every caller on a single-client transport (stdio).
pub const DEFAULT_CLIENT: &str = "default";

/// At most `max_requests` admissions per client in any trailing `window`.
///
/// Rejected calls are not recorded, so a client that keeps retrying recovers as soon as its
/// oldest admitted call leaves the window. Clients with nothing left in the window are dropped,
/// at most once per window, so finished HTTP sessions do not accumulate.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    history: Mutex<History>,
}

#[derive(Debug, Default)]
struct History {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl History {
    fn sweep(&mut self, now: Instant, window: Duration) {
        if self
            .last_sweep
            .is_some_and(|t| now.saturating_duration_since(t) < window)
        {
            return;
        }
        self.clients.retain(|_, calls| {
            purge(calls, now, window);
            !calls.is_empty()
        });
        self.last_sweep = Some(now);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            history: Mutex::new(History::default()),
        }
    }

    #[must_use]
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_allowed(&self, client: &str) -> bool {
        self.is_allowed_at(client, Instant::now())
    }

    /// Admit (and record) a call at `now`, or reject it without recording.
    pub fn is_allowed_at(&self, client: &str, now: Instant) -> bool {
        let mut history = self.history.lock();
        history.sweep(now, self.window);
        let calls = history.clients.entry(client.to_string()).or_default();
        purge(calls, now, self.window);
        if calls.len() >= self.max_requests {
            return false;
        }
        calls.push_back(now);
        true
    }

    /// Admissions left for `client` in the current window.
    #[must_use]
    pub fn remaining(&self, client: &str) -> usize {
        self.remaining_at(client, Instant::now())
    }

    #[must_use]
    pub fn remaining_at(&self, client: &str, now: Instant) -> usize {
        let mut history = self.history.lock();
        let used = match history.clients.get_mut(client) {
            Some(calls) => {
                purge(calls, now, self.window);
                calls.len()
            }
            None => 0,
        };
        if used == 0 {
            history.clients.remove(client);
        }
        self.max_requests.saturating_sub(used)
    }
}

fn purge(calls: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while calls
        .front()
        .is_some_and(|t| now.saturating_duration_since(*t) >= window)
    {
        calls.pop_front();
    }
}
