//! Brute-force protection for password logins
//!
//! Failed attempts are counted per normalized username. Reaching the limit
//! locks the username for a fixed duration. Expired entries are swept on
//! every access, so the map only holds usernames with recent failures.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default number of failures before a lockout
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration
pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Attempts {
    count: u32,
    last_failure: Instant,
    locked_until: Option<Instant>,
}

/// Result of recording a failed login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// More attempts are allowed before a lockout
    Remaining(u32),
    /// The username is now locked for this long
    Locked(Duration),
}

/// Per-username login throttle
#[derive(Debug)]
pub struct LoginThrottle {
    max_attempts: u32,
    lockout: Duration,
    entries: Mutex<HashMap<String, Attempts>>,
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCKOUT)
    }
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Attempts>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn sweep(&self, entries: &mut HashMap<String, Attempts>, now: Instant) {
        let lockout = self.lockout;
        entries.retain(|_, a| match a.locked_until {
            Some(until) => until > now,
            None => now.saturating_duration_since(a.last_failure) < lockout,
        });
    }

    /// Remaining lockout for a username, if it is locked
    pub fn locked_for(&self, username: &str) -> Option<Duration> {
        self.locked_for_at(username, Instant::now())
    }

    pub(crate) fn locked_for_at(&self, username: &str, now: Instant) -> Option<Duration> {
        let mut entries = self.entries();
        self.sweep(&mut entries, now);

        entries
            .get(username)
            .and_then(|a| a.locked_until)
            .map(|until| until.saturating_duration_since(now))
    }

    /// Count a failed login
    pub fn record_failure(&self, username: &str) -> FailureOutcome {
        self.record_failure_at(username, Instant::now())
    }

    pub(crate) fn record_failure_at(&self, username: &str, now: Instant) -> FailureOutcome {
        let mut entries = self.entries();
        self.sweep(&mut entries, now);

        let attempts = entries.entry(username.to_string()).or_insert(Attempts {
            count: 0,
            last_failure: now,
            locked_until: None,
        });
        attempts.count += 1;
        attempts.last_failure = now;

        if attempts.count >= self.max_attempts {
            attempts.locked_until = Some(now + self.lockout);
            FailureOutcome::Locked(self.lockout)
        } else {
            FailureOutcome::Remaining(self.max_attempts - attempts.count)
        }
    }

    /// Forget failures after a successful login
    pub fn clear(&self, username: &str) {
        self.entries().remove(username);
    }
}
