//! Rate limiting for repeated actions.
//!
//! A [`ThrottlePolicy`] decides whether an action on a subject (a plugin
//! restart, an alarm re-notification) may happen now, given when it last
//! happened and how often it happened inside a sliding window. The alarm
//! engine rebuilds a [`ThrottleRecord`] from its stored key state;
//! [`ActionThrottle`] keeps records in memory for the daemon.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// The action may proceed.
    Allow,
    /// Too soon since the last action; retry after the given delay.
    Wait(Duration),
    /// Too many actions inside the window.
    Exhausted,
}

impl ThrottleDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ThrottleDecision::Allow)
    }
}

/// History of an action on one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrottleRecord {
    pub last: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recent: Vec<DateTime<Utc>>,
}

impl ThrottleRecord {
    /// A record whose only known action happened at `last`.
    pub fn from_last(last: Option<DateTime<Utc>>) -> Self {
        Self {
            last,
            recent: last.into_iter().collect(),
        }
    }

    /// Record an action at `now`, dropping entries older than `window`.
    pub fn record(&mut self, now: DateTime<Utc>, window: Duration) {
        self.prune(now, window);
        self.recent.push(now);
        self.last = Some(now);
    }

    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        let window = to_chrono(window);
        self.recent.retain(|t| now - *t <= window);
    }

    /// Number of recorded actions inside `window` of `now`.
    pub fn count_within(&self, now: DateTime<Utc>, window: Duration) -> u32 {
        let window = to_chrono(window);
        self.recent.iter().filter(|t| now - **t <= window).count() as u32
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(36500))
}

/// Minimum spacing and optional windowed cap for an action.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottlePolicy {
    min_interval: Duration,
    max_attempts: Option<u32>,
    window: Duration,
}

impl ThrottlePolicy {
    /// Allow at most one action per `min_interval`.
    pub fn interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            max_attempts: None,
            window: min_interval,
        }
    }

    /// Additionally cap the number of actions inside a sliding `window`.
    pub fn with_limit(mut self, max_attempts: u32, window: Duration) -> Self {
        self.max_attempts = Some(max_attempts);
        self.window = window;
        self
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether an action may happen at `now`.
    pub fn decide(&self, record: &ThrottleRecord, now: DateTime<Utc>) -> ThrottleDecision {
        if let Some(max) = self.max_attempts {
            if record.count_within(now, self.window) >= max {
                return ThrottleDecision::Exhausted;
            }
        }

        match record.last {
            Some(last) => {
                let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
                if elapsed >= self.min_interval {
                    ThrottleDecision::Allow
                } else {
                    ThrottleDecision::Wait(self.min_interval - elapsed)
                }
            }
            None => ThrottleDecision::Allow,
        }
    }
}

/// In-memory throttle keyed by subject.
pub struct ActionThrottle {
    policy: ThrottlePolicy,
    records: DashMap<String, ThrottleRecord>,
}

impl ActionThrottle {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            records: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    /// Check the policy and record the action when allowed.
    pub fn try_acquire(&self, subject: &str) -> ThrottleDecision {
        self.try_acquire_at(subject, Utc::now())
    }

    pub fn try_acquire_at(&self, subject: &str, now: DateTime<Utc>) -> ThrottleDecision {
        let mut record = self.records.entry(subject.to_string()).or_default();
        let decision = self.policy.decide(&record, now);
        if decision.is_allowed() {
            record.record(now, self.policy.window);
        } else {
            debug!("Throttled action on '{}': {:?}", subject, decision);
        }
        decision
    }

    /// Number of recent actions recorded for a subject.
    pub fn count(&self, subject: &str) -> u32 {
        self.records
            .get(subject)
            .map(|r| r.count_within(Utc::now(), self.policy.window))
            .unwrap_or(0)
    }

    pub fn reset(&self, subject: &str) {
        self.records.remove(subject);
    }
}
