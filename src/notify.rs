//! Notification deduplication
//!
//! Several independent detection paths (scan, hint, trigger-based rescans)
//! can attempt to announce the same event within milliseconds; the cooldown
//! gate keeps observers from seeing duplicate announcements.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Cooldown gate keyed by announcement subject
pub struct NotificationDeduper {
    sent: DashMap<String, Instant>,
    cooldown: Duration,
}

impl NotificationDeduper {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            sent: DashMap::new(),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Record and allow the send iff the subject is new or its cooldown has
    /// elapsed; otherwise refuse without recording
    pub fn try_send(&self, subject: &str, now: Instant) -> bool {
        match self.sent.entry(subject.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) >= self.cooldown {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Evict records older than twice the cooldown
    pub fn sweep(&self, now: Instant) {
        let cutoff = self.cooldown * 2;
        self.sent
            .retain(|_, sent| now.saturating_duration_since(*sent) <= cutoff);
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }

    pub fn clear(&self) {
        self.sent.clear();
    }
}
