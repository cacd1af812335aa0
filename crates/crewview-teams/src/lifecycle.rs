//! First-seen / last-activity bookkeeping per team.
//!
//! Advisory only: existence of a team is always decided by live reads,
//! never by this table. Records are created from change events, not from
//! startup enumeration.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleRecord {
    pub created: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl LifecycleRecord {
    pub fn active_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created
    }
}

#[derive(Debug, Default)]
pub struct LifecycleTracker {
    records: HashMap<String, LifecycleRecord>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A team's config appeared. Inserts a record, or refreshes `last_seen`
    /// if one already exists.
    pub fn observe_created(&mut self, team: &str, now: DateTime<Utc>) {
        self.records
            .entry(team.to_string())
            .and_modify(|r| r.last_seen = now)
            .or_insert(LifecycleRecord {
                created: now,
                last_seen: now,
            });
    }

    /// A file of the team changed. Returns `false` when the team has no record.
    pub fn touch(&mut self, team: &str, now: DateTime<Utc>) -> bool {
        match self.records.get_mut(team) {
            Some(record) => {
                record.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// The team's config was removed.
    pub fn remove(&mut self, team: &str) -> Option<LifecycleRecord> {
        self.records.remove(team)
    }

    pub fn get(&self, team: &str) -> Option<&LifecycleRecord> {
        self.records.get(team)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
