//! Per-signer replay records
//!
//! Records are keyed by signer key name and kept in refresh order: the front
//! of the map is the least recently refreshed record, and a refresh moves a
//! record to the back. Eviction therefore always pops from the front.

use indexmap::IndexMap;
use std::time::Duration;
use vouch_core::Name;

/// Last accepted request timestamp for one signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRecord {
    /// Signer key name
    pub key_name: Name,
    /// Signer-supplied timestamp of the last accepted request, in ms
    pub timestamp: u64,
    /// Local monotonic time of the last refresh
    pub last_refreshed: Duration,
}

/// Why a timestamp was not recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayRejection {
    /// First sighting of the signer, outside the grace window
    OutOfGrace,
    /// Not strictly after the stored timestamp
    Reordered {
        /// Stored timestamp
        last: u64,
    },
}

/// Signer-indexed, refresh-ordered record store
#[derive(Debug, Clone, Default)]
pub struct ReplayCache {
    records: IndexMap<Name, ReplayRecord>,
}

impl ReplayCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for `key_name`
    pub fn get(&self, key_name: &Name) -> Option<&ReplayRecord> {
        self.records.get(key_name)
    }

    /// Records from least to most recently refreshed
    pub fn iter(&self) -> impl Iterator<Item = &ReplayRecord> {
        self.records.values()
    }

    /// Drop records refreshed at or before `now - ttl`, then the oldest
    /// records beyond `max_records`. Returns the number evicted.
    pub fn cleanup(&mut self, now: Duration, ttl: Duration, max_records: Option<usize>) -> usize {
        let mut evicted = 0;
        if let Some(cutoff) = now.checked_sub(ttl) {
            while self
                .records
                .first()
                .is_some_and(|(_, record)| record.last_refreshed <= cutoff)
            {
                if let Some((key, _)) = self.records.shift_remove_index(0) {
                    tracing::debug!(%key, "replay record expired");
                }
                evicted += 1;
            }
        }
        evicted + self.trim(max_records)
    }

    fn trim(&mut self, max_records: Option<usize>) -> usize {
        let Some(max) = max_records else {
            return 0;
        };
        let mut evicted = 0;
        while self.records.len() > max {
            if let Some((key, _)) = self.records.shift_remove_index(0) {
                tracing::debug!(%key, "replay record evicted for capacity");
            }
            evicted += 1;
        }
        evicted
    }

    /// Record an accepted request timestamp for `key_name`.
    ///
    /// A first sighting must lie within `grace` of `receive_ms`; a repeat
    /// sighting must be strictly newer than the stored timestamp. Rejections
    /// leave the cache unchanged.
    pub fn record(
        &mut self,
        key_name: &Name,
        timestamp: u64,
        receive_ms: u64,
        now: Duration,
        grace: Duration,
        max_records: Option<usize>,
    ) -> Result<(), ReplayRejection> {
        match self.records.get(key_name) {
            None => {
                if Duration::from_millis(timestamp.abs_diff(receive_ms)) > grace {
                    return Err(ReplayRejection::OutOfGrace);
                }
                tracing::debug!(key = %key_name, timestamp, "replay record inserted");
            }
            Some(existing) => {
                if timestamp <= existing.timestamp {
                    return Err(ReplayRejection::Reordered {
                        last: existing.timestamp,
                    });
                }
                self.records.shift_remove(key_name);
                tracing::debug!(key = %key_name, timestamp, "replay record refreshed");
            }
        }

        self.records.insert(
            key_name.clone(),
            ReplayRecord {
                key_name: key_name.clone(),
                timestamp,
                last_refreshed: now,
            },
        );
        self.trim(max_records);
        Ok(())
    }
}
