//! Record collection, aggregate statistics, and snapshot serialization.
//! The collection is keyed by (partition, service, region) so every output
//! form is deterministic regardless of resolution order.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::endpoint::{EndpointRecord, RecordKey, RecordSource};

/// A persisted snapshot failed to read or parse. Fatal for that load
/// operation only; a concurrently running resolution pass is unaffected.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot does not parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Aggregate counts over one snapshot, bucketed in priority order:
/// unreachable, then IPv6 by default, then IPv6 via dualstack, then IPv4
/// only. Unreachable combinations are excluded from `count_enabled` so
/// display percentages are not diluted by combinations that do not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub count_total: u32,
    pub count_enabled: u32,
    pub count_ipv6_default: u32,
    pub count_ipv6_dualstack: u32,
    pub count_ipv4_only: u32,
    pub count_nx: u32,
}

impl Stats {
    /// Share of enabled endpoints a bucket holds, for display.
    pub fn percent_of_enabled(&self, count: u32) -> f64 {
        if self.count_enabled == 0 {
            return 0.0;
        }
        f64::from(count) * 100.0 / f64::from(self.count_enabled)
    }
}

/// One snapshot's worth of endpoint records, unique per triple.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointCollection {
    records: BTreeMap<RecordKey, EndpointRecord>,
}

impl EndpointCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its (partition, service, region) key. A
    /// reinserted key replaces the previous record.
    pub fn insert(&mut self, record: EndpointRecord) {
        self.records.insert(record.key(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&EndpointRecord> {
        self.records.get(key)
    }

    /// Records in key order.
    pub fn records(&self) -> impl Iterator<Item = &EndpointRecord> {
        self.records.values()
    }

    pub fn stats(&self) -> Stats {
        let mut stats = Stats {
            count_total: 0,
            count_enabled: 0,
            count_ipv6_default: 0,
            count_ipv6_dualstack: 0,
            count_ipv4_only: 0,
            count_nx: 0,
        };

        for record in self.records.values() {
            if record.endpoint_default.is_absent() && record.endpoint_dualstack.is_absent() {
                stats.count_nx += 1;
            } else if record.endpoint_default.has_ipv6 {
                stats.count_ipv6_default += 1;
            } else if record.endpoint_dualstack.has_ipv6 {
                stats.count_ipv6_dualstack += 1;
            } else {
                stats.count_ipv4_only += 1;
            }
        }

        stats.count_enabled =
            stats.count_ipv6_default + stats.count_ipv6_dualstack + stats.count_ipv4_only;
        stats.count_total = stats.count_enabled + stats.count_nx;
        stats
    }

    /// The canonical snapshot form: a JSON array of records in key order.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        let records: Vec<&EndpointRecord> = self.records.values().collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    pub fn write_json_file(&self, path: &Path) -> Result<(), SnapshotError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Rehydrate a snapshot. Never re-triggers resolution or classification.
    pub async fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let values: Vec<serde_json::Value> = serde_json::from_str(raw)?;

        let mut collection = Self::new();
        for value in values {
            let record = EndpointRecord::build(RecordSource::FromPersisted(value)).await?;
            collection.insert(record);
        }
        Ok(collection)
    }

    pub async fn load_json_file(path: &Path) -> Result<Self, SnapshotError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw).await
    }

    /// The sorted flat-text listing consumed by the external change-tracking
    /// diff: one reachable endpoint per line, lexicographically ascending.
    pub fn flat_text(&self) -> String {
        let mut lines = Vec::new();
        for record in self.records.values() {
            if !record.endpoint_default.is_absent() {
                lines.push(format!("{} (default)", record.endpoint_default.to_listing()));
            }
            if !record.endpoint_dualstack.is_absent() {
                lines.push(format!("{} (dualstack)", record.endpoint_dualstack.to_listing()));
            }
        }
        lines.sort();

        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    pub fn write_text_file(&self, path: &Path) -> Result<(), SnapshotError> {
        fs::write(path, self.flat_text())?;
        Ok(())
    }
}
