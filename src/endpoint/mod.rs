//! Endpoint record model. One record per (partition, service, region) triple,
//! holding the classified default and dualstack endpoint of that combination.

pub mod classification;
pub mod db;

use serde::{Deserialize, Serialize};

use crate::collection::SnapshotError;
use crate::endpoint::classification::AddressFamilies;
use crate::resolver::ResolveContext;

/// One endpoint variant: its hostname and the address families it resolves
/// to. An endpoint that resolves to no address at all is treated as
/// non-existent, so `hostname` is `None` exactly when both flags are false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub hostname: Option<String>,
    pub has_ipv4: bool,
    pub has_ipv6: bool,
}

impl EndpointInfo {
    pub fn absent() -> Self {
        Self {
            hostname: None,
            has_ipv4: false,
            has_ipv6: false,
        }
    }

    /// Build from a classified hostname, clearing the hostname when
    /// classification found no address.
    pub fn classified(hostname: String, families: AddressFamilies) -> Self {
        if families.is_empty() {
            return Self::absent();
        }
        Self {
            hostname: Some(hostname),
            has_ipv4: families.has_ipv4,
            has_ipv6: families.has_ipv6,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.hostname.is_none()
    }

    /// Render as `hostname [tags]` for the flat-text listing, where tags is
    /// the comma-joined subset of {ipv4, ipv6} present. Empty when absent.
    pub fn to_listing(&self) -> String {
        let Some(hostname) = &self.hostname else {
            return String::new();
        };

        let mut tags = Vec::new();
        if self.has_ipv4 {
            tags.push("ipv4");
        }
        if self.has_ipv6 {
            tags.push("ipv6");
        }

        if tags.is_empty() {
            hostname.clone()
        } else {
            format!("{} [{}]", hostname, tags.join(", "))
        }
    }
}

/// Unique key of a record within a collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub partition: String,
    pub service: String,
    pub region: String,
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.partition, self.service, self.region)
    }
}

/// A classified (service, partition, region) combination.
///
/// Deprecated combinations keep their identity but carry no endpoint data.
/// The `deprecated` marker is serialized only when set, so the snapshot's
/// canonical five-field shape is unchanged for live records while deprecated
/// ones still survive a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub service: String,
    pub partition: String,
    pub region: String,
    pub endpoint_default: EndpointInfo,
    pub endpoint_dualstack: EndpointInfo,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
}

fn is_false(value: &bool) -> bool {
    !value
}

/// The two construction paths of a record. A fresh resolution goes through
/// the collaborators in the context; a persisted record is rehydrated from a
/// snapshot value and never resolves anything.
pub enum RecordSource<'a> {
    Fresh {
        service: &'a str,
        partition: &'a str,
        region: &'a str,
        context: &'a ResolveContext,
    },
    FromPersisted(serde_json::Value),
}

impl EndpointRecord {
    /// Build a record from one of the two construction paths. The `Fresh`
    /// path always returns `Ok`; `FromPersisted` fails on values that do not
    /// parse as a record.
    pub async fn build(source: RecordSource<'_>) -> Result<Self, SnapshotError> {
        match source {
            RecordSource::Fresh {
                service,
                partition,
                region,
                context,
            } => Ok(crate::resolver::resolve_record(service, partition, region, context).await),
            RecordSource::FromPersisted(value) => {
                let record: EndpointRecord = serde_json::from_value(value)?;
                Ok(record.normalized())
            }
        }
    }

    /// A record with no endpoint data for either variant.
    pub fn absent(service: &str, partition: &str, region: &str) -> Self {
        Self {
            service: service.to_string(),
            partition: partition.to_string(),
            region: region.to_string(),
            endpoint_default: EndpointInfo::absent(),
            endpoint_dualstack: EndpointInfo::absent(),
            deprecated: false,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            partition: self.partition.clone(),
            service: self.service.clone(),
            region: self.region.clone(),
        }
    }

    /// Apply the model invariant: a dualstack variant that shares the default
    /// variant's hostname is not a separate endpoint and is dropped.
    pub(crate) fn normalized(mut self) -> Self {
        let same_hostname = match (
            &self.endpoint_default.hostname,
            &self.endpoint_dualstack.hostname,
        ) {
            (Some(default), Some(dualstack)) => default == dualstack,
            _ => false,
        };

        if same_hostname {
            self.endpoint_dualstack = EndpointInfo::absent();
        }
        self
    }
}
