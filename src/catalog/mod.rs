//! Partition/region/service catalog. Loads the region table and the service
//! identifier set from the metadata provider, dropping partitions without a
//! dualstack variant and services the engine cannot resolve.

pub mod test_data;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One region of the platform, tagged with its owning partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub partition: String,
    pub description: String,
}

/// Partition metadata as reported by the provider.
#[derive(Debug, Clone)]
pub struct PartitionMeta {
    pub partition: String,
    pub supports_dualstack: bool,
    /// region name -> human-readable description
    pub regions: BTreeMap<String, String>,
}

/// Provider-side catalog surface: partitions plus the known service set.
pub trait CatalogSource {
    fn partitions(&self) -> Result<Vec<PartitionMeta>, CatalogError>;
    fn services(&self) -> Result<BTreeSet<String>, CatalogError>;
}

/// The provider's metadata is missing or malformed. This is the only fatal
/// condition of a resolution run.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read provider data: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed provider data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("provider data contains no partitions")]
    NoPartitions,
}

/// Services that cannot be resolved without auxiliary parameters the engine
/// has no way to supply. Injected into the catalog load so alternate tables
/// are testable.
#[derive(Debug, Clone, Default)]
pub struct ServiceBlacklist {
    entries: BTreeMap<String, String>,
}

impl ServiceBlacklist {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The known-bad services of the live platform.
    pub fn builtin() -> Self {
        let mut list = Self::new();
        list.add(
            "cloudfront-keyvaluestore",
            "KVS ARN must be provided to use this service",
        );
        list.add("s3control", "AccountId is required but not set");
        list
    }

    pub fn add(&mut self, service: &str, reason: &str) {
        self.entries.insert(service.to_string(), reason.to_string());
    }

    pub fn contains(&self, service: &str) -> bool {
        self.entries.contains_key(service)
    }

    pub fn reason(&self, service: &str) -> Option<&str> {
        self.entries.get(service).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Partitions whose dualstack resolution fails wholesale even though the
/// provider does not flag them as unsupported. Kept as an explicit loader
/// parameter rather than folded into the provider data; revisit when the
/// upstream flags catch up.
pub const DEFAULT_EXCLUDED_PARTITIONS: &[&str] = &["aws-iso-e", "aws-iso-f"];

/// A single (service, partition, region) resolution target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub service: String,
    pub partition: String,
    pub region: String,
}

/// The read-only catalog a resolution pass runs against.
#[derive(Debug, Clone)]
pub struct Catalog {
    regions: BTreeMap<String, Region>,
    services: BTreeSet<String>,
}

impl Catalog {
    /// Build the catalog from provider metadata. Partitions without dualstack
    /// support and partitions on the exclusion list contribute no regions at
    /// all; blacklisted services are dropped silently.
    pub fn load(
        source: &dyn CatalogSource,
        blacklist: &ServiceBlacklist,
        excluded_partitions: &[&str],
    ) -> Result<Catalog, CatalogError> {
        let partitions = source.partitions()?;
        if partitions.is_empty() {
            return Err(CatalogError::NoPartitions);
        }

        let mut regions = BTreeMap::new();
        for partition in &partitions {
            if !partition.supports_dualstack {
                continue;
            }
            if excluded_partitions.contains(&partition.partition.as_str()) {
                tracing::info!(partition = %partition.partition, "excluding partition");
                continue;
            }
            for (name, description) in &partition.regions {
                regions.insert(
                    name.clone(),
                    Region {
                        name: name.clone(),
                        partition: partition.partition.clone(),
                        description: description.clone(),
                    },
                );
            }
        }

        let services = source
            .services()?
            .into_iter()
            .filter(|service| !blacklist.contains(service))
            .collect();

        Ok(Catalog { regions, services })
    }

    pub(crate) fn from_parts(regions: BTreeMap<String, Region>, services: BTreeSet<String>) -> Self {
        Catalog { regions, services }
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(String::as_str)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Every (service, partition, region) combination to resolve,
    /// service-major in lexical order. The order carries no meaning for the
    /// result; output is sorted at serialization time.
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples = Vec::with_capacity(self.services.len() * self.regions.len());
        for service in &self.services {
            for region in self.regions.values() {
                triples.push(Triple {
                    service: service.clone(),
                    partition: region.partition.clone(),
                    region: region.name.clone(),
                });
            }
        }
        triples
    }
}
