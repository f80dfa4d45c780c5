//! File-backed provider collaborator. Loads a JSON provider-data document
//! and serves the catalog, ruleset-resolution, and region-availability
//! interfaces from it. Hostnames are derived from per-partition DNS suffixes
//! unless a service rule overrides the template.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::catalog::{CatalogError, CatalogSource, PartitionMeta};
use crate::resolver::{RegionAvailability, ResolveError, ResolvedEndpoint, RulesetResolver};

const DEFAULT_HOSTNAME_TEMPLATE: &str = "{service}.{region}.{dnsSuffix}";
const DEFAULT_DUALSTACK_TEMPLATE: &str = "{service}.{region}.{dualstackDnsSuffix}";

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderData {
    pub partitions: Vec<PartitionData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartitionData {
    pub partition: String,
    pub dns_suffix: String,
    pub dualstack_dns_suffix: String,
    #[serde(default = "default_true")]
    pub supports_dualstack: bool,
    #[serde(default)]
    pub regions: BTreeMap<String, RegionData>,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionData {
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRule {
    /// Regions the service is known to exist in; empty means unknown, and
    /// consumers assume the service is available everywhere.
    #[serde(default)]
    pub regions: BTreeSet<String>,
    /// Hostname template override for the default variant.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Hostname template override for the dualstack variant.
    #[serde(default)]
    pub dualstack_hostname: Option<String>,
    /// Whether the service models a dualstack variant at all.
    #[serde(default = "default_true")]
    pub dualstack: bool,
    #[serde(default)]
    pub deprecated: bool,
}

fn default_true() -> bool {
    true
}

/// Provider backed by one parsed provider-data document.
#[derive(Debug, Clone)]
pub struct FileProvider {
    data: ProviderData,
}

impl FileProvider {
    pub fn load(path: &Path) -> Result<FileProvider, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let data: ProviderData = serde_json::from_str(&raw)?;
        Ok(FileProvider { data })
    }

    pub fn from_data(data: ProviderData) -> FileProvider {
        FileProvider { data }
    }

    fn partition(&self, partition: &str) -> Option<&PartitionData> {
        self.data
            .partitions
            .iter()
            .find(|candidate| candidate.partition == partition)
    }

    fn rule(&self, partition: &str, service: &str) -> Option<(&PartitionData, &ServiceRule)> {
        let partition = self.partition(partition)?;
        let rule = partition.services.get(service)?;
        Some((partition, rule))
    }

    fn expand(template: &str, service: &str, region: &str, partition: &PartitionData) -> String {
        template
            .replace("{service}", service)
            .replace("{region}", region)
            .replace("{dnsSuffix}", &partition.dns_suffix)
            .replace("{dualstackDnsSuffix}", &partition.dualstack_dns_suffix)
    }
}

impl CatalogSource for FileProvider {
    fn partitions(&self) -> Result<Vec<PartitionMeta>, CatalogError> {
        Ok(self
            .data
            .partitions
            .iter()
            .map(|partition| PartitionMeta {
                partition: partition.partition.clone(),
                supports_dualstack: partition.supports_dualstack,
                regions: partition
                    .regions
                    .iter()
                    .map(|(name, region)| (name.clone(), region.description.clone()))
                    .collect(),
            })
            .collect())
    }

    fn services(&self) -> Result<BTreeSet<String>, CatalogError> {
        Ok(self
            .data
            .partitions
            .iter()
            .flat_map(|partition| partition.services.keys().cloned())
            .collect())
    }
}

impl RulesetResolver for FileProvider {
    fn resolve(
        &self,
        service: &str,
        region: &str,
        partition: &str,
        dualstack: bool,
    ) -> Result<ResolvedEndpoint, ResolveError> {
        let (partition, rule) = self
            .rule(partition, service)
            .ok_or_else(|| ResolveError::NoRule {
                service: service.to_string(),
                partition: partition.to_string(),
            })?;

        if dualstack && !rule.dualstack {
            return Err(ResolveError::UnsupportedVariant);
        }

        let template = if dualstack {
            rule.dualstack_hostname
                .as_deref()
                .unwrap_or(DEFAULT_DUALSTACK_TEMPLATE)
        } else {
            rule.hostname.as_deref().unwrap_or(DEFAULT_HOSTNAME_TEMPLATE)
        };

        let hostname = Self::expand(template, service, region, partition);
        let url = Url::parse(&format!("https://{hostname}"))?;

        Ok(ResolvedEndpoint {
            url,
            deprecated: rule.deprecated,
        })
    }
}

impl RegionAvailability for FileProvider {
    fn available_regions(&self, service: &str, partition: &str) -> BTreeSet<String> {
        self.rule(partition, service)
            .map(|(_, rule)| rule.regions.clone())
            .unwrap_or_default()
    }
}
