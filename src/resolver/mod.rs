//! Endpoint resolution. Turns a (service, partition, region) triple into a
//! normalized record by asking the ruleset collaborator for both endpoint
//! variants and classifying the resulting hostnames.

pub mod manager;

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::endpoint::classification::AddressClassifier;
use crate::endpoint::{EndpointInfo, EndpointRecord};

/// A resolved endpoint URL plus the ruleset's deprecation marker.
#[derive(Debug, Clone)]
pub struct ResolvedEndpoint {
    pub url: Url,
    pub deprecated: bool,
}

/// The ruleset-resolution collaborator. Derives an endpoint URL from
/// service/region/partition/variant inputs; which API operation anchors the
/// resolution is irrelevant to the URL.
pub trait RulesetResolver: Send + Sync {
    fn resolve(
        &self,
        service: &str,
        region: &str,
        partition: &str,
        dualstack: bool,
    ) -> Result<ResolvedEndpoint, ResolveError>;
}

/// The region-availability collaborator. An empty set means "unknown", and
/// callers assume the service is available everywhere; the upstream data
/// reports an empty list for some services that do exist, so treating empty
/// as "no regions" would drop them wholesale.
pub trait RegionAvailability: Send + Sync {
    fn available_regions(&self, service: &str, partition: &str) -> BTreeSet<String>;
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The requested variant is not modeled for this endpoint. Expected for
    /// dualstack on services that never grew one; recorded absent without a
    /// warning.
    #[error("the requested endpoint variant is not modeled")]
    UnsupportedVariant,
    #[error("no endpoint rule for service {service} in partition {partition}")]
    NoRule { service: String, partition: String },
    #[error("resolved endpoint is not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Immutable bundle of collaborator handles passed into every resolution.
/// All state a resolution touches travels through here.
#[derive(Clone)]
pub struct ResolveContext {
    pub ruleset: Arc<dyn RulesetResolver>,
    pub availability: Arc<dyn RegionAvailability>,
    pub classifier: Arc<dyn AddressClassifier>,
}

/// Resolve and classify one triple. Always yields a record; every failure
/// along the way degrades to absent endpoint data instead of propagating.
pub async fn resolve_record(
    service: &str,
    partition: &str,
    region: &str,
    context: &ResolveContext,
) -> EndpointRecord {
    let known_regions = context.availability.available_regions(service, partition);
    if !known_regions.is_empty() && !known_regions.contains(region) {
        // the service does not exist here; no network call needed
        return EndpointRecord::absent(service, partition, region);
    }

    let default = resolve_variant(service, partition, region, false, context.ruleset.as_ref());

    if let Some(endpoint) = &default
        && endpoint.deprecated
    {
        let mut record = EndpointRecord::absent(service, partition, region);
        record.deprecated = true;
        return record;
    }

    let dualstack = resolve_variant(service, partition, region, true, context.ruleset.as_ref());

    let default_host = host_of(default.as_ref());
    let mut dualstack_host = host_of(dualstack.as_ref());

    // A dualstack variant that lands on the default hostname is not a
    // separate endpoint; skip classifying it twice.
    if dualstack_host == default_host {
        dualstack_host = None;
    }

    let endpoint_default = classify_host(default_host, context).await;
    let endpoint_dualstack = classify_host(dualstack_host, context).await;

    EndpointRecord {
        service: service.to_string(),
        partition: partition.to_string(),
        region: region.to_string(),
        endpoint_default,
        endpoint_dualstack,
        deprecated: false,
    }
    .normalized()
}

fn resolve_variant(
    service: &str,
    partition: &str,
    region: &str,
    dualstack: bool,
    ruleset: &dyn RulesetResolver,
) -> Option<ResolvedEndpoint> {
    match ruleset.resolve(service, region, partition, dualstack) {
        Ok(endpoint) => Some(endpoint),
        Err(ResolveError::UnsupportedVariant) => None,
        Err(error) => {
            tracing::warn!(
                service,
                partition,
                region,
                dualstack,
                %error,
                "endpoint resolution failed"
            );
            None
        }
    }
}

fn host_of(endpoint: Option<&ResolvedEndpoint>) -> Option<String> {
    endpoint
        .and_then(|endpoint| endpoint.url.host_str())
        .map(str::to_string)
}

async fn classify_host(host: Option<String>, context: &ResolveContext) -> EndpointInfo {
    match host {
        Some(hostname) => {
            let families = context.classifier.classify(&hostname).await;
            EndpointInfo::classified(hostname, families)
        }
        None => EndpointInfo::absent(),
    }
}
