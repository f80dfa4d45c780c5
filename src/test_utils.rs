//! Shared test doubles: a canned ruleset resolver, a canned address
//! classifier, and a small provider-data fixture for exercising resolution
//! without the network.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use url::Url;

use crate::endpoint::classification::{AddressClassifier, AddressFamilies};
use crate::provider::{FileProvider, ProviderData};
use crate::resolver::{RegionAvailability, ResolveError, ResolvedEndpoint, RulesetResolver};

#[derive(Debug, Clone)]
enum StaticEndpoint {
    Hostname { hostname: String, deprecated: bool },
    Unsupported,
    Broken,
}

/// Ruleset double answering from a fixed table keyed by
/// (service, region, partition, dualstack). Variants with no entry behave
/// like an unmodeled dualstack variant; default variants with no entry are a
/// resolution failure.
#[derive(Debug, Default)]
pub struct StaticRuleset {
    endpoints: BTreeMap<(String, String, String, bool), StaticEndpoint>,
    available: BTreeMap<(String, String), BTreeSet<String>>,
}

impl StaticRuleset {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(
        mut self,
        service: &str,
        region: &str,
        partition: &str,
        dualstack: bool,
        endpoint: StaticEndpoint,
    ) -> Self {
        self.endpoints.insert(
            (
                service.to_string(),
                region.to_string(),
                partition.to_string(),
                dualstack,
            ),
            endpoint,
        );
        self
    }

    pub fn with_hostname(
        self,
        service: &str,
        region: &str,
        partition: &str,
        dualstack: bool,
        hostname: &str,
    ) -> Self {
        self.set(
            service,
            region,
            partition,
            dualstack,
            StaticEndpoint::Hostname {
                hostname: hostname.to_string(),
                deprecated: false,
            },
        )
    }

    pub fn with_deprecated(
        self,
        service: &str,
        region: &str,
        partition: &str,
        dualstack: bool,
        hostname: &str,
    ) -> Self {
        self.set(
            service,
            region,
            partition,
            dualstack,
            StaticEndpoint::Hostname {
                hostname: hostname.to_string(),
                deprecated: true,
            },
        )
    }

    pub fn with_unsupported(
        self,
        service: &str,
        region: &str,
        partition: &str,
        dualstack: bool,
    ) -> Self {
        self.set(service, region, partition, dualstack, StaticEndpoint::Unsupported)
    }

    pub fn with_broken(self, service: &str, region: &str, partition: &str, dualstack: bool) -> Self {
        self.set(service, region, partition, dualstack, StaticEndpoint::Broken)
    }

    pub fn with_available_regions(
        mut self,
        service: &str,
        partition: &str,
        regions: &[&str],
    ) -> Self {
        self.available.insert(
            (service.to_string(), partition.to_string()),
            regions.iter().map(|region| region.to_string()).collect(),
        );
        self
    }
}

impl RulesetResolver for StaticRuleset {
    fn resolve(
        &self,
        service: &str,
        region: &str,
        partition: &str,
        dualstack: bool,
    ) -> Result<ResolvedEndpoint, ResolveError> {
        let key = (
            service.to_string(),
            region.to_string(),
            partition.to_string(),
            dualstack,
        );

        match self.endpoints.get(&key) {
            Some(StaticEndpoint::Hostname {
                hostname,
                deprecated,
            }) => Ok(ResolvedEndpoint {
                url: Url::parse(&format!("https://{hostname}")).expect("fixture hostname"),
                deprecated: *deprecated,
            }),
            Some(StaticEndpoint::Unsupported) => Err(ResolveError::UnsupportedVariant),
            Some(StaticEndpoint::Broken) => Err(ResolveError::NoRule {
                service: service.to_string(),
                partition: partition.to_string(),
            }),
            None if dualstack => Err(ResolveError::UnsupportedVariant),
            None => Err(ResolveError::NoRule {
                service: service.to_string(),
                partition: partition.to_string(),
            }),
        }
    }
}

impl RegionAvailability for StaticRuleset {
    fn available_regions(&self, service: &str, partition: &str) -> BTreeSet<String> {
        self.available
            .get(&(service.to_string(), partition.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

/// Classifier double answering from a fixed hostname table. Unknown
/// hostnames resolve to the fallback (no addresses unless set).
#[derive(Debug, Default)]
pub struct StaticClassifier {
    families: BTreeMap<String, AddressFamilies>,
    fallback: AddressFamilies,
}

impl StaticClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hostname: &str, has_ipv4: bool, has_ipv6: bool) -> Self {
        self.families.insert(
            hostname.to_string(),
            AddressFamilies { has_ipv4, has_ipv6 },
        );
        self
    }

    pub fn with_fallback(mut self, has_ipv4: bool, has_ipv6: bool) -> Self {
        self.fallback = AddressFamilies { has_ipv4, has_ipv6 };
        self
    }
}

#[async_trait]
impl AddressClassifier for StaticClassifier {
    async fn classify(&self, hostname: &str) -> AddressFamilies {
        self.families.get(hostname).copied().unwrap_or(self.fallback)
    }
}

/// A two-partition provider document covering the offline test catalog's
/// services.
pub fn fixture_provider() -> FileProvider {
    let document = serde_json::json!({
        "partitions": [
            {
                "partition": "aws",
                "dns_suffix": "amazonaws.com",
                "dualstack_dns_suffix": "api.aws",
                "supports_dualstack": true,
                "regions": {
                    "eu-central-1": { "description": "euc1" },
                    "eu-west-1": { "description": "euw1" },
                    "il-central-1": { "description": "ilc1" },
                    "us-east-2": { "description": "use2" }
                },
                "services": {
                    "apigateway": {
                        "regions": ["eu-central-1", "eu-west-1", "us-east-2"]
                    },
                    "ec2": {},
                    "iam": {
                        "hostname": "iam.{dnsSuffix}",
                        "dualstack": false
                    },
                    "secretsmanager": {},
                    "sts": {}
                }
            },
            {
                "partition": "aws-cn",
                "dns_suffix": "amazonaws.com.cn",
                "dualstack_dns_suffix": "api.amazonwebservices.com.cn",
                "supports_dualstack": true,
                "regions": {
                    "cn-north-1": { "description": "cnn1" }
                },
                "services": {
                    "apigateway": {},
                    "ec2": {},
                    "iam": {
                        "hostname": "iam.{dnsSuffix}",
                        "dualstack": false
                    },
                    "secretsmanager": {},
                    "sts": {}
                }
            }
        ]
    });

    let data: ProviderData = serde_json::from_value(document).expect("fixture provider data");
    FileProvider::from_data(data)
}
