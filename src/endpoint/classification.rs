//! DNS address-family classification. Resolves a hostname through the
//! system resolver and records whether any IPv4 or IPv6 addresses come back.
//! Lookups are bounded by a timeout; a transient fault is retried once and
//! then treated the same as an unresolvable name.

use std::io::ErrorKind;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task;
use tokio::time::timeout;

/// Address families a hostname resolved to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressFamilies {
    pub has_ipv4: bool,
    pub has_ipv6: bool,
}

impl AddressFamilies {
    pub fn is_empty(&self) -> bool {
        !self.has_ipv4 && !self.has_ipv6
    }
}

/// Classifies a hostname into address families. Object-safe so resolution
/// can be exercised without the network.
#[async_trait]
pub trait AddressClassifier: Send + Sync {
    async fn classify(&self, hostname: &str) -> AddressFamilies;
}

enum LookupOutcome {
    Resolved(Vec<IpAddr>),
    Unresolved,
    Transient,
}

/// Live classifier backed by the system resolver (getaddrinfo). The port an
/// endpoint serves on is irrelevant here; only address families matter.
pub struct DnsClassifier {
    timeout_ms: u64,
    retries: u32,
}

impl DnsClassifier {
    pub fn new() -> Self {
        Self {
            timeout_ms: 5_000,
            retries: 1,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn lookup_once(&self, hostname: &str) -> LookupOutcome {
        let host = hostname.to_string();
        let lookup = task::spawn_blocking(move || dns_lookup::lookup_host(&host));

        match timeout(Duration::from_millis(self.timeout_ms), lookup).await {
            Ok(Ok(Ok(addrs))) => LookupOutcome::Resolved(addrs),
            Ok(Ok(Err(error))) => match error.kind() {
                ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock => {
                    LookupOutcome::Transient
                }
                // name not known, probably
                _ => LookupOutcome::Unresolved,
            },
            Ok(Err(_join_error)) => LookupOutcome::Transient,
            Err(_elapsed) => LookupOutcome::Transient,
        }
    }
}

impl Default for DnsClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AddressClassifier for DnsClassifier {
    async fn classify(&self, hostname: &str) -> AddressFamilies {
        for attempt in 0..=self.retries {
            match self.lookup_once(hostname).await {
                LookupOutcome::Resolved(addrs) => {
                    let mut families = AddressFamilies::default();
                    for addr in addrs {
                        match addr {
                            IpAddr::V4(_) => families.has_ipv4 = true,
                            IpAddr::V6(_) => families.has_ipv6 = true,
                        }
                    }
                    return families;
                }
                LookupOutcome::Unresolved => return AddressFamilies::default(),
                LookupOutcome::Transient if attempt < self.retries => {
                    tracing::debug!(hostname, attempt, "transient resolver fault, retrying");
                }
                LookupOutcome::Transient => return AddressFamilies::default(),
            }
        }

        AddressFamilies::default()
    }
}
