//! Public address discovery with per-family fallback chains
//!
//! Each family owns an ordered list of [`IpSource`]s: the first is the
//! primary, the rest are fallbacks. [`AddressResolver::resolve`] walks the
//! list until one source yields a valid address of the right family.
//! Exhausting the list is an expected outcome and yields an absent
//! [`DiscoveredAddress`], not an error.
//!
//! ```text
//! resolve(V4):  primary ──err──▶ fallback 1 ──err──▶ fallback 2 ──ok──▶ Some(addr)
//!                                                               └─err──▶ None
//! ```

use crate::record::{AddressFamily, DiscoveredAddress, Discovery};
use crate::traits::IpSource;
use std::net::IpAddr;
use tracing::{debug, info, warn};

/// Ordered discovery sources for both address families
#[derive(Default)]
pub struct AddressResolver {
    ipv4: Vec<Box<dyn IpSource>>,
    ipv6: Vec<Box<dyn IpSource>>,
}

impl AddressResolver {
    /// Create a resolver with no sources (both families disabled)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source to the chain of its family
    ///
    /// Sources are tried in the order they were added.
    pub fn add_source(&mut self, source: Box<dyn IpSource>) {
        match source.family() {
            AddressFamily::V4 => self.ipv4.push(source),
            AddressFamily::V6 => self.ipv6.push(source),
        }
    }

    /// Builder form of [`add_source`](Self::add_source)
    pub fn with_source(mut self, source: Box<dyn IpSource>) -> Self {
        self.add_source(source);
        self
    }

    /// Number of sources configured for `family`
    pub fn source_count(&self, family: AddressFamily) -> usize {
        self.chain(family).len()
    }

    fn chain(&self, family: AddressFamily) -> &[Box<dyn IpSource>] {
        match family {
            AddressFamily::V4 => &self.ipv4,
            AddressFamily::V6 => &self.ipv6,
        }
    }

    /// Discover the public address for one family
    ///
    /// Stops at the first source that succeeds. Each failing source is
    /// logged and skipped; no source is retried within one call.
    pub async fn resolve(&self, family: AddressFamily) -> DiscoveredAddress {
        let chain = self.chain(family);
        if chain.is_empty() {
            debug!("No {} sources configured, skipping discovery", family);
            return DiscoveredAddress::absent(family);
        }

        for (position, source) in chain.iter().enumerate() {
            match source.fetch().await {
                Ok(value) => match value.parse::<IpAddr>() {
                    Ok(ip) if family.matches(&ip) => {
                        if position > 0 {
                            info!(
                                "{} discovered via fallback source {} ({} of {})",
                                family,
                                source.name(),
                                position + 1,
                                chain.len()
                            );
                        } else {
                            debug!("{} discovered via {}: {}", family, source.name(), value);
                        }
                        return DiscoveredAddress::found(family, value);
                    }
                    _ => {
                        warn!(
                            "{} source {} returned an unusable address: {:?}",
                            family,
                            source.name(),
                            value
                        );
                    }
                },
                Err(e) => {
                    warn!("{} source {} failed: {}", family, source.name(), e);
                }
            }
        }

        warn!(
            "All {} {} sources failed, leaving {} records untouched this cycle",
            chain.len(),
            family,
            family.record_type()
        );
        DiscoveredAddress::absent(family)
    }

    /// Discover both families concurrently
    pub async fn resolve_all(&self) -> Discovery {
        let (v4, v6) = tokio::join!(
            self.resolve(AddressFamily::V4),
            self.resolve(AddressFamily::V6)
        );
        Discovery { v4, v6 }
    }
}
