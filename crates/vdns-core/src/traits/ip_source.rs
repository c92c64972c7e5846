// # IP Source Trait
//
// Defines the interface for a single public-address discovery source.
//
// ## Implementations
//
// - HTTP "what is my IP" endpoints: `vdns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use vdns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     // One lookup, no retries
//     let address = source.fetch().await?;
//     println!("{} reports {}", source.name(), address);
//
//     Ok(())
// }
// ```

use crate::record::AddressFamily;
use async_trait::async_trait;

/// Trait for a single address discovery source
///
/// A source answers for exactly one address family. Several sources are
/// chained by [`AddressResolver`](crate::AddressResolver) into a primary +
/// fallback list per family.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - Perform one outbound request per `fetch()` call
/// - Validate and normalize the response body
///
/// ## Forbidden Capabilities
/// - Retry or fall back to other endpoints (owned by `AddressResolver`)
/// - Cache addresses between calls (every cycle must observe fresh state)
/// - Spawn tasks
///
/// Every failure (transport error, non-2xx status, timeout, unparsable or
/// wrong-family body) is reported as an `Err`; the resolver decides what to
/// do next.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current public address
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The address exactly as the source reported it, trimmed
    /// - `Err(Error)`: If the source could not produce a valid address
    async fn fetch(&self) -> Result<String, crate::Error>;

    /// The address family this source reports
    fn family(&self) -> AddressFamily;

    /// Human-readable source name (for logging)
    fn name(&self) -> &str;
}
