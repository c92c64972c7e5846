// # DNS Provider Trait
//
// Defines the interface for reading and mutating DNS records via a
// provider API.
//
// ## Implementations
//
// - Vercel: `vdns-provider-vercel` crate
//
// ## Usage
//
// ```rust,ignore
// use vdns_core::{AddressFamily, DnsProvider};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let records = provider.list_records("example.com").await?;
//     for record in &records {
//         println!("{} {} {}", record.name, record.record_type, record.value);
//     }
//
//     provider
//         .create_record("example.com", "home", AddressFamily::V4, "203.0.113.7")
//         .await?;
//
//     Ok(())
// }
// ```

use crate::record::{AddressFamily, DnsRecord};
use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// The provider is a pure I/O boundary: it lists, creates and deletes
/// records and never decides whether a change is needed. That decision is
/// owned by [`Reconciler`](crate::Reconciler).
///
/// # Thread Safety
///
/// Implementations must be thread-safe; the reconciler issues deletions
/// (and then creations) concurrently against a shared instance.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - Perform HTTP/HTTPS API calls to their endpoints only
/// - Parse provider-specific responses
/// - Return success or failure
///
/// ## Forbidden Capabilities
/// - Spawn tasks or threads
/// - Retry or back off (the next scheduler tick is the retry)
/// - Cache record state between calls
/// - Decide whether a create or delete is needed
///
/// # Error Mapping
///
/// - Deleting an unknown or already-deleted id must map to
///   [`Error::NotFound`](crate::Error::NotFound); the reconciler treats it as
///   a non-fatal, logged failure.
/// - An error payload returned by the provider must be an `Err`, never an
///   empty `Ok(vec![])`.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record of `domain`
    ///
    /// All types are returned; filtering to the managed name and types is
    /// done by the reconciler.
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create an address record `name` of `family` with `value`
    ///
    /// Not idempotent on the provider side: calling it twice may produce
    /// two records.
    async fn create_record(
        &self,
        domain: &str,
        name: &str,
        family: AddressFamily,
        value: &str,
    ) -> Result<(), crate::Error>;

    /// Delete the record identified by `id`
    async fn delete_record(&self, domain: &str, id: &str) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
