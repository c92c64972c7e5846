// # vdns-core
//
// Core library for keeping a subdomain's A / AAAA records in sync with the
// host's public addresses.
//
// ## Architecture Overview
//
// - **IpSource**: Trait for one public-address discovery endpoint
// - **AddressResolver**: Primary + fallback chain of IpSources per family
// - **DnsProvider**: Trait for listing, creating and deleting records
// - **Reconciler**: Plans and executes one convergence cycle
// - **Scheduler**: Runs the Reconciler on a fixed interval, one cycle at a time
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision logic lives here; I/O lives in plugin crates
// 2. **Contained Failure**: Per-family and per-record failures never abort sibling work
// 3. **Explicit Configuration**: One immutable `DdnsConfig`, built at startup
// 4. **Library-First**: The daemon is a thin wiring layer over this crate

pub mod traits;
pub mod record;
pub mod resolver;
pub mod reconcile;
pub mod scheduler;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpSource, DnsProvider};
pub use record::{AddressFamily, DiscoveredAddress, Discovery, DnsRecord, RecordType};
pub use resolver::AddressResolver;
pub use reconcile::{CycleReport, OperationKind, OperationOutcome, ReconciliationPlan, Reconciler};
pub use scheduler::{Scheduler, SchedulerEvent};
pub use config::{DdnsConfig, DiscoveryConfig, ProviderConfig, SchedulerConfig};
pub use error::{Error, Result};
