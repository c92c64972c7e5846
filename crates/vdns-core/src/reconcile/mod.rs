//! Reconciliation of a subdomain's address records
//!
//! The Reconciler is responsible for one cycle:
//! - Discovering the public addresses via [`AddressResolver`]
//! - Listing the provider's current records
//! - Planning deletions and creations ([`ReconciliationPlan`])
//! - Executing the plan and summarizing it in a [`CycleReport`]
//!
//! ## Cycle Flow
//!
//! ```text
//!  AddressResolver ──▶ Discovery ──(empty? abort)──┐
//!                                                  ▼
//!  DnsProvider::list_records ──(err? abort)──▶ ReconciliationPlan
//!                                                  │
//!                       ┌──────────────────────────┴───────────┐
//!                       ▼                                      │
//!           deletions (concurrent, all awaited)                │
//!                       │                                      │
//!                       └──────────▶ creations (concurrent) ◀──┘
//! ```
//!
//! Only two conditions abort a cycle: no address for any family, and a
//! failed listing. Every individual delete or create failure is logged and
//! recorded in the report; siblings proceed.

pub mod plan;

pub use plan::{PlannedCreation, PlannedDeletion, ReconciliationPlan};

use crate::config::DdnsConfig;
use crate::error::{Error, Result};
use crate::record::{AddressFamily, Discovery};
use crate::resolver::AddressResolver;
use crate::traits::DnsProvider;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Kind of provider mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Delete,
    Create,
}

/// Result of a single provider mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub kind: OperationKind,
    pub family: AddressFamily,
    /// Record id for deletions, address for creations
    pub target: String,
    /// Failure message; `None` on success
    pub error: Option<String>,
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of one executed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// When the cycle started
    pub started_at: DateTime<Utc>,
    /// Addresses discovered this cycle
    pub discovery: Discovery,
    /// Families skipped because discovery failed
    pub skipped: Vec<AddressFamily>,
    /// One outcome per planned deletion
    pub deletions: Vec<OperationOutcome>,
    /// One outcome per planned creation
    pub creations: Vec<OperationOutcome>,
}

impl CycleReport {
    /// Whether the cycle issued no mutation call
    pub fn is_noop(&self) -> bool {
        self.deletions.is_empty() && self.creations.is_empty()
    }

    /// Number of mutation calls issued
    pub fn mutation_count(&self) -> usize {
        self.deletions.len() + self.creations.len()
    }

    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.deletions
            .iter()
            .chain(&self.creations)
            .filter(|o| !o.is_success())
    }

    /// Number of failed mutation calls
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// Converges the managed subdomain's A / AAAA records to the host's
/// current public addresses
///
/// Holds no state between cycles; every call to
/// [`run_cycle`](Self::run_cycle) starts from a fresh listing.
pub struct Reconciler {
    /// Discovery sources
    resolver: AddressResolver,

    /// Provider used for listing and mutations
    provider: Arc<dyn DnsProvider>,

    /// Domain holding the records
    domain: String,

    /// Managed record name
    subdomain: String,
}

impl Reconciler {
    /// Create a reconciler for `subdomain` within `domain`
    pub fn new(
        resolver: AddressResolver,
        provider: Arc<dyn DnsProvider>,
        domain: impl Into<String>,
        subdomain: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            provider,
            domain: domain.into(),
            subdomain: subdomain.into(),
        }
    }

    /// Create a reconciler from validated configuration
    pub fn from_config(
        resolver: AddressResolver,
        provider: Arc<dyn DnsProvider>,
        config: &DdnsConfig,
    ) -> Self {
        Self::new(
            resolver,
            provider,
            config.provider.domain.clone(),
            config.subdomain.clone(),
        )
    }

    /// Fully qualified name of the managed records
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.subdomain, self.domain)
    }

    /// Run one reconciliation cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleReport)`: The plan was executed (possibly with individual
    ///   mutation failures recorded in the report)
    /// - `Err(Error::Discovery)`: No address for any family; no provider call
    ///   was made
    /// - `Err(Error::Listing)`: Current records unknown; nothing was mutated
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started_at = Utc::now();

        let discovery = self.resolver.resolve_all().await;
        if discovery.is_empty() {
            return Err(Error::discovery(
                "no public address discovered for any family, skipping provider calls",
            ));
        }

        let records = self
            .provider
            .list_records(&self.domain)
            .await
            .map_err(|e| {
                Error::listing(format!(
                    "{} records for {}: {}",
                    self.provider.provider_name(),
                    self.domain,
                    e
                ))
            })?;

        let plan = ReconciliationPlan::build(&records, &self.subdomain, &discovery);
        debug!(
            "Plan for {}: {} deletion(s), {} creation(s), skipped {:?}",
            self.fqdn(),
            plan.deletions.len(),
            plan.creations.len(),
            plan.skipped
        );

        let (deletions, creations) = self.execute(&plan).await;

        let report = CycleReport {
            started_at,
            discovery,
            skipped: plan.skipped,
            deletions,
            creations,
        };

        if report.is_noop() {
            info!("Records for {} are up to date", self.fqdn());
        } else {
            info!(
                "Reconciled {}: {} mutation(s), {} failed",
                self.fqdn(),
                report.mutation_count(),
                report.failure_count()
            );
        }

        Ok(report)
    }

    /// Execute a plan: all deletions concurrently, then all creations
    /// concurrently
    ///
    /// Creations are not issued until every deletion attempt has finished.
    pub async fn execute(
        &self,
        plan: &ReconciliationPlan,
    ) -> (Vec<OperationOutcome>, Vec<OperationOutcome>) {
        let deletions = join_all(plan.deletions.iter().map(|d| self.delete(d))).await;
        let creations = join_all(plan.creations.iter().map(|c| self.create(c))).await;
        (deletions, creations)
    }

    async fn delete(&self, deletion: &PlannedDeletion) -> OperationOutcome {
        let result = self.provider.delete_record(&self.domain, &deletion.id).await;

        let error = match result {
            Ok(()) => {
                info!(
                    "Deleted stale {} record {} for {} (was {})",
                    deletion.family.record_type(),
                    deletion.id,
                    self.fqdn(),
                    deletion.value
                );
                None
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    "Stale {} record {} for {} was already gone: {}",
                    deletion.family.record_type(),
                    deletion.id,
                    self.fqdn(),
                    e
                );
                Some(Error::mutation(e.to_string()).to_string())
            }
            Err(e) => {
                warn!(
                    "Failed to delete {} record {} for {}: {}",
                    deletion.family.record_type(),
                    deletion.id,
                    self.fqdn(),
                    e
                );
                Some(Error::mutation(e.to_string()).to_string())
            }
        };

        OperationOutcome {
            kind: OperationKind::Delete,
            family: deletion.family,
            target: deletion.id.clone(),
            error,
        }
    }

    async fn create(&self, creation: &PlannedCreation) -> OperationOutcome {
        let result = self
            .provider
            .create_record(&self.domain, &self.subdomain, creation.family, &creation.value)
            .await;

        let error = match result {
            Ok(()) => {
                info!(
                    "Created {} record {} -> {}",
                    creation.family.record_type(),
                    self.fqdn(),
                    creation.value
                );
                None
            }
            Err(e) => {
                warn!(
                    "Failed to create {} record {} -> {}: {}",
                    creation.family.record_type(),
                    self.fqdn(),
                    creation.value,
                    e
                );
                Some(Error::mutation(e.to_string()).to_string())
            }
        };

        OperationOutcome {
            kind: OperationKind::Create,
            family: creation.family,
            target: creation.value.clone(),
            error,
        }
    }
}
