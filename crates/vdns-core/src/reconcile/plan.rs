//! Pure planning step of a reconciliation cycle
//!
//! No I/O happens here: given the listed records and the discovered
//! addresses, decide which records to delete and which to create.

use crate::record::{AddressFamily, Discovery, DnsRecord};
use std::collections::HashSet;

/// A record scheduled for deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDeletion {
    /// Provider id of the stale record
    pub id: String,
    pub family: AddressFamily,
    /// The stale value (kept for logging)
    pub value: String,
}

/// A record scheduled for creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCreation {
    pub family: AddressFamily,
    /// The discovered address, with its original casing
    pub value: String,
}

/// Deletions and creations needed to converge one subdomain
///
/// Built fresh every cycle. Holds at most one creation per family and
/// never a deletion of a record whose value matches the discovered address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub deletions: Vec<PlannedDeletion>,
    pub creations: Vec<PlannedCreation>,
    /// Families left untouched because discovery failed for them
    pub skipped: Vec<AddressFamily>,
}

impl ReconciliationPlan {
    /// Compute the plan for `subdomain`
    ///
    /// Per family:
    /// 1. candidates = records of the family's type named `subdomain`
    /// 2. no discovered address: skip the family entirely
    /// 3. every candidate whose value differs (case-insensitively) is deleted
    /// 4. a creation is planned only if no candidate already matches
    pub fn build(records: &[DnsRecord], subdomain: &str, discovery: &Discovery) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();

        for family in AddressFamily::ALL {
            let Some(address) = discovery.get(family).value.as_deref() else {
                plan.skipped.push(family);
                continue;
            };

            let mut has_match = false;
            for record in records.iter().filter(|r| r.is_managed(subdomain, family)) {
                if record.has_value(address) {
                    has_match = true;
                } else if seen_ids.insert(record.id.as_str()) {
                    plan.deletions.push(PlannedDeletion {
                        id: record.id.clone(),
                        family,
                        value: record.value.clone(),
                    });
                }
            }

            if !has_match {
                plan.creations.push(PlannedCreation {
                    family,
                    value: address.to_string(),
                });
            }
        }

        plan
    }

    /// Whether the plan requires no provider mutation
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.creations.is_empty()
    }

    /// Number of provider mutation calls the plan will issue
    pub fn mutation_count(&self) -> usize {
        self.deletions.len() + self.creations.len()
    }

    /// The planned creation for `family`, if any
    pub fn creation_for(&self, family: AddressFamily) -> Option<&PlannedCreation> {
        self.creations.iter().find(|c| c.family == family)
    }

    /// Ids scheduled for deletion
    pub fn deletion_ids(&self) -> Vec<&str> {
        self.deletions.iter().map(|d| d.id.as_str()).collect()
    }
}
