//! Membership diffing and reconcile outcome reporting.
//!
//! The diff is pure set algebra: the ids to add and the ids to remove are
//! disjoint by construction, so the fan-out that executes them needs no
//! ordering between the two groups.

use std::collections::BTreeSet;

use nomenclab_core::{EntityId, RemoteError};

/// Compute `(to_add, to_remove)` between a desired and a current
/// membership set.
pub fn membership_diff(
    desired: &BTreeSet<EntityId>,
    current: &BTreeSet<EntityId>,
) -> (Vec<EntityId>, Vec<EntityId>) {
    let to_add = desired.difference(current).copied().collect();
    let to_remove = current.difference(desired).copied().collect();
    (to_add, to_remove)
}

/// Report of one reconcile run.
///
/// `membership` is server truth reloaded after the run, not the desired
/// set that was asked for; under partial failure the two differ.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// Ids whose associate call succeeded.
    pub added: Vec<EntityId>,
    /// Ids whose disassociate call succeeded.
    pub removed: Vec<EntityId>,
    /// Failed associate calls, keyed by NBU id.
    pub association_errors: Vec<(EntityId, RemoteError)>,
    /// Failed disassociate calls, keyed by NBU id.
    pub disassociation_errors: Vec<(EntityId, RemoteError)>,
    /// Authoritative post-run membership.
    pub membership: BTreeSet<EntityId>,
    /// Number of remote calls issued (zero on the idempotent fast path).
    pub calls_issued: usize,
}

impl ReconcileOutcome {
    /// Fast-path outcome: nothing to change, no calls issued.
    pub fn unchanged(membership: BTreeSet<EntityId>) -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            association_errors: Vec::new(),
            disassociation_errors: Vec::new(),
            membership,
            calls_issued: 0,
        }
    }

    /// True when at least one fan-out call failed.
    pub fn has_warnings(&self) -> bool {
        !self.association_errors.is_empty() || !self.disassociation_errors.is_empty()
    }

    /// User-displayable warning lines, one per failed call.
    pub fn warning_messages(&self) -> Vec<String> {
        let associations = self
            .association_errors
            .iter()
            .map(|(id, err)| format!("Could not link code {id}: {}", err.user_message()));
        let disassociations = self
            .disassociation_errors
            .iter()
            .map(|(id, err)| format!("Could not unlink code {id}: {}", err.user_message()));
        associations.chain(disassociations).collect()
    }
}
