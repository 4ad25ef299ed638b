//! Revocation registry.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use ipld_core::cid::Cid;
use tracing::info;
use warden_common::{ConditionalSync, SharedCell};

use crate::Delegation;

/// Record that a delegation was revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revocation {
    /// The revoked delegation.
    pub revoked: Cid,
    /// Seconds since the epoch at which it was revoked.
    pub revoked_at: u64,
    /// The signed `ucan/revoke` invocation that established authority.
    pub revoked_by: Arc<Delegation>,
}

/// Lookup of revocation records by delegation CID.
///
/// Any chain containing a revoked delegation is rejected.
pub trait Revocations: ConditionalSync + Debug {
    /// The record for `cid`, if it was revoked.
    fn revocation(&self, cid: &Cid) -> Option<Revocation>;

    /// Whether `cid` was revoked.
    fn is_revoked(&self, cid: &Cid) -> bool {
        self.revocation(cid).is_some()
    }
}

/// A registry where nothing is revoked.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRevocations;

impl Revocations for NoRevocations {
    fn revocation(&self, _cid: &Cid) -> Option<Revocation> {
        None
    }
}

/// In-memory revocation registry.
#[derive(Debug, Default)]
pub struct MemoryRevocations {
    records: SharedCell<HashMap<Cid, Revocation>>,
}

impl MemoryRevocations {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `revocation`. The earliest record for a CID is kept; returns
    /// `false` if the CID was already revoked.
    pub fn record(&self, revocation: Revocation) -> bool {
        let mut records = self.records.write();
        if records.contains_key(&revocation.revoked) {
            return false;
        }
        info!(cid = %revocation.revoked, at = revocation.revoked_at, "recorded revocation");
        records.insert(revocation.revoked, revocation);
        true
    }

    /// Number of revoked delegations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether nothing has been revoked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Revocations for MemoryRevocations {
    fn revocation(&self, cid: &Cid) -> Option<Revocation> {
        self.records.read().get(cid).cloned()
    }
}

impl<R: Revocations + ?Sized> Revocations for Arc<R> {
    fn revocation(&self, cid: &Cid) -> Option<Revocation> {
        (**self).revocation(cid)
    }
}

/// Consults two registries; a delegation revoked in either is revoked.
#[derive(Debug)]
pub struct Either<'a>(pub &'a dyn Revocations, pub &'a dyn Revocations);

impl Revocations for Either<'_> {
    fn revocation(&self, cid: &Cid) -> Option<Revocation> {
        self.0.revocation(cid).or_else(|| self.1.revocation(cid))
    }
}
