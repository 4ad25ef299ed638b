//! Storage the access service depends on.
//!
//! Each contract is async and fallible so that it can sit in front of a
//! remote database. The in-memory implementations here back tests and
//! single-process deployments.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use indexmap::IndexMap;
use ipld_core::cid::Cid;
use tokio::sync::RwLock;
use warden_common::ConditionalSync;
use warden_ucan::{Delegation, MemoryRevocations, Revocation, Revocations, store::index_all};
use warden_varsig::Did;

/// A storage operation failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct StorageError {
    /// Machine readable error name.
    pub name: String,
    /// Human readable description.
    pub message: String,
}

impl StorageError {
    /// A failure called `name`.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Delegations held for later claiming.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait DelegationsStorage: ConditionalSync + Debug {
    /// Stores `delegations` and everything attached to them.
    async fn put_many(&self, delegations: Vec<Arc<Delegation>>) -> Result<(), StorageError>;

    /// The delegation with `cid`, if stored.
    async fn get(&self, cid: &Cid) -> Result<Option<Arc<Delegation>>, StorageError>;

    /// Every stored delegation addressed to `audience`, oldest first.
    async fn find_by_audience(&self, audience: &Did) -> Result<Vec<Arc<Delegation>>, StorageError>;

    /// Whether a delegation with `cid` is stored.
    async fn exists(&self, cid: &Cid) -> Result<bool, StorageError> {
        Ok(self.get(cid).await?.is_some())
    }
}

/// Revocation records.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait RevocationsStorage: ConditionalSync + Debug {
    /// Records a revocation. Returns `false` if `revocation.revoked` was
    /// already revoked, in which case the existing record stands.
    async fn put(&self, revocation: Revocation) -> Result<bool, StorageError>;

    /// The record for `cid`, if revoked.
    async fn get(&self, cid: &Cid) -> Result<Option<Revocation>, StorageError>;

    /// Records for whichever of `cids` are revoked.
    async fn find(&self, cids: &[Cid]) -> Result<Vec<Revocation>, StorageError> {
        let mut found = Vec::new();
        for cid in cids {
            if let Some(revocation) = self.get(cid).await? {
                found.push(revocation);
            }
        }
        Ok(found)
    }
}

/// A space provisioned with a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provision {
    /// The space.
    pub consumer: Did,
    /// The provider.
    pub provider: Did,
    /// The account that asked for it.
    pub customer: Did,
    /// The `provider/add` invocation.
    pub cause: Cid,
}

/// Which spaces are provisioned with which providers.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ProvisionsStorage: ConditionalSync + Debug {
    /// Records a provision; provisioning the same space with the same
    /// provider again is a no-op.
    async fn put(&self, provision: Provision) -> Result<(), StorageError>;

    /// Provisions of `consumer`.
    async fn get(&self, consumer: &Did) -> Result<Vec<Provision>, StorageError>;
}

/// In-memory [`DelegationsStorage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDelegations {
    entries: Arc<RwLock<IndexMap<Cid, Arc<Delegation>>>>,
}

impl MemoryDelegations {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl DelegationsStorage for MemoryDelegations {
    async fn put_many(&self, delegations: Vec<Arc<Delegation>>) -> Result<(), StorageError> {
        let index = index_all(&delegations);
        let mut entries = self.entries.write().await;
        for (cid, delegation) in index {
            entries.entry(cid).or_insert(delegation);
        }
        Ok(())
    }

    async fn get(&self, cid: &Cid) -> Result<Option<Arc<Delegation>>, StorageError> {
        Ok(self.entries.read().await.get(cid).cloned())
    }

    async fn find_by_audience(&self, audience: &Did) -> Result<Vec<Arc<Delegation>>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|delegation| delegation.audience() == audience)
            .cloned()
            .collect())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl RevocationsStorage for MemoryRevocations {
    async fn put(&self, revocation: Revocation) -> Result<bool, StorageError> {
        Ok(self.record(revocation))
    }

    async fn get(&self, cid: &Cid) -> Result<Option<Revocation>, StorageError> {
        Ok(self.revocation(cid))
    }
}

/// In-memory [`ProvisionsStorage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryProvisions {
    entries: Arc<RwLock<Vec<Provision>>>,
}

impl MemoryProvisions {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ProvisionsStorage for MemoryProvisions {
    async fn put(&self, provision: Provision) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        let known = entries
            .iter()
            .any(|p| p.consumer == provision.consumer && p.provider == provision.provider);
        if !known {
            entries.push(provision);
        }
        Ok(())
    }

    async fn get(&self, consumer: &Did) -> Result<Vec<Provision>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|provision| &provision.consumer == consumer)
            .cloned()
            .collect())
    }
}
