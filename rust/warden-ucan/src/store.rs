//! The proof store.

use std::sync::Arc;

use indexmap::IndexMap;
use ipld_core::cid::Cid;
use tracing::debug;
use warden_common::SharedCell;

use crate::Delegation;

/// Delegations keyed by CID, in insertion order.
pub type ProofIndex = IndexMap<Cid, Arc<Delegation>>;

/// Inserts `delegation` and everything attached to it, keeping the first
/// position of anything already present.
pub(crate) fn index(proofs: &mut ProofIndex, delegation: Arc<Delegation>) {
    if proofs.contains_key(delegation.cid()) {
        return;
    }
    proofs.insert(*delegation.cid(), delegation.clone());
    for attached in delegation.attached() {
        index(proofs, attached.clone());
    }
}

/// Builds an index over `delegations` and their attachments.
#[must_use]
pub fn index_all<'a>(delegations: impl IntoIterator<Item = &'a Arc<Delegation>>) -> ProofIndex {
    let mut proofs = ProofIndex::new();
    for delegation in delegations {
        index(&mut proofs, delegation.clone());
    }
    proofs
}

/// An agent's collection of delegations.
///
/// Duplicates collapse onto the first insertion. Writers hold the lock for
/// a whole batch, so readers taking a [`snapshot`](ProofStore::snapshot)
/// never see half of one.
#[derive(Debug, Default)]
pub struct ProofStore {
    proofs: SharedCell<ProofIndex>,
}

impl ProofStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a delegation along with its attachments and returns its CID.
    pub fn add(&self, delegation: impl Into<Arc<Delegation>>) -> Cid {
        let delegation = delegation.into();
        let cid = *delegation.cid();
        debug!(%cid, issuer = %delegation.issuer(), "adding proof");
        index(&mut self.proofs.write(), delegation);
        cid
    }

    /// Adds several delegations atomically.
    pub fn add_all(&self, delegations: impl IntoIterator<Item = Arc<Delegation>>) -> Vec<Cid> {
        let mut proofs = self.proofs.write();
        delegations
            .into_iter()
            .map(|delegation| {
                let cid = *delegation.cid();
                index(&mut proofs, delegation);
                cid
            })
            .collect()
    }

    /// Removes a delegation, keeping the order of the rest.
    pub fn remove(&self, cid: &Cid) -> Option<Arc<Delegation>> {
        let removed = self.proofs.write().shift_remove(cid);
        if removed.is_some() {
            debug!(%cid, "removed proof");
        }
        removed
    }

    /// Looks up a delegation.
    #[must_use]
    pub fn get(&self, cid: &Cid) -> Option<Arc<Delegation>> {
        self.proofs.read().get(cid).cloned()
    }

    /// Whether `cid` is stored.
    #[must_use]
    pub fn contains(&self, cid: &Cid) -> bool {
        self.proofs.read().contains_key(cid)
    }

    /// Number of stored delegations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.proofs.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proofs.read().is_empty()
    }

    /// All delegations in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Delegation>> {
        self.proofs.read().values().cloned().collect()
    }

    /// All CIDs in insertion order.
    #[must_use]
    pub fn cids(&self) -> Vec<Cid> {
        self.proofs.read().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use warden_capability::Capability;
    use warden_credentials::Ed25519Signer;
    use warden_varsig::Principal;

    fn signer(seed: u8) -> Ed25519Signer {
        Ed25519Signer::import(&[seed; 32]).unwrap()
    }

    fn delegate(from: &Ed25519Signer, to: &Ed25519Signer, nonce: &str) -> Arc<Delegation> {
        Arc::new(
            Delegation::builder()
                .audience(to.did())
                .capability(Capability::parse("space/info", from.did().as_str()).unwrap())
                .nonce(nonce)
                .sign(from)
                .unwrap(),
        )
    }

    #[test]
    fn duplicates_collapse_onto_the_first_insertion() {
        let store = ProofStore::new();
        let a = delegate(&signer(1), &signer(2), "a");
        let b = delegate(&signer(1), &signer(2), "b");

        store.add(a.clone());
        store.add(b.clone());
        store.add(a.clone());

        assert_eq!(store.cids(), vec![*a.cid(), *b.cid()]);
    }

    #[test]
    fn attachments_are_stored_too() {
        let store = ProofStore::new();
        let root = delegate(&signer(1), &signer(2), "root");
        let leaf = Delegation::builder()
            .audience(signer(3).did())
            .capability(Capability::parse("space/info", signer(1).did().as_str()).unwrap())
            .proof(root.clone())
            .sign(&signer(2))
            .unwrap();

        let cid = store.add(leaf);
        assert_eq!(store.cids(), vec![cid, *root.cid()]);
    }

    #[test]
    fn removal_keeps_order() {
        let store = ProofStore::new();
        let cids = store.add_all(["a", "b", "c"].map(|nonce| delegate(&signer(1), &signer(2), nonce)));
        assert!(store.remove(&cids[1]).is_some());
        assert!(store.remove(&cids[1]).is_none());
        assert_eq!(store.cids(), vec![cids[0], cids[2]]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_observe_partial_batches() {
        let store = Arc::new(ProofStore::new());
        let batch: Vec<Arc<Delegation>> = (0..16)
            .map(|n| delegate(&signer(1), &signer(2), &n.to_string()))
            .collect();

        let reader = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let seen = store.snapshot().len();
                    assert!(seen == 0 || seen == 16, "observed {seen} proofs");
                    tokio::task::yield_now().await;
                }
            })
        };
        store.add_all(batch);
        reader.await.unwrap();
        assert_eq!(store.len(), 16);
    }
}
