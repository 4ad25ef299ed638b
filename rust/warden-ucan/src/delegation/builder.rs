use std::collections::BTreeMap;
use std::sync::Arc;

use ipld_core::{cid::Cid, ipld::Ipld};
use warden_capability::Capability;
use warden_varsig::{Did, Signer};

use super::{Delegation, DelegationPayload, signed};
use crate::DelegationError;

/// Collects the fields of a delegation before the issuer signs it.
#[derive(Debug, Clone, Default)]
pub struct DelegationBuilder {
    audience: Option<Did>,
    capabilities: Vec<Capability>,
    proofs: Vec<Cid>,
    attached: Vec<Arc<Delegation>>,
    expiration: Option<u64>,
    not_before: Option<u64>,
    facts: BTreeMap<String, Ipld>,
    nonce: Option<String>,
}

impl DelegationBuilder {
    /// Sets the audience.
    #[must_use]
    pub fn audience(mut self, audience: Did) -> Self {
        self.audience = Some(audience);
        self
    }

    /// Adds a capability.
    #[must_use]
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Adds several capabilities.
    #[must_use]
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    /// Cites `proof` and carries it along.
    #[must_use]
    pub fn proof(mut self, proof: Arc<Delegation>) -> Self {
        if !self.proofs.contains(proof.cid()) {
            self.proofs.push(*proof.cid());
            self.attached.push(proof);
        }
        self
    }

    /// Cites and carries several proofs.
    #[must_use]
    pub fn proofs(self, proofs: impl IntoIterator<Item = Arc<Delegation>>) -> Self {
        proofs.into_iter().fold(self, Self::proof)
    }

    /// Sets the expiration in seconds since the epoch.
    #[must_use]
    pub fn expiration(mut self, expiration: u64) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Sets or clears the expiration.
    #[must_use]
    pub fn expiration_opt(mut self, expiration: Option<u64>) -> Self {
        self.expiration = expiration;
        self
    }

    /// Sets not-before in seconds since the epoch.
    #[must_use]
    pub fn not_before(mut self, not_before: u64) -> Self {
        self.not_before = Some(not_before);
        self
    }

    /// Adds a fact.
    #[must_use]
    pub fn fact(mut self, key: impl Into<String>, value: impl Into<Ipld>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    /// Sets the nonce.
    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Signs the delegation as `issuer`.
    ///
    /// # Errors
    ///
    /// Fails without an audience, or when signing or encoding fails.
    pub fn sign<S: Signer + ?Sized>(self, issuer: &S) -> Result<Delegation, DelegationError> {
        let payload = DelegationPayload {
            capabilities: self.capabilities,
            audience: self.audience.ok_or(DelegationError::MissingAudience)?,
            expiration: self.expiration,
            facts: self.facts,
            issuer: issuer.did(),
            not_before: self.not_before,
            nonce: self.nonce,
            proofs: self.proofs,
        };
        Ok(signed(payload, issuer)?.attach(self.attached))
    }
}
