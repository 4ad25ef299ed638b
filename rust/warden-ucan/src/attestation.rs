//! Attestations vouch for delegations issued by absentee principals.
//!
//! An account such as `did:mailto:example.com:alice` holds no key, so the
//! delegations it issues are unsigned. A service that verified the account
//! (for instance by email) issues a `ucan/attest` delegation whose
//! `nb.proof` links to the unsigned delegation. Together they form a
//! session pair.

use ipld_core::{cid::Cid, ipld::Ipld};
use warden_capability::{Capability, standard::abilities::UCAN_ATTEST};
use warden_varsig::{Did, Principal, Signer};

use crate::{Delegation, DelegationError};

/// Principals trusted to vouch for absentee delegations.
///
/// Trusts nobody by default, so absentee delegations only resolve once
/// the caller names the services it relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attesters(Vec<Did>);

impl Attesters {
    /// Nobody.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Only `did`.
    #[must_use]
    pub fn only(did: Did) -> Self {
        Self(vec![did])
    }

    /// Also trusts `did`.
    #[must_use]
    pub fn and(mut self, did: Did) -> Self {
        if !self.0.contains(&did) {
            self.0.push(did);
        }
        self
    }

    /// Whether `issuer` may attest.
    #[must_use]
    pub fn accepts(&self, issuer: &Did) -> bool {
        self.0.contains(issuer)
    }
}

impl FromIterator<Did> for Attesters {
    fn from_iter<I: IntoIterator<Item = Did>>(dids: I) -> Self {
        dids.into_iter().fold(Self::none(), Self::and)
    }
}

/// Whether `attestation` is a `ucan/attest` by its issuer about `cid`.
#[must_use]
pub fn is_attestation_of(attestation: &Delegation, cid: &Cid) -> bool {
    let proof = Ipld::Link(*cid);
    attestation.capabilities().iter().any(|capability| {
        capability.can == UCAN_ATTEST
            && capability.with == *attestation.issuer()
            && capability.caveat("proof") == Some(&proof)
    })
}

/// The CIDs `delegation` attests to.
#[must_use]
pub fn attested(delegation: &Delegation) -> Vec<Cid> {
    delegation
        .capabilities()
        .iter()
        .filter(|capability| capability.can == UCAN_ATTEST && capability.with == *delegation.issuer())
        .filter_map(|capability| match capability.caveat("proof") {
            Some(Ipld::Link(cid)) => Some(*cid),
            _ => None,
        })
        .collect()
}

/// Issues an attestation from `service` to `audience` vouching for
/// `proof`.
///
/// # Errors
///
/// Fails if the service cannot sign.
pub fn attest<S: Signer + ?Sized>(
    service: &S,
    audience: Did,
    proof: &Cid,
    expiration: Option<u64>,
) -> Result<Delegation, DelegationError> {
    let capability = Capability::new(UCAN_ATTEST.parse()?, &service.did()).with_caveat("proof", Ipld::Link(*proof));
    Delegation::builder()
        .audience(audience)
        .capability(capability)
        .expiration_opt(expiration)
        .sign(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_credentials::{Absentee, Ed25519Signer};
    use warden_varsig::did;

    #[test]
    fn attestations_name_the_proof() -> testresult::TestResult {
        let service = Ed25519Signer::import(&[7; 32])?.with_did(did!("web:up.example.com"));
        let agent = Ed25519Signer::import(&[8; 32])?;
        let account = Absentee::new(did!("mailto:example.com:alice"));

        let delegation = Delegation::builder()
            .audience(agent.did())
            .capability(Capability::parse("provider/add", "ucan:*")?)
            .sign(&account)?;
        let attestation = attest(&service, agent.did(), delegation.cid(), None)?;

        assert!(is_attestation_of(&attestation, delegation.cid()));
        assert!(!is_attestation_of(&attestation, attestation.cid()));
        assert_eq!(attested(&attestation), vec![*delegation.cid()]);
        Ok(())
    }

    #[test]
    fn attester_policy() {
        let service = did!("web:up.example.com");
        let backup = did!("web:backup.example.com");
        assert!(!Attesters::default().accepts(&service));
        assert!(Attesters::only(service.clone()).accepts(&service));
        assert!(!Attesters::only(service.clone()).accepts(&did!("web:evil.example.com")));

        let both: Attesters = [service.clone(), backup.clone(), service.clone()].into_iter().collect();
        assert_eq!(both, Attesters::only(service.clone()).and(backup.clone()));
        assert!(both.accepts(&service) && both.accepts(&backup));
    }
}
