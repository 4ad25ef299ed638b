//! Signed, content-addressed delegations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ipld_core::{cid::Cid, ipld::Ipld};
use serde::{Deserialize, Serialize};
use tracing::trace;
use warden_capability::Capability;
use warden_varsig::{Did, Principal, Resolver, Signature, Signer};

use crate::{
    CodecError, DelegationError, ValidityError, link::to_cid, revocation::Revocations,
    time::TimeRange,
};

mod builder;
pub use builder::DelegationBuilder;

/// DID method of principals that hold no key.
pub const ABSENTEE_METHOD: &str = "mailto";

/// Whether `did` names an absentee principal.
#[must_use]
pub fn is_absentee(did: &Did) -> bool {
    did.method() == ABSENTEE_METHOD
}

/// The signed part of a delegation.
///
/// Fields are declared in DAG-CBOR key order so the encoding is canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationPayload {
    /// Granted capabilities.
    #[serde(rename = "att")]
    pub capabilities: Vec<Capability>,

    /// Who receives the capabilities.
    #[serde(rename = "aud")]
    pub audience: Did,

    /// Seconds since the epoch at which the delegation stops being valid;
    /// `None` never expires.
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,

    /// Arbitrary signed facts.
    #[serde(rename = "fct", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub facts: BTreeMap<String, Ipld>,

    /// Who grants the capabilities.
    #[serde(rename = "iss")]
    pub issuer: Did,

    /// Seconds since the epoch before which the delegation is not valid.
    #[serde(rename = "nbf", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<u64>,

    /// Makes otherwise identical delegations distinct.
    #[serde(rename = "nnc", default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// CIDs of the delegations the issuer's authority derives from.
    #[serde(rename = "prf", default, skip_serializing_if = "Vec::is_empty")]
    pub proofs: Vec<Cid>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "p")]
    payload: DelegationPayload,
    #[serde(rename = "s")]
    signature: Signature,
}

/// A signed grant of capabilities from an issuer to an audience.
///
/// Identified by the CID of its DAG-CBOR encoding. The delegations named in
/// `prf` may travel along as attachments; they are not part of the encoding
/// and do not affect the CID.
#[derive(Clone)]
pub struct Delegation {
    payload: DelegationPayload,
    signature: Signature,
    cid: Cid,
    bytes: Arc<[u8]>,
    attached: Vec<Arc<Delegation>>,
}

impl Delegation {
    /// Starts building a delegation.
    #[must_use]
    pub fn builder() -> DelegationBuilder {
        DelegationBuilder::default()
    }

    /// Assembles a delegation from an already signed payload.
    ///
    /// # Errors
    ///
    /// Fails if the envelope cannot be encoded.
    pub fn from_parts(payload: DelegationPayload, signature: Signature) -> Result<Self, CodecError> {
        let envelope = Envelope { payload, signature };
        let bytes = serde_ipld_dagcbor::to_vec(&envelope)?;
        let cid = to_cid(&bytes)?;
        Ok(Self {
            payload: envelope.payload,
            signature: envelope.signature,
            cid,
            bytes: bytes.into(),
            attached: Vec::new(),
        })
    }

    /// Decodes a delegation from DAG-CBOR bytes.
    ///
    /// The delegation is re-encoded canonically, so the CID depends only
    /// on the decoded value and never on how the input was laid out.
    ///
    /// # Errors
    ///
    /// Fails on malformed input.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let envelope: Envelope = serde_ipld_dagcbor::from_slice(bytes)?;
        let delegation = Self::from_parts(envelope.payload, envelope.signature)?;
        if delegation.as_bytes() != bytes {
            trace!(cid = %delegation.cid, "re-encoded non-canonical delegation");
        }
        Ok(delegation)
    }

    /// The DAG-CBOR encoding this delegation is identified by.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content identifier.
    #[must_use]
    pub const fn cid(&self) -> &Cid {
        &self.cid
    }

    /// The signed payload.
    #[must_use]
    pub const fn payload(&self) -> &DelegationPayload {
        &self.payload
    }

    /// Who issued the delegation.
    #[must_use]
    pub const fn issuer(&self) -> &Did {
        &self.payload.issuer
    }

    /// Who it was delegated to.
    #[must_use]
    pub const fn audience(&self) -> &Did {
        &self.payload.audience
    }

    /// Granted capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.payload.capabilities
    }

    /// CIDs of the proofs.
    #[must_use]
    pub fn proofs(&self) -> &[Cid] {
        &self.payload.proofs
    }

    /// Expiration in seconds since the epoch; `None` never expires.
    #[must_use]
    pub const fn expiration(&self) -> Option<u64> {
        self.payload.expiration
    }

    /// Not-before in seconds since the epoch.
    #[must_use]
    pub const fn not_before(&self) -> Option<u64> {
        self.payload.not_before
    }

    /// Signed facts.
    #[must_use]
    pub const fn facts(&self) -> &BTreeMap<String, Ipld> {
        &self.payload.facts
    }

    /// Nonce.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.payload.nonce.as_deref()
    }

    /// The issuer's signature over the payload.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The validity window.
    #[must_use]
    pub const fn time_range(&self) -> TimeRange {
        TimeRange::new(self.payload.not_before, self.payload.expiration)
    }

    /// Whether the issuer is an absentee principal.
    #[must_use]
    pub fn is_absentee(&self) -> bool {
        is_absentee(self.issuer())
    }

    /// Checks the validity window against `now`.
    ///
    /// # Errors
    ///
    /// [`ValidityError::Expired`] once `now >= exp`, and
    /// [`ValidityError::NotYetValid`] while `now < nbf`.
    pub fn check_time(&self, now: u64) -> Result<(), ValidityError> {
        let range = self.time_range();
        if range.is_expired(now) {
            return Err(ValidityError::Expired {
                cid: self.cid,
                expiration: self.expiration().unwrap_or_default(),
            });
        }
        if range.is_premature(now) {
            return Err(ValidityError::NotYetValid {
                cid: self.cid,
                not_before: self.not_before().unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Verifies the issuer's signature, resolving the issuer through
    /// `resolver`.
    ///
    /// # Errors
    ///
    /// [`ValidityError::InvalidSignature`] when the issuer cannot be
    /// resolved, the payload cannot be re-encoded, or the signature does
    /// not verify.
    pub fn verify_signature(&self, resolver: &dyn Resolver) -> Result<(), ValidityError> {
        let invalid = |reason: String| ValidityError::InvalidSignature {
            cid: self.cid,
            issuer: self.issuer().clone(),
            reason,
        };
        let payload = serde_ipld_dagcbor::to_vec(&self.payload).map_err(|error| invalid(error.to_string()))?;
        let verifier = resolver.resolve(self.issuer()).map_err(|error| invalid(error.to_string()))?;
        verifier
            .verify(&payload, &self.signature)
            .map_err(|error| invalid(error.to_string()))
    }

    /// Time bounds first, then the signature.
    ///
    /// # Errors
    ///
    /// See [`Delegation::check_time`] and [`Delegation::verify_signature`].
    pub fn validate(&self, now: u64, resolver: &dyn Resolver) -> Result<(), ValidityError> {
        self.check_time(now)?;
        self.verify_signature(resolver)
    }

    /// Lifecycle state at `now`.
    ///
    /// Revocation is terminal and reported even for expired delegations.
    #[must_use]
    pub fn status(&self, now: u64, revocations: &dyn Revocations) -> DelegationStatus {
        if revocations.is_revoked(&self.cid) {
            DelegationStatus::Revoked
        } else if self.time_range().is_expired(now) {
            DelegationStatus::Expired
        } else if self.time_range().is_premature(now) {
            DelegationStatus::Issued
        } else {
            DelegationStatus::Active
        }
    }

    /// Proofs carried along with this delegation.
    #[must_use]
    pub fn attached(&self) -> &[Arc<Delegation>] {
        &self.attached
    }

    /// Carries `proofs` along with this delegation. Already attached
    /// delegations are skipped.
    #[must_use]
    pub fn attach(mut self, proofs: impl IntoIterator<Item = Arc<Delegation>>) -> Self {
        for proof in proofs {
            if proof.cid != self.cid && !self.attached.iter().any(|known| known.cid == proof.cid) {
                self.attached.push(proof);
            }
        }
        self
    }

    /// Every attached delegation, transitively, each once.
    #[must_use]
    pub fn attachments(&self) -> Vec<Arc<Delegation>> {
        let mut seen = vec![self.cid];
        let mut out = Vec::new();
        let mut stack: Vec<Arc<Delegation>> = self.attached.iter().rev().cloned().collect();
        while let Some(next) = stack.pop() {
            if seen.contains(&next.cid) {
                continue;
            }
            seen.push(next.cid);
            stack.extend(next.attached.iter().rev().cloned());
            out.push(next);
        }
        out
    }
}

impl PartialEq for Delegation {
    fn eq(&self, other: &Self) -> bool {
        self.cid == other.cid
    }
}

impl Eq for Delegation {}

impl fmt::Debug for Delegation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegation")
            .field("cid", &self.cid.to_string())
            .field("iss", &self.payload.issuer)
            .field("aud", &self.payload.audience)
            .field("att", &self.payload.capabilities)
            .field("prf", &self.payload.proofs.len())
            .field("exp", &self.payload.expiration)
            .finish()
    }
}

impl Principal for Delegation {
    /// A delegation speaks for its issuer.
    fn did(&self) -> Did {
        self.issuer().clone()
    }
}

/// Where a delegation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegationStatus {
    /// Signed, but `nbf` has not been reached.
    Issued,
    /// Usable.
    Active,
    /// Past `exp`.
    Expired,
    /// Revoked. Terminal.
    Revoked,
}

pub(crate) fn signed<S: Signer + ?Sized>(
    payload: DelegationPayload,
    issuer: &S,
) -> Result<Delegation, DelegationError> {
    let bytes = serde_ipld_dagcbor::to_vec(&payload).map_err(CodecError::from)?;
    let signature = issuer.sign(&bytes)?;
    let delegation = Delegation::from_parts(payload, signature)?;
    trace!(
        cid = %delegation.cid(),
        issuer = %delegation.issuer(),
        audience = %delegation.audience(),
        "signed delegation"
    );
    Ok(delegation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revocation::{MemoryRevocations, NoRevocations, Revocation};
    use pretty_assertions::assert_eq;
    use testresult::TestResult;
    use warden_credentials::{Absentee, Ed25519KeyResolver, Ed25519Signer};
    use warden_varsig::did;

    fn test_signer(seed: u8) -> Ed25519Signer {
        Ed25519Signer::import(&[seed; 32]).unwrap()
    }

    fn space_info(with: &Did) -> Capability {
        Capability::new("space/info".parse().unwrap(), with)
    }

    #[test]
    fn identical_inputs_produce_identical_cids() -> TestResult {
        let alice = test_signer(1);
        let bob = test_signer(2);
        let build = || {
            Delegation::builder()
                .audience(bob.did())
                .capability(space_info(&alice.did()))
                .expiration(1_000)
                .sign(&alice)
        };
        let first = build()?;
        let second = build()?;
        assert_eq!(first.cid(), second.cid());
        assert_eq!(first.as_bytes(), second.as_bytes());
        Ok(())
    }

    #[test]
    fn decoding_preserves_the_cid() -> TestResult {
        let alice = test_signer(1);
        let delegation = Delegation::builder()
            .audience(test_signer(2).did())
            .capability(space_info(&alice.did()))
            .fact("name", "home")
            .nonce("n1")
            .sign(&alice)?;

        let decoded = Delegation::decode(delegation.as_bytes())?;
        assert_eq!(decoded.cid(), delegation.cid());
        assert_eq!(decoded.payload(), delegation.payload());
        assert_eq!(decoded.nonce(), Some("n1"));
        Ok(())
    }

    #[test]
    fn signatures_verify_against_the_issuer() -> TestResult {
        let alice = test_signer(1);
        let delegation = Delegation::builder()
            .audience(test_signer(2).did())
            .capability(space_info(&alice.did()))
            .sign(&alice)?;
        delegation.verify_signature(&Ed25519KeyResolver)?;
        Ok(())
    }

    #[test]
    fn forged_issuers_fail_verification() -> TestResult {
        let alice = test_signer(1);
        let mallory = test_signer(3);
        let honest = Delegation::builder()
            .audience(mallory.did())
            .capability(space_info(&alice.did()))
            .sign(&mallory)?;

        let mut payload = honest.payload().clone();
        payload.issuer = alice.did();
        let forged = Delegation::from_parts(payload, honest.signature().clone())?;

        let error = forged.verify_signature(&Ed25519KeyResolver).unwrap_err();
        assert!(matches!(error, ValidityError::InvalidSignature { .. }));
        Ok(())
    }

    #[test]
    fn expiration_boundary_is_exclusive() -> TestResult {
        let alice = test_signer(1);
        let delegation = Delegation::builder()
            .audience(test_signer(2).did())
            .capability(space_info(&alice.did()))
            .expiration(100)
            .sign(&alice)?;

        assert!(delegation.check_time(99).is_ok());
        assert_eq!(
            delegation.check_time(100),
            Err(ValidityError::Expired {
                cid: *delegation.cid(),
                expiration: 100
            })
        );
        Ok(())
    }

    #[test]
    fn not_before_boundary_is_inclusive() -> TestResult {
        let alice = test_signer(1);
        let delegation = Delegation::builder()
            .audience(test_signer(2).did())
            .capability(space_info(&alice.did()))
            .not_before(100)
            .sign(&alice)?;

        assert!(matches!(
            delegation.check_time(99),
            Err(ValidityError::NotYetValid { not_before: 100, .. })
        ));
        assert!(delegation.check_time(100).is_ok());
        Ok(())
    }

    #[test]
    fn absentee_delegations_carry_no_signature() -> TestResult {
        let account = Absentee::new(did!("mailto:example.com:alice"));
        let delegation = Delegation::builder()
            .audience(test_signer(2).did())
            .capability(Capability::new("provider/add".parse()?, warden_capability::Resource::any()))
            .sign(&account)?;

        assert!(delegation.is_absentee());
        assert!(delegation.signature().is_absent());
        assert!(delegation.verify_signature(&Ed25519KeyResolver).is_err());
        Ok(())
    }

    #[test]
    fn revocation_dominates_expiration() -> TestResult {
        let alice = test_signer(1);
        let delegation = Arc::new(
            Delegation::builder()
                .audience(test_signer(2).did())
                .capability(space_info(&alice.did()))
                .expiration(100)
                .sign(&alice)?,
        );
        assert_eq!(delegation.status(50, &NoRevocations), DelegationStatus::Active);
        assert_eq!(delegation.status(150, &NoRevocations), DelegationStatus::Expired);

        let revocations = MemoryRevocations::new();
        revocations.record(Revocation {
            revoked: *delegation.cid(),
            revoked_at: 60,
            revoked_by: delegation.clone(),
        });
        assert_eq!(delegation.status(150, &revocations), DelegationStatus::Revoked);
        assert_eq!(delegation.status(50, &revocations), DelegationStatus::Revoked);
        Ok(())
    }

    #[test]
    fn attachments_are_collected_transitively_once() -> TestResult {
        let alice = test_signer(1);
        let bob = test_signer(2);
        let carol = test_signer(3);

        let root = Arc::new(
            Delegation::builder()
                .audience(bob.did())
                .capability(space_info(&alice.did()))
                .sign(&alice)?,
        );
        let middle = Arc::new(
            Delegation::builder()
                .audience(carol.did())
                .capability(space_info(&alice.did()))
                .proof(root.clone())
                .sign(&bob)?,
        );
        let leaf = Delegation::builder()
            .audience(alice.did())
            .capability(space_info(&alice.did()))
            .proof(middle.clone())
            .proof(root.clone())
            .sign(&carol)?;

        let cids: Vec<Cid> = leaf.attachments().iter().map(|d| *d.cid()).collect();
        assert_eq!(cids, vec![*middle.cid(), *root.cid()]);
        assert_eq!(leaf.proofs(), &[*middle.cid(), *root.cid()]);
        Ok(())
    }
}
