//! Error types.

use ipld_core::cid::Cid;
use serde_ipld_dagcbor::error::{DecodeError, EncodeError};
use warden_capability::{Ability, CapabilityParseError, DerivationError, Resource};
use warden_varsig::Did;

/// Encoding and decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A value could not be encoded as DAG-CBOR.
    #[error("failed to encode: {0}")]
    Encode(String),

    /// Bytes could not be decoded.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// A CID could not be built or parsed.
    #[error("invalid CID: {0}")]
    Cid(String),

    /// An archive does not contain its root block.
    #[error("archive is missing its root block {0}")]
    MissingRoot(Cid),
}

impl<E: std::fmt::Debug> From<EncodeError<E>> for CodecError {
    fn from(error: EncodeError<E>) -> Self {
        Self::Encode(error.to_string())
    }
}

impl<E: std::fmt::Debug> From<DecodeError<E>> for CodecError {
    fn from(error: DecodeError<E>) -> Self {
        Self::Decode(error.to_string())
    }
}

/// Errors issuing a delegation.
#[derive(Debug, thiserror::Error)]
pub enum DelegationError {
    /// No audience was set on the builder.
    #[error("delegation has no audience")]
    MissingAudience,

    /// The issuer refused to sign.
    #[error("failed to sign delegation: {0}")]
    Signing(#[from] signature::Error),

    /// The payload could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A capability could not be constructed.
    #[error(transparent)]
    Capability(#[from] CapabilityParseError),
}

/// Why a single delegation is not currently usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidityError {
    /// The signature does not verify against the issuer.
    #[error("Proof {cid} does not have a valid signature from {issuer}: {reason}")]
    InvalidSignature {
        /// The delegation.
        cid: Cid,
        /// Its claimed issuer.
        issuer: Did,
        /// What went wrong.
        reason: String,
    },

    /// `now` has reached the expiration.
    #[error("Proof {cid} has expired on {expiration}")]
    Expired {
        /// The delegation.
        cid: Cid,
        /// Its `exp`.
        expiration: u64,
    },

    /// `now` is before `nbf`.
    #[error("Proof {cid} is not valid before {not_before}")]
    NotYetValid {
        /// The delegation.
        cid: Cid,
        /// Its `nbf`.
        not_before: u64,
    },

    /// The delegation was revoked.
    #[error("Proof {cid} has been revoked")]
    Revoked {
        /// The delegation.
        cid: Cid,
    },
}

impl ValidityError {
    /// The delegation the error is about.
    #[must_use]
    pub const fn cid(&self) -> &Cid {
        match self {
            Self::InvalidSignature { cid, .. }
            | Self::Expired { cid, .. }
            | Self::NotYetValid { cid, .. }
            | Self::Revoked { cid } => cid,
        }
    }
}

/// Why a delegation could not serve as a link in a proof chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkFailure {
    /// The delegation itself is not valid right now.
    #[error(transparent)]
    Invalid(#[from] ValidityError),

    /// An absentee issued the delegation and no acceptable attestation
    /// vouches for it.
    #[error("Proof {cid} issued by {issuer} has no valid attestation")]
    Unattested {
        /// The delegation.
        cid: Cid,
        /// The absentee issuer.
        issuer: Did,
    },

    /// None of the delegation's capabilities cover the claim.
    #[error("Proof {cid} does not delegate the claimed capability: {error}")]
    Derivation {
        /// The delegation.
        cid: Cid,
        /// The last derivation failure.
        error: DerivationError,
    },

    /// A proof named in `prf` is not available.
    #[error("Proof {cid} references {proof}, which is not available")]
    MissingProof {
        /// The delegation.
        cid: Cid,
        /// The missing proof.
        proof: Cid,
    },

    /// A proof was delegated to someone other than the delegation's issuer.
    #[error("Proof {cid} is delegated to {actual}, expected {expected}")]
    AudienceMismatch {
        /// The proof.
        cid: Cid,
        /// The issuer that relies on it.
        expected: Did,
        /// Its actual audience.
        actual: Did,
    },
}

/// No chain of valid delegations grants the requested capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no proofs available for resource {resource} and ability {ability}")]
pub struct AuthorizationFailure {
    /// The resource that was requested.
    pub resource: Resource,
    /// The ability that was requested.
    pub ability: Ability,
    /// Why each candidate delegation was rejected, in the order they were
    /// tried.
    pub causes: Vec<LinkFailure>,
}

impl AuthorizationFailure {
    /// Whether any candidate failed because it was revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.causes
            .iter()
            .any(|cause| matches!(cause, LinkFailure::Invalid(ValidityError::Revoked { .. })))
    }

    /// Whether any candidate failed because it had expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.causes
            .iter()
            .any(|cause| matches!(cause, LinkFailure::Invalid(ValidityError::Expired { .. })))
    }
}
