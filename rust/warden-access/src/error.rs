use ipld_core::cid::Cid;
use warden_capability::{Ability, CapabilityParseError};
use warden_credentials::Ed25519KeyError;
use warden_ucan::{AuthorizationFailure, CodecError, DelegationError, ValidityError};
use warden_varsig::Did;

use crate::{connection::TransportError, invocation::Failure, mailto::EmailError};

/// The agent cannot show it holds the authority it is trying to exercise
/// over a delegation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorityError {
    /// Neither the proof store nor the supplied proofs contain it.
    #[error("unable to find delegation {0}")]
    UnknownDelegation(Cid),

    /// The principal neither issued the delegation nor any of its proofs.
    #[error("{principal} has no authority to revoke {cid}")]
    NotAuthorized {
        /// The delegation.
        cid: Cid,
        /// Who tried to revoke it.
        principal: Did,
    },
}

/// A protocol message does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Invocations carry exactly one capability.
    #[error("invocation {cid} carries {count} capabilities, expected one")]
    InvalidInvocation {
        /// The invocation.
        cid: Cid,
        /// How many it carries.
        count: usize,
    },

    /// Caveats do not decode for the ability.
    #[error("invalid caveats for {ability}: {reason}")]
    InvalidCaveats {
        /// The ability.
        ability: String,
        /// Decoder message.
        reason: String,
    },

    /// A delegation was expected to be addressed to someone else.
    #[error("delegation {cid} is addressed to {actual}, expected {expected}")]
    WrongAudience {
        /// The delegation.
        cid: Cid,
        /// The expected audience.
        expected: Did,
        /// Its audience.
        actual: Did,
    },

    /// A delegation does not delegate any DID resource.
    #[error("delegation {0} does not delegate a space")]
    NotASpace(Cid),

    /// A result does not have the shape its ability promises.
    #[error("unexpected result for {ability}: {reason}")]
    UnexpectedResult {
        /// The ability invoked.
        ability: String,
        /// What was wrong.
        reason: String,
    },

    /// A confirmation link is missing its delegation.
    #[error("invalid confirmation link: {0}")]
    InvalidConfirmation(String),
}

/// Errors surfaced by [`Agent`](crate::agent::Agent) operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The agent holds no chain for an ability it was asked to delegate.
    #[error("cannot delegate capability {ability}")]
    CannotDelegate {
        /// The ability.
        ability: Ability,
        /// Why resolution failed.
        #[source]
        source: AuthorizationFailure,
    },

    /// No proof chain authorizes an invocation.
    #[error(transparent)]
    Unauthorized(#[from] AuthorizationFailure),

    /// An operation needs a current space and none is set.
    #[error("no current space; create or select one first")]
    NoCurrentSpace,

    /// Nothing in the proof store mentions the space.
    #[error("Agent has no proofs for {0}.")]
    NoProofs(Did),

    /// A delegation handed to the agent is not valid.
    #[error(transparent)]
    Invalid(#[from] ValidityError),

    /// See [`AuthorityError`].
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    /// See [`ProtocolError`].
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Issuing a delegation or invocation failed.
    #[error(transparent)]
    Delegation(#[from] DelegationError),

    /// A delegation could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Key generation failed.
    #[error(transparent)]
    Key(#[from] Ed25519KeyError),

    /// A capability could not be built from its parts.
    #[error(transparent)]
    Capability(#[from] CapabilityParseError),

    /// See [`EmailError`].
    #[error(transparent)]
    Email(#[from] EmailError),

    /// The service answered with an error.
    #[error("{0}")]
    Failure(#[from] Failure),

    /// The connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}
