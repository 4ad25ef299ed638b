//! Invocations and their receipts.

use std::{fmt, sync::Arc};

use ipld_core::{cid::Cid, ipld::Ipld};
use warden_capability::Capability;
use warden_ucan::{AuthorizationFailure, CodecError, Delegation, DelegationError, ValidityError};
use warden_varsig::{Did, Signer};

use crate::{
    AuthorityError, ProtocolError, mailto::EmailError, storage::StorageError,
};

/// A request to exercise one capability, addressed to the service that
/// performs it.
///
/// An invocation is a delegation to the service carrying exactly one
/// capability, with the proofs of the invoker's authority attached.
#[derive(Clone, PartialEq)]
pub struct Invocation {
    delegation: Arc<Delegation>,
}

impl Invocation {
    /// Wraps a delegation, which must carry exactly one capability.
    pub fn new(delegation: impl Into<Arc<Delegation>>) -> Result<Self, ProtocolError> {
        let delegation = delegation.into();
        match delegation.capabilities().len() {
            1 => Ok(Self { delegation }),
            count => Err(ProtocolError::InvalidInvocation {
                cid: *delegation.cid(),
                count,
            }),
        }
    }

    /// Signs an invocation of `capability` by `issuer`.
    pub fn issue<S: Signer + ?Sized>(
        issuer: &S,
        audience: Did,
        capability: Capability,
        proofs: impl IntoIterator<Item = Arc<Delegation>>,
        expiration: Option<u64>,
        nonce: Option<String>,
    ) -> Result<Self, DelegationError> {
        let mut builder = Delegation::builder()
            .audience(audience)
            .capability(capability)
            .proofs(proofs)
            .expiration_opt(expiration);
        if let Some(nonce) = nonce {
            builder = builder.nonce(nonce);
        }
        Ok(Self {
            delegation: Arc::new(builder.sign(issuer)?),
        })
    }

    /// Decodes an invocation from the archive produced by [`Self::archive`].
    pub fn extract(bytes: &[u8]) -> Result<Arc<Delegation>, CodecError> {
        Delegation::extract(bytes).map(Arc::new)
    }

    /// The invocation and its proofs as one archive.
    pub fn archive(&self) -> Result<Vec<u8>, CodecError> {
        self.delegation.archive()
    }

    /// The underlying delegation.
    pub fn delegation(&self) -> &Arc<Delegation> {
        &self.delegation
    }

    /// The invocation's CID.
    pub fn cid(&self) -> &Cid {
        self.delegation.cid()
    }

    /// Who invokes.
    pub fn issuer(&self) -> &Did {
        self.delegation.issuer()
    }

    /// Who is asked to perform it.
    pub fn audience(&self) -> &Did {
        self.delegation.audience()
    }

    /// The invoked capability.
    pub fn capability(&self) -> &Capability {
        // Constructors guarantee exactly one.
        &self.delegation.capabilities()[0]
    }

    /// Every attached proof, transitively.
    pub fn proofs(&self) -> Vec<Arc<Delegation>> {
        self.delegation.attachments()
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("cid", self.cid())
            .field("issuer", self.issuer())
            .field("capability", self.capability())
            .finish()
    }
}

/// A failed invocation, as reported in its receipt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct Failure {
    /// Machine readable error name.
    pub name: String,
    /// Human readable description.
    pub message: String,
}

impl Failure {
    /// A failure called `name`.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<AuthorizationFailure> for Failure {
    fn from(error: AuthorizationFailure) -> Self {
        Self::new("Unauthorized", error.to_string())
    }
}

impl From<ValidityError> for Failure {
    fn from(error: ValidityError) -> Self {
        let name = match error {
            ValidityError::InvalidSignature { .. } => "InvalidSignature",
            ValidityError::Expired { .. } => "Expired",
            ValidityError::NotYetValid { .. } => "NotValidBefore",
            ValidityError::Revoked { .. } => "Revoked",
        };
        Self::new(name, error.to_string())
    }
}

impl From<ProtocolError> for Failure {
    fn from(error: ProtocolError) -> Self {
        Self::new("MalformedInvocation", error.to_string())
    }
}

impl From<AuthorityError> for Failure {
    fn from(error: AuthorityError) -> Self {
        Self::new("UnauthorizedRevocation", error.to_string())
    }
}

impl From<StorageError> for Failure {
    fn from(error: StorageError) -> Self {
        Self::new("StorageOperationFailed", error.to_string())
    }
}

impl From<DelegationError> for Failure {
    fn from(error: DelegationError) -> Self {
        Self::new("IssueFailed", error.to_string())
    }
}

impl From<CodecError> for Failure {
    fn from(error: CodecError) -> Self {
        Self::new("EncodeFailed", error.to_string())
    }
}

impl From<EmailError> for Failure {
    fn from(error: EmailError) -> Self {
        Self::new("InvalidEmail", error.to_string())
    }
}

/// The outcome of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// CID of the invocation that ran.
    pub ran: Cid,
    /// Its result.
    pub out: Result<Ipld, Failure>,
}

impl Receipt {
    /// A successful outcome.
    pub fn ok(ran: Cid, value: Ipld) -> Self {
        Self { ran, out: Ok(value) }
    }

    /// A failed outcome.
    pub fn error(ran: Cid, failure: impl Into<Failure>) -> Self {
        Self {
            ran,
            out: Err(failure.into()),
        }
    }

    /// Whether the invocation succeeded.
    pub fn is_ok(&self) -> bool {
        self.out.is_ok()
    }

    /// The result, consuming the receipt.
    pub fn into_result(self) -> Result<Ipld, Failure> {
        self.out
    }
}
