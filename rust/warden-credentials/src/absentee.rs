use serde::Serialize;
use warden_varsig::{Did, Principal, Signature, Signer};

/// A principal without a key, such as a `did:mailto` account.
///
/// Absentees may issue delegations, but their signature is empty. A
/// verifier only honours such a delegation when it comes with an
/// attestation from a trusted service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Absentee {
    did: Did,
}

impl Absentee {
    /// Creates an absentee for `did`.
    #[must_use]
    pub fn new(did: Did) -> Self {
        Self { did }
    }
}

impl From<Did> for Absentee {
    fn from(did: Did) -> Self {
        Self::new(did)
    }
}

impl Principal for Absentee {
    fn did(&self) -> Did {
        self.did.clone()
    }
}

impl Signer for Absentee {
    fn sign(&self, _payload: &[u8]) -> Result<Signature, signature::Error> {
        Ok(Signature::absent())
    }
}
