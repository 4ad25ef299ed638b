//! Ed25519 signer implementation.

use super::{error::Ed25519KeyError, verifier::Ed25519Verifier};
use ed25519_dalek::Signer as _;
use serde::Serialize;
use warden_varsig::{Algorithm, Did, Principal, Signature, Signer};

/// An `Ed25519` signer.
///
/// Identifies as its `did:key` unless given another identity with
/// [`Ed25519Signer::with_did`], which is how services sign as their
/// `did:web` name.
#[derive(Clone)]
pub struct Ed25519Signer {
    verifier: Ed25519Verifier,
    key: ed25519_dalek::SigningKey,
    alias: Option<Did>,
}

impl From<ed25519_dalek::SigningKey> for Ed25519Signer {
    fn from(key: ed25519_dalek::SigningKey) -> Self {
        let verifier = Ed25519Verifier::from(key.verifying_key());
        Self {
            verifier,
            key,
            alias: None,
        }
    }
}

impl Ed25519Signer {
    /// Generate a new Ed25519 keypair with random bytes from `getrandom`.
    ///
    /// # Errors
    ///
    /// Returns an error if the RNG fails.
    pub fn generate() -> Result<Self, Ed25519KeyError> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed)?;
        Ok(ed25519_dalek::SigningKey::from_bytes(&seed).into())
    }

    /// Import a keypair from its 32 byte seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed has the wrong length.
    pub fn import(seed: &[u8]) -> Result<Self, Ed25519KeyError> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| Ed25519KeyError::InvalidSeedLength(seed.len()))?;
        Ok(ed25519_dalek::SigningKey::from_bytes(&seed).into())
    }

    /// Export the 32 byte seed.
    #[must_use]
    pub fn export(&self) -> [u8; 32] {
        self.key.to_bytes()
    }

    /// Sign as `did` instead of the key's own `did:key`.
    #[must_use]
    pub fn with_did(mut self, did: Did) -> Self {
        self.alias = Some(did);
        self
    }

    /// The key's own verifier, regardless of any alias.
    #[must_use]
    pub const fn verifier(&self) -> &Ed25519Verifier {
        &self.verifier
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("did", &self.did())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.did())
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, payload: &[u8]) -> Result<Signature, signature::Error> {
        let signature = self.key.try_sign(payload)?;
        Ok(Signature::new(Algorithm::EdDsa, signature.to_bytes().to_vec()))
    }
}

impl Principal for Ed25519Signer {
    fn did(&self) -> Did {
        match &self.alias {
            Some(did) => did.clone(),
            None => self.verifier.did(),
        }
    }
}

impl Serialize for Ed25519Signer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.did().serialize(serializer)
    }
}
