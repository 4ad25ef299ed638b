//! Ed25519 DID principal and verifier.

use super::{ED25519_PUB, error::Ed25519DidFromStrError};
use base58::{FromBase58, ToBase58};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use warden_varsig::{Algorithm, Did, Principal, Signature, Verifier};

/// An `Ed25519` `did:key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Verifier(pub ed25519_dalek::VerifyingKey);

impl Ed25519Verifier {
    /// Raw public key bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl From<ed25519_dalek::VerifyingKey> for Ed25519Verifier {
    fn from(key: ed25519_dalek::VerifyingKey) -> Self {
        Ed25519Verifier(key)
    }
}

impl std::fmt::Display for Ed25519Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut raw_bytes = Vec::with_capacity(34);
        raw_bytes.extend_from_slice(&ED25519_PUB);
        raw_bytes.extend_from_slice(&self.0.to_bytes());
        write!(f, "did:key:z{}", raw_bytes.to_base58())
    }
}

impl FromStr for Ed25519Verifier {
    type Err = Ed25519DidFromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let b58 = s
            .strip_prefix("did:key:")
            .ok_or(Ed25519DidFromStrError::InvalidDidHeader)?
            .strip_prefix('z')
            .ok_or(Ed25519DidFromStrError::MissingBase58Prefix)?;
        let key_bytes = b58
            .from_base58()
            .map_err(|_| Ed25519DidFromStrError::InvalidBase58)?;
        let raw_arr = <[u8; 34]>::try_from(key_bytes.as_slice())
            .map_err(|_| Ed25519DidFromStrError::InvalidKey)?;
        if raw_arr[..2] != ED25519_PUB {
            return Err(Ed25519DidFromStrError::InvalidKey);
        }
        let key_arr: [u8; 32] = raw_arr[2..]
            .try_into()
            .map_err(|_| Ed25519DidFromStrError::InvalidKey)?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&key_arr)
            .map_err(|_| Ed25519DidFromStrError::InvalidKey)?;
        Ok(Ed25519Verifier(key))
    }
}

impl Verifier for Ed25519Verifier {
    fn verify(&self, payload: &[u8], signature: &Signature) -> Result<(), signature::Error> {
        if signature.algorithm() != Algorithm::EdDsa {
            return Err(signature::Error::new());
        }
        let signature = ed25519_dalek::Signature::from_slice(signature.bytes())?;
        self.0.verify_strict(payload, &signature)
    }
}

impl Principal for Ed25519Verifier {
    fn did(&self) -> Did {
        #[allow(clippy::expect_used)]
        self.to_string().parse().expect("valid DID string")
    }
}

impl Serialize for Ed25519Verifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ed25519Verifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
