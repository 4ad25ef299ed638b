//! Signature envelopes and the signing / verification traits.

use std::fmt::Debug;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use warden_common::ConditionalSync;

use crate::principal::Principal;

/// Signature algorithm, carried as the first byte of an encoded
/// [`Signature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Ed25519 (EdDSA over Curve25519).
    EdDsa,

    /// No signature at all.
    ///
    /// Produced by absentee principals such as `did:mailto` accounts,
    /// which hold no key. Such a delegation only counts once a trusted
    /// party attests to it.
    Absent,
}

impl Algorithm {
    const EDDSA: u8 = 0xed;
    const ABSENT: u8 = 0x00;

    /// One-byte tag used in the encoded signature.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::EdDsa => Self::EDDSA,
            Self::Absent => Self::ABSENT,
        }
    }

    /// Looks up an algorithm by its tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            Self::EDDSA => Some(Self::EdDsa),
            Self::ABSENT => Some(Self::Absent),
            _ => None,
        }
    }
}

/// A signature tagged with the algorithm that produced it.
///
/// Encodes as a single byte string: the algorithm tag followed by the raw
/// signature bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    algorithm: Algorithm,
    bytes: Vec<u8>,
}

impl Signature {
    /// Wraps raw signature bytes.
    #[must_use]
    pub fn new(algorithm: Algorithm, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    /// The empty signature of an absentee principal.
    #[must_use]
    pub fn absent() -> Self {
        Self::new(Algorithm::Absent, Vec::new())
    }

    /// The algorithm this signature was made with.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The raw signature bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether this is an absentee (empty) signature.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.algorithm == Algorithm::Absent && self.bytes.is_empty()
    }

    /// Encodes as tag followed by raw bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes.len() + 1);
        out.push(self.algorithm.tag());
        out.extend_from_slice(&self.bytes);
        out
    }

    /// Decodes the tagged form produced by [`Signature::to_bytes`].
    ///
    /// # Errors
    ///
    /// Fails on an empty input or an unknown algorithm tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureDecodeError> {
        let (tag, rest) = bytes.split_first().ok_or(SignatureDecodeError::Empty)?;
        let algorithm = Algorithm::from_tag(*tag).ok_or(SignatureDecodeError::UnknownAlgorithm(*tag))?;
        Ok(Self::new(algorithm, rest.to_vec()))
    }
}

/// Errors decoding a [`Signature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureDecodeError {
    /// No bytes at all.
    #[error("empty signature encoding")]
    Empty,

    /// The algorithm tag is not recognised.
    #[error("unknown signature algorithm tag {0:#04x}")]
    UnknownAlgorithm(u8),
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_bytes::Bytes::new(&self.to_bytes()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Signature::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Something that can sign payloads as a [`Principal`].
pub trait Signer: Principal + ConditionalSync + Debug {
    /// Signs `payload`.
    ///
    /// # Errors
    ///
    /// Returns a [`signature::Error`] if the underlying key refuses to sign.
    fn sign(&self, payload: &[u8]) -> Result<Signature, signature::Error>;
}

impl<S: Signer + ?Sized> Signer for std::sync::Arc<S> {
    fn sign(&self, payload: &[u8]) -> Result<Signature, signature::Error> {
        (**self).sign(payload)
    }
}

/// Something that can check signatures made by one principal.
pub trait Verifier: ConditionalSync + Debug {
    /// Verifies `signature` over `payload`.
    ///
    /// # Errors
    ///
    /// Returns a [`signature::Error`] if the signature does not verify.
    fn verify(&self, payload: &[u8], signature: &Signature) -> Result<(), signature::Error>;
}
