//! Content addressing.
//!
//! Every delegation is identified by a CIDv1 over its DAG-CBOR encoding,
//! hashed with sha2-256.

use ipld_core::cid::{Cid, multihash::Multihash};
use sha2::{Digest, Sha256};

use crate::CodecError;

/// Multicodec code for DAG-CBOR.
pub const DAG_CBOR: u64 = 0x71;

/// Multihash code for sha2-256.
pub const SHA2_256: u64 = 0x12;

/// Computes the DAG-CBOR CID of already encoded `bytes`.
///
/// # Errors
///
/// Only fails if the digest does not fit a multihash, which cannot happen
/// for sha2-256.
pub fn to_cid(bytes: &[u8]) -> Result<Cid, CodecError> {
    let digest = Sha256::digest(bytes);
    let hash = Multihash::<64>::wrap(SHA2_256, &digest)
        .map_err(|error| CodecError::Cid(error.to_string()))?;
    Ok(Cid::new_v1(DAG_CBOR, hash))
}
