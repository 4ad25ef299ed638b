//! Concrete principals.
//!
//! | Type | DID method | Signs with |
//! |------|------------|------------|
//! | [`Ed25519Signer`] | `did:key` (or a `did:web` alias) | Ed25519 |
//! | [`Absentee`] | `did:mailto` | nothing; needs an attestation |
//!
//! Verification goes through [`Ed25519KeyResolver`] for `did:key`
//! identifiers and [`WebDidResolver`] for `did:web` services whose key is
//! known to the host. [`default_resolver`] chains the two.

mod absentee;
pub mod ed25519;
mod web;

pub use absentee::Absentee;
pub use ed25519::{
    Ed25519DidFromStrError, Ed25519KeyError, Ed25519KeyResolver, Ed25519Signer, Ed25519Verifier,
};
pub use web::WebDidResolver;

use warden_varsig::{CompositeResolver, Resolver};

/// `did:key` resolution with a fallback onto the given `did:web` mapping.
pub fn default_resolver(web: WebDidResolver) -> CompositeResolver<Ed25519KeyResolver, WebDidResolver> {
    Ed25519KeyResolver.or(web)
}
