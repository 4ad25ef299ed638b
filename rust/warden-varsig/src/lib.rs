//! Identity and signature plumbing.
//!
//! This crate defines what it means to *be* somebody ([`Principal`]), to
//! sign as them ([`Signer`]), to check their signatures ([`Verifier`]) and
//! to find a verifier for an arbitrary [`Did`] ([`Resolver`]). Concrete key
//! types live in `warden-credentials`.

pub mod did;
pub mod principal;
pub mod resolver;
pub mod signature;

pub use did::*;
pub use principal::*;
pub use resolver::*;
pub use signature::*;
