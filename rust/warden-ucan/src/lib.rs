//! Content-addressed delegations and proof chain resolution.
//!
//! A [`Delegation`] grants capabilities from an issuer to an audience and
//! cites, by CID, the delegations the issuer's own authority rests on.
//! Delegations are collected in a [`ProofStore`]; [`resolve`] searches a
//! snapshot of one for a chain that authorizes an invoker:
//!
//! ```text
//!   space ──*──▶ alice ──store/*──▶ bob ──store/add──▶ (invocation)
//!   root                                  head
//! ```
//!
//! 1. Candidates are delegations addressed to the invoker, in insertion
//!    order.
//! 2. A candidate must be unrevoked, within its time bounds, and signed by
//!    its issuer. Absentee issuers (`did:mailto`) need an attestation
//!    instead.
//! 3. One of its capabilities must derive the claim under the
//!    [`DerivationRules`](warden_capability::DerivationRules).
//! 4. If the issuer is the resource the chain is complete; otherwise the
//!    matched capability is claimed from the candidate's own proofs.
//!
//! The first complete chain wins.

mod archive;
pub mod attestation;
mod delegation;
mod error;
pub mod link;
pub mod resolve;
pub mod revocation;
pub mod store;
pub mod time;

pub use attestation::{Attesters, attest, is_attestation_of};
pub use delegation::*;
pub use error::*;
pub use resolve::{ChainLink, ProofChain, ResolveOptions, resolve};
pub use revocation::{MemoryRevocations, NoRevocations, Revocation, Revocations};
pub use store::ProofStore;
pub use time::TimeRange;

pub use ipld_core::{cid::Cid, ipld::Ipld};
