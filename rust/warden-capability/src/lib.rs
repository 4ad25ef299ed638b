//! Capabilities and the rules for narrowing them.
//!
//! A [`Capability`] names an ability (`can`) on a resource (`with`),
//! optionally constrained by caveats (`nb`):
//!
//! ```rust
//! use warden_capability::Capability;
//!
//! let capability = Capability::parse("store/add", "did:key:z6Mkexample")
//!     .unwrap()
//!     .with_caveat("size", 1024);
//!
//! assert_eq!(capability.can.as_str(), "store/add");
//! ```
//!
//! # Abilities
//!
//! Abilities are slash-delimited paths. Two wildcard forms delegate whole
//! families at once:
//!
//! | Ability | Covers |
//! |---------|--------|
//! | `*` | every ability |
//! | `store/*` | `store/add`, `store/remove`, ... |
//! | `store/add` | only `store/add` |
//!
//! # Resources
//!
//! Resources are URIs, usually the DID of a space or agent. `ucan:*`
//! stands for "whatever resource the proof chain is rooted in", and a
//! trailing `*` matches any resource with that prefix.
//!
//! # Derivation
//!
//! [`DerivationRules`] decides whether a requested capability is covered
//! by a delegated one. Rules are registered per ability when the registry
//! is built; abilities without a rule fall back to [`equal_with`]. The
//! [`DerivationRules::standard`] registry knows the service catalogue.

mod ability;
mod capability;
pub mod caveats;
mod error;
mod resource;
mod rules;
pub mod standard;

pub use ability::*;
pub use capability::*;
pub use error::*;
pub use resource::*;
pub use rules::*;

pub use ipld_core::ipld::Ipld;
