//! DID-to-verifier resolution.

use std::fmt::Debug;
use std::sync::Arc;

use warden_common::ConditionalSync;

use crate::{did::Did, signature::Verifier};

/// Error produced when a DID cannot be resolved to a verifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unable to resolve {did}: {reason}")]
pub struct ResolveError {
    /// The DID that failed to resolve.
    pub did: Did,
    /// Why.
    pub reason: String,
}

impl ResolveError {
    /// Creates a resolve error for `did`.
    pub fn new(did: &Did, reason: impl Into<String>) -> Self {
        Self {
            did: did.clone(),
            reason: reason.into(),
        }
    }

    /// The DID method is not handled by this resolver.
    pub fn unsupported(did: &Did) -> Self {
        Self::new(did, format!("unsupported DID method {}", did.method()))
    }
}

/// Resolves a DID to a [`Verifier`].
///
/// Given a DID, looks up or derives the public key material needed to
/// verify signatures. `did:key` identifiers are self-describing; other
/// methods (e.g. `did:web`) need a mapping supplied by the host.
pub trait Resolver: ConditionalSync + Debug {
    /// Resolve a DID to a verifier.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the DID is malformed or its method is
    /// not handled here.
    fn resolve(&self, did: &Did) -> Result<Box<dyn Verifier>, ResolveError>;

    /// Combine with another resolver consulted when this one fails.
    ///
    /// ```ignore
    /// let resolver = key_resolver.or(web_resolver);
    /// ```
    fn or<R>(self, other: R) -> CompositeResolver<Self, R>
    where
        Self: Sized,
    {
        CompositeResolver(self, other)
    }
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn resolve(&self, did: &Did) -> Result<Box<dyn Verifier>, ResolveError> {
        (**self).resolve(did)
    }
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn resolve(&self, did: &Did) -> Result<Box<dyn Verifier>, ResolveError> {
        (**self).resolve(did)
    }
}

/// A resolver that tries its left side first and falls back to the right.
///
/// Built via [`Resolver::or`].
#[derive(Debug, Clone, Copy)]
pub struct CompositeResolver<L, R>(pub L, pub R);

impl<L: Resolver, R: Resolver> Resolver for CompositeResolver<L, R> {
    fn resolve(&self, did: &Did) -> Result<Box<dyn Verifier>, ResolveError> {
        self.0.resolve(did).or_else(|_| self.1.resolve(did))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Signature, did};

    #[derive(Debug)]
    struct AcceptAll;

    impl Verifier for AcceptAll {
        fn verify(&self, _: &[u8], _: &Signature) -> Result<(), signature::Error> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct OnlyMethod(&'static str);

    impl Resolver for OnlyMethod {
        fn resolve(&self, did: &Did) -> Result<Box<dyn Verifier>, ResolveError> {
            if did.method() == self.0 {
                Ok(Box::new(AcceptAll))
            } else {
                Err(ResolveError::unsupported(did))
            }
        }
    }

    #[test]
    fn composite_falls_back_to_the_right() {
        let resolver = OnlyMethod("key").or(OnlyMethod("web"));
        assert!(resolver.resolve(&did!("key:z6Mk")).is_ok());
        assert!(resolver.resolve(&did!("web:example.com")).is_ok());

        let error = resolver.resolve(&did!("mailto:example.com:alice")).unwrap_err();
        assert_eq!(error.to_string(), "unable to resolve did:mailto:example.com:alice: unsupported DID method mailto");
    }
}
