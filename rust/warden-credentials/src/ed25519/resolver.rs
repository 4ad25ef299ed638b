//! Ed25519 DID key resolver.

use super::verifier::Ed25519Verifier;
use warden_varsig::{Did, ResolveError, Resolver, Verifier};

/// Resolves `did:key` strings to Ed25519 verifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519KeyResolver;

impl Resolver for Ed25519KeyResolver {
    fn resolve(&self, did: &Did) -> Result<Box<dyn Verifier>, ResolveError> {
        if did.method() != "key" {
            return Err(ResolveError::unsupported(did));
        }
        let verifier: Ed25519Verifier = did
            .as_str()
            .parse()
            .map_err(|error| ResolveError::new(did, format!("invalid ed25519 did:key: {error}")))?;
        Ok(Box::new(verifier))
    }
}
