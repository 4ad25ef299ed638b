use std::collections::HashMap;

use parking_lot::RwLock;
use warden_varsig::{Did, ResolveError, Resolver, Verifier};

use crate::Ed25519Verifier;

/// Resolves `did:web` identities to the Ed25519 keys that sign for them.
///
/// The host registers each service it trusts; nothing is fetched over the
/// network.
#[derive(Debug, Default)]
pub struct WebDidResolver {
    keys: RwLock<HashMap<Did, Ed25519Verifier>>,
}

impl WebDidResolver {
    /// An empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `did` signs with `key`.
    pub fn insert(&self, did: Did, key: Ed25519Verifier) {
        self.keys.write().insert(did, key);
    }

    /// Builder form of [`WebDidResolver::insert`].
    #[must_use]
    pub fn with(self, did: Did, key: Ed25519Verifier) -> Self {
        self.insert(did, key);
        self
    }
}

impl Clone for WebDidResolver {
    fn clone(&self) -> Self {
        Self {
            keys: RwLock::new(self.keys.read().clone()),
        }
    }
}

impl Resolver for WebDidResolver {
    fn resolve(&self, did: &Did) -> Result<Box<dyn Verifier>, ResolveError> {
        if did.method() != "web" {
            return Err(ResolveError::unsupported(did));
        }
        let key = self
            .keys
            .read()
            .get(did)
            .copied()
            .ok_or_else(|| ResolveError::new(did, "no key registered for did:web principal"))?;
        Ok(Box::new(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ed25519Signer, default_resolver};
    use warden_varsig::{Principal, Signer, did};

    #[test]
    fn it_resolves_registered_services() -> testresult::TestResult {
        let service = Ed25519Signer::import(&[9; 32])?.with_did(did!("web:up.example.com"));
        let resolver = default_resolver(WebDidResolver::new().with(service.did(), *service.verifier()));

        let signature = service.sign(b"payload")?;
        resolver.resolve(&service.did())?.verify(b"payload", &signature)?;
        resolver
            .resolve(&service.verifier().did())?
            .verify(b"payload", &signature)?;
        Ok(())
    }

    #[test]
    fn it_fails_on_unknown_services() {
        let resolver = default_resolver(WebDidResolver::new());
        let error = resolver.resolve(&did!("web:unknown.example.com")).unwrap_err();
        assert_eq!(error.did, did!("web:unknown.example.com"));
    }
}
