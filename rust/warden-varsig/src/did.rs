//! DID (Decentralized Identifier) types.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A [Decentralized Identifier][did-core] string.
///
/// Wraps a raw DID string like `did:key:z6Mk...`, `did:web:example.com` or
/// `did:mailto:example.com:alice`. The string is validated to have the
/// `did:method:identifier` shape but is otherwise opaque.
///
/// [did-core]: https://www.w3.org/TR/did-core/
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Did(String);

impl Did {
    /// Get the raw DID string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the DID method name (`"key"`, `"web"`, `"mailto"`, ...).
    #[must_use]
    pub fn method(&self) -> &str {
        self.0["did:".len()..].split(':').next().unwrap_or_default()
    }

    /// Returns everything after `did:method:`.
    #[must_use]
    pub fn identifier(&self) -> &str {
        let rest = &self.0["did:".len()..];
        rest.split_once(':').map(|(_, id)| id).unwrap_or_default()
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&Did> for Did {
    fn from(did: &Did) -> Self {
        did.clone()
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl PartialEq<str> for Did {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Did {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error when parsing a DID string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid DID: {0}")]
pub struct DidParseError(pub String);

impl FromStr for Did {
    type Err = DidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix("did:") else {
            return Err(DidParseError(format!("expected did: prefix, got: {s}")));
        };
        match rest.split_once(':') {
            Some((method, id)) if !method.is_empty() && !id.is_empty() => Ok(Did(s.to_string())),
            _ => Err(DidParseError(format!(
                "expected did:method:identifier, got: {s}"
            ))),
        }
    }
}

impl TryFrom<String> for Did {
    type Error = DidParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<&str> for Did {
    type Error = DidParseError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for Did {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Creates a [`Did`] from a string literal, validated at compile time.
///
/// The `"did:"` prefix is added automatically, pass `"method:identifier"`.
///
/// ```
/// use warden_varsig::did;
///
/// let w = did!("web:up.example.com");
/// assert_eq!(w.method(), "web");
/// ```
///
/// Invalid literals fail at compile time:
/// ```compile_fail
/// use warden_varsig::did;
/// let _bad = did!("nocolon");
/// ```
#[macro_export]
macro_rules! did {
    ($s:literal) => {{
        const _: () = {
            let b = $s.as_bytes();
            let mut i = 0;
            let mut found_colon = false;
            while i < b.len() {
                if b[i] == b':' {
                    assert!(i > 0, "DID method must not be empty");
                    assert!(i + 1 < b.len(), "DID identifier must not be empty");
                    found_colon = true;
                    break;
                }
                i += 1;
            }
            assert!(found_colon, "expected \"method:identifier\"");
        };
        #[allow(clippy::expect_used)]
        format!("did:{}", $s)
            .parse::<$crate::did::Did>()
            // validated by the const block above
            .expect("valid DID literal")
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_method_and_identifier() {
        let did: Did = "did:mailto:example.com:alice".parse().unwrap();
        assert_eq!(did.method(), "mailto");
        assert_eq!(did.identifier(), "example.com:alice");
    }

    #[test]
    fn it_rejects_malformed_dids() {
        assert!("key:abc".parse::<Did>().is_err());
        assert!("did:key".parse::<Did>().is_err());
        assert!("did::abc".parse::<Did>().is_err());
        assert!("did:key:".parse::<Did>().is_err());
    }

    #[test]
    fn it_builds_from_literal() {
        let did = did!("web:example.com");
        assert_eq!(did.as_str(), "did:web:example.com");
    }

    #[test]
    fn it_round_trips_through_cbor() {
        let did = did!("key:z6MkexampleKey");
        let bytes = serde_ipld_dagcbor::to_vec(&did).unwrap();
        let back: Did = serde_ipld_dagcbor::from_slice(&bytes).unwrap();
        assert_eq!(back, did);
    }
}
