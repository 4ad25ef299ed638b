use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use warden_varsig::Did;

use crate::CapabilityParseError;

/// The URI a capability applies to.
///
/// Usually the DID of a space, agent or account. [`Resource::any`]
/// (`ucan:*`) matches every resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resource(String);

impl Resource {
    /// `ucan:*`
    pub const ANY: &'static str = "ucan:*";

    /// The resource that stands for any resource.
    #[must_use]
    pub fn any() -> Self {
        Self(Self::ANY.to_string())
    }

    /// The URI.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is `ucan:*`.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.0 == Self::ANY
    }

    /// The URI scheme (`did`, `mailto`, `ucan`, ...).
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.0.split_once(':').map(|(scheme, _)| scheme).unwrap_or_default()
    }

    /// Parses the resource as a DID, if it is one.
    #[must_use]
    pub fn as_did(&self) -> Option<Did> {
        self.0.parse().ok()
    }

    /// Whether a capability on this resource covers `other`.
    ///
    /// True when both are equal, when this is `ucan:*`, or when this ends
    /// in `*` and `other` starts with the part before it.
    #[must_use]
    pub fn contains(&self, other: &Resource) -> bool {
        if self.is_any() || self.0 == other.0 {
            return true;
        }
        match self.0.strip_suffix('*') {
            Some(prefix) => other.0.starts_with(prefix),
            None => false,
        }
    }
}

impl FromStr for Resource {
    type Err = CapabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        url::Url::parse(s).map_err(|error| CapabilityParseError::InvalidResource {
            uri: s.to_string(),
            reason: error.to_string(),
        })?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Resource {
    type Error = CapabilityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<&str> for Resource {
    type Error = CapabilityParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Did> for Resource {
    fn from(did: Did) -> Self {
        Self(did.into())
    }
}

impl From<&Did> for Resource {
    fn from(did: &Did) -> Self {
        Self(did.to_string())
    }
}

impl From<Resource> for String {
    fn from(resource: Resource) -> Self {
        resource.0
    }
}

impl PartialEq<Did> for Resource {
    fn eq(&self, other: &Did) -> bool {
        self.0 == other.as_str()
    }
}

impl PartialEq<str> for Resource {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
