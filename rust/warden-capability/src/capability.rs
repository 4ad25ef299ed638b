use std::collections::BTreeMap;
use std::fmt;

use ipld_core::ipld::Ipld;
use serde::{Deserialize, Serialize};

use crate::{Ability, CapabilityParseError, Resource};

/// Open map of caveats restricting how a capability may be used.
pub type Caveats = BTreeMap<String, Ipld>;

/// Permission to perform `can` on `with`, subject to the caveats in `nb`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// What may be done.
    pub can: Ability,
    /// What it may be done to.
    pub with: Resource,
    /// Restrictions on the invocation arguments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nb: Caveats,
}

impl Capability {
    /// A capability without caveats.
    pub fn new(can: Ability, with: impl Into<Resource>) -> Self {
        Self {
            can,
            with: with.into(),
            nb: Caveats::new(),
        }
    }

    /// Parses `can` and `with` from strings.
    ///
    /// # Errors
    ///
    /// Fails when either part is malformed.
    pub fn parse(can: &str, with: &str) -> Result<Self, CapabilityParseError> {
        Ok(Self::new(can.parse()?, with.parse::<Resource>()?))
    }

    /// Adds a caveat.
    #[must_use]
    pub fn with_caveat(mut self, key: impl Into<String>, value: impl Into<Ipld>) -> Self {
        self.nb.insert(key.into(), value.into());
        self
    }

    /// Looks up a caveat.
    #[must_use]
    pub fn caveat(&self, key: &str) -> Option<&Ipld> {
        self.nb.get(key)
    }

    /// The same capability with `ucan:*` replaced by `resource`.
    ///
    /// A delegation on `ucan:*` grants whatever its issuer holds; once a
    /// chain is being resolved for a concrete resource the wildcard stands
    /// for that resource.
    #[must_use]
    pub fn narrowed_to(&self, resource: &Resource) -> Self {
        if self.with.is_any() {
            Self {
                with: resource.clone(),
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{can: {}, with: {}}}", self.can, self.with)
    }
}
