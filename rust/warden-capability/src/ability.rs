use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::CapabilityParseError;

/// A slash-delimited ability path such as `store/add`.
///
/// `*` is the top ability and `ns/*` the family below `ns`. A `*` is only
/// allowed as the final segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ability(String);

impl Ability {
    /// The top ability, `*`.
    pub const TOP: &'static str = "*";

    /// The top ability.
    #[must_use]
    pub fn top() -> Self {
        Self(Self::TOP.to_string())
    }

    /// The ability path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is `*` or ends in `/*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0 == Self::TOP || self.0.ends_with("/*")
    }

    /// Whether this ability includes `other`.
    ///
    /// ```
    /// use warden_capability::Ability;
    ///
    /// let family: Ability = "store/*".parse().unwrap();
    /// assert!(family.covers(&"store/add".parse().unwrap()));
    /// assert!(!family.covers(&"upload/add".parse().unwrap()));
    /// ```
    #[must_use]
    pub fn covers(&self, other: &Ability) -> bool {
        if self.0 == Self::TOP || self.0 == other.0 {
            return true;
        }
        match self.0.strip_suffix('*') {
            Some(prefix) => other.0.starts_with(prefix),
            None => false,
        }
    }
}

impl FromStr for Ability {
    type Err = CapabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::TOP {
            return Ok(Self::top());
        }
        let segments: Vec<&str> = s.split('/').collect();
        let last = segments.len() - 1;
        let valid = segments.len() > 1
            && segments.iter().enumerate().all(|(index, segment)| {
                !segment.is_empty()
                    && !segment.chars().any(char::is_whitespace)
                    && (!segment.contains('*') || (index == last && *segment == "*"))
            });
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(CapabilityParseError::InvalidAbility(s.to_string()))
        }
    }
}

impl TryFrom<String> for Ability {
    type Error = CapabilityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<&str> for Ability {
    type Error = CapabilityParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ability> for String {
    fn from(ability: Ability) -> Self {
        ability.0
    }
}

impl PartialEq<str> for Ability {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Ability {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ability(s: &str) -> Ability {
        s.parse().unwrap()
    }

    #[test]
    fn top_covers_everything() {
        assert!(Ability::top().covers(&ability("store/add")));
        assert!(Ability::top().covers(&ability("space/info")));
        assert!(Ability::top().covers(&Ability::top()));
    }

    #[test]
    fn families_cover_their_members_only() {
        assert!(ability("store/*").covers(&ability("store/add")));
        assert!(ability("store/*").covers(&ability("store/*")));
        assert!(!ability("store/*").covers(&ability("storefront/add")));
        assert!(!ability("store/add").covers(&ability("store/*")));
        assert!(!ability("store/add").covers(&Ability::top()));
    }

    #[test]
    fn exact_abilities_cover_themselves() {
        assert!(ability("store/add").covers(&ability("store/add")));
        assert!(!ability("store/add").covers(&ability("store/remove")));
    }

    #[test]
    fn it_rejects_malformed_abilities() {
        for bad in ["", "store", "store/", "/add", "st*re/add", "store/*/add", "store/a dd"] {
            assert!(bad.parse::<Ability>().is_err(), "{bad:?} should not parse");
        }
    }
}
