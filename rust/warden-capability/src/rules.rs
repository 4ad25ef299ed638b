use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use warden_common::ConditionalSync;

use crate::{Capability, DerivationError, caveats::equal_with};

/// Decides whether a requested capability may be derived from a delegated
/// one with the same (or a covering) ability.
///
/// Implemented for plain functions and closures of the right shape.
pub trait Rule: ConditionalSync {
    /// Checks `child` against `parent`.
    ///
    /// # Errors
    ///
    /// Returns the first failing field.
    fn derive(&self, child: &Capability, parent: &Capability) -> Result<(), DerivationError>;
}

impl<F> Rule for F
where
    F: Fn(&Capability, &Capability) -> Result<(), DerivationError> + ConditionalSync,
{
    fn derive(&self, child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
        self(child, parent)
    }
}

/// Registry of derivation rules keyed by ability.
///
/// Built once with [`DerivationRules::with_rule`] and shared read-only
/// afterwards. Abilities without a registered rule are checked with
/// [`equal_with`].
#[derive(Clone, Default)]
pub struct DerivationRules {
    rules: HashMap<String, Arc<dyn Rule>>,
}

impl DerivationRules {
    /// A registry with no custom rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `rule` for `ability`, replacing any previous rule.
    #[must_use]
    pub fn with_rule(mut self, ability: impl Into<String>, rule: impl Rule + 'static) -> Self {
        self.rules.insert(ability.into(), Arc::new(rule));
        self
    }

    /// Whether a custom rule exists for `ability`.
    #[must_use]
    pub fn has_rule(&self, ability: &str) -> bool {
        self.rules.contains_key(ability)
    }

    /// Checks that `child` is derivable from `parent`.
    ///
    /// The parent's ability must cover the child's; then the rule
    /// registered for the child's ability (or [`equal_with`]) decides.
    ///
    /// # Errors
    ///
    /// Returns a [`DerivationError`] naming the first failing field.
    pub fn derives(&self, child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
        if !parent.can.covers(&child.can) {
            return Err(DerivationError::new(
                "can",
                format!("{} is not covered by {}", child.can, parent.can),
            ));
        }
        match self.rules.get(child.can.as_str()) {
            Some(rule) => rule.derive(child, parent),
            None => equal_with(child, parent),
        }
    }
}

impl fmt::Debug for DerivationRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut abilities: Vec<&String> = self.rules.keys().collect();
        abilities.sort();
        f.debug_struct("DerivationRules")
            .field("abilities", &abilities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caveats::bounded_size;
    use pretty_assertions::assert_eq;

    fn capability(can: &str, with: &str) -> Capability {
        Capability::parse(can, with).unwrap()
    }

    #[test]
    fn default_rule_compares_resources() {
        let rules = DerivationRules::new();
        let parent = capability("store/*", "did:key:z6Mkspace");

        assert!(rules.derives(&capability("store/add", "did:key:z6Mkspace"), &parent).is_ok());
        assert_eq!(
            rules
                .derives(&capability("store/add", "did:key:z6Mkother"), &parent)
                .unwrap_err()
                .field,
            "with"
        );
    }

    #[test]
    fn ability_coverage_is_checked_first() {
        let rules = DerivationRules::new();
        let error = rules
            .derives(
                &capability("store/remove", "did:key:z6Mkother"),
                &capability("store/add", "did:key:z6Mkspace"),
            )
            .unwrap_err();
        assert_eq!(error.field, "can");
        assert_eq!(error.reason, "store/remove is not covered by store/add");
    }

    #[test]
    fn registered_rules_take_over() {
        let rules = DerivationRules::new().with_rule("store/add", |child: &Capability, parent: &Capability| {
            equal_with(child, parent)?;
            bounded_size(child, parent, "size")
        });
        assert!(rules.has_rule("store/add"));

        let parent = capability("store/add", "did:key:z6Mkspace").with_caveat("size", 10);
        let small = capability("store/add", "did:key:z6Mkspace").with_caveat("size", 5);
        let large = capability("store/add", "did:key:z6Mkspace").with_caveat("size", 50);

        assert!(rules.derives(&small, &parent).is_ok());
        assert_eq!(rules.derives(&large, &parent).unwrap_err().field, "size");
    }

    #[test]
    fn first_failing_field_wins() {
        let rules = DerivationRules::new().with_rule("store/add", |child: &Capability, parent: &Capability| {
            equal_with(child, parent)?;
            bounded_size(child, parent, "size")
        });
        let parent = capability("store/add", "did:key:z6Mkspace").with_caveat("size", 10);
        let both_wrong = capability("store/add", "did:key:z6Mkother").with_caveat("size", 50);
        assert_eq!(rules.derives(&both_wrong, &parent).unwrap_err().field, "with");
    }
}
