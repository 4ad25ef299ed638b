/// A capability could not be derived from a delegated one.
///
/// Names the first field that failed the check, in the order the rule
/// checks them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Constraint violation on {field}: {reason}")]
pub struct DerivationError {
    /// `can`, `with`, or the name of an `nb` caveat.
    pub field: String,
    /// Human readable explanation.
    pub reason: String,
}

impl DerivationError {
    /// Creates an error for `field`.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors parsing abilities, resources and capabilities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityParseError {
    /// The ability string is not a valid ability path.
    #[error("invalid ability {0:?}")]
    InvalidAbility(String),

    /// The resource is not a URI.
    #[error("invalid resource {uri:?}: {reason}")]
    InvalidResource {
        /// The offending input.
        uri: String,
        /// Why it failed to parse.
        reason: String,
    },
}
