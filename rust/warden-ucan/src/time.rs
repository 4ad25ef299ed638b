//! Validity windows.

use std::{
    fmt,
    ops::{Bound, RangeBounds},
};

/// The span of time in which a delegation (or a whole chain of them) may
/// be used.
///
/// `not_before` is inclusive, `expiration` is exclusive: a delegation with
/// `exp = t` is usable at `t - 1` and no longer at `t`. Missing bounds are
/// open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Earliest second the range is valid.
    pub not_before: Bound<u64>,

    /// First second the range is no longer valid.
    pub expiration: Bound<u64>,
}

impl TimeRange {
    /// An unbounded time range (no constraints).
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            not_before: Bound::Unbounded,
            expiration: Bound::Unbounded,
        }
    }

    /// Creates a time range from optional `not_before` and `expiration`.
    #[must_use]
    pub const fn new(not_before: Option<u64>, expiration: Option<u64>) -> Self {
        Self {
            not_before: match not_before {
                Some(t) => Bound::Included(t),
                None => Bound::Unbounded,
            },
            expiration: match expiration {
                Some(t) => Bound::Excluded(t),
                None => Bound::Unbounded,
            },
        }
    }

    /// Returns `true` if some second lies within the range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match (self.not_before, self.expiration) {
            (Bound::Included(nbf), Bound::Excluded(exp)) => nbf < exp,
            _ => true,
        }
    }

    /// Whether `now` has reached the expiration.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.expiration, Bound::Excluded(exp) if now >= exp)
    }

    /// Whether `now` is still before `not_before`.
    #[must_use]
    pub fn is_premature(&self, now: u64) -> bool {
        matches!(self.not_before, Bound::Included(nbf) if now < nbf)
    }

    /// Compute the intersection of two time ranges.
    ///
    /// The later lower bound and the earlier upper bound win.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let not_before = match (lower(self.not_before), lower(other.not_before)) {
            (Some(a), Some(b)) => Bound::Included(a.max(b)),
            (Some(t), None) | (None, Some(t)) => Bound::Included(t),
            (None, None) => Bound::Unbounded,
        };
        let expiration = match (upper(self.expiration), upper(other.expiration)) {
            (Some(a), Some(b)) => Bound::Excluded(a.min(b)),
            (Some(t), None) | (None, Some(t)) => Bound::Excluded(t),
            (None, None) => Bound::Unbounded,
        };
        Self {
            not_before,
            expiration,
        }
    }
}

fn lower(bound: Bound<u64>) -> Option<u64> {
    match bound {
        Bound::Included(t) => Some(t),
        Bound::Excluded(t) => Some(t.saturating_add(1)),
        Bound::Unbounded => None,
    }
}

fn upper(bound: Bound<u64>) -> Option<u64> {
    match bound {
        Bound::Excluded(t) => Some(t),
        Bound::Included(t) => Some(t.saturating_add(1)),
        Bound::Unbounded => None,
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl RangeBounds<u64> for TimeRange {
    fn start_bound(&self) -> Bound<&u64> {
        self.not_before.as_ref()
    }

    fn end_bound(&self) -> Bound<&u64> {
        self.expiration.as_ref()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(nbf) = lower(self.not_before) {
            write!(f, "{nbf}")?;
        }
        write!(f, "..")?;
        match upper(self.expiration) {
            Some(exp) => write!(f, "{exp}"),
            None => Ok(()),
        }
    }
}
