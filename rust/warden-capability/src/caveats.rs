//! Building blocks for derivation rules.
//!
//! Each check compares one field of a requested (`child`) capability with
//! the delegated (`parent`) one and fails with a [`DerivationError`] naming
//! that field. A caveat the parent leaves unset imposes nothing.

use ipld_core::ipld::Ipld;

use crate::{Capability, DerivationError};

/// The `with` check every rule starts from.
///
/// Passes when the resources are equal, the parent is on `ucan:*`, or the
/// parent resource ends in `*` and the child resource has that prefix.
///
/// # Errors
///
/// Fails on the `with` field.
pub fn equal_with(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    if parent.with.contains(&child.with) {
        Ok(())
    } else {
        Err(DerivationError::new(
            "with",
            format!(
                "Can not derive {} with {} from {}",
                child.can, child.with, parent.with
            ),
        ))
    }
}

/// The child must carry the same value as the parent for `field`.
///
/// # Errors
///
/// Fails on `field` when the parent sets it and the child differs.
pub fn equal_caveat(child: &Capability, parent: &Capability, field: &str) -> Result<(), DerivationError> {
    match (child.caveat(field), parent.caveat(field)) {
        (_, None) => Ok(()),
        (Some(actual), Some(expected)) if actual == expected => Ok(()),
        (actual, Some(expected)) => Err(DerivationError::new(
            field,
            format!(
                "{} violates imposed {field} constraint {} != {}",
                child.can,
                describe(actual),
                describe(Some(expected)),
            ),
        )),
    }
}

/// Like [`equal_caveat`], but the parent's value must be a link.
///
/// # Errors
///
/// Fails on `field` when the links differ or the parent's value is not a
/// link.
pub fn equal_link(child: &Capability, parent: &Capability, field: &str) -> Result<(), DerivationError> {
    match parent.caveat(field) {
        None => Ok(()),
        Some(Ipld::Link(_)) => equal_caveat(child, parent, field),
        Some(other) => Err(DerivationError::new(
            field,
            format!("{field} is constrained to a non-link value {}", describe(Some(other))),
        )),
    }
}

/// The child's integer `field` may not exceed the parent's.
///
/// # Errors
///
/// Fails on `field` when the child is unset or larger while the parent is
/// set, or either value is not an integer.
pub fn bounded_size(child: &Capability, parent: &Capability, field: &str) -> Result<(), DerivationError> {
    let Some(limit) = parent.caveat(field) else {
        return Ok(());
    };
    let Ipld::Integer(limit) = limit else {
        return Err(DerivationError::new(field, format!("{field} limit is not an integer")));
    };
    match child.caveat(field) {
        Some(Ipld::Integer(size)) if size <= limit => Ok(()),
        Some(Ipld::Integer(size)) => Err(DerivationError::new(
            field,
            format!("{size} violates imposed {field} constraint {limit}"),
        )),
        Some(_) => Err(DerivationError::new(field, format!("{field} is not an integer"))),
        None => Err(DerivationError::new(
            field,
            format!("unbounded {field} violates imposed {field} constraint {limit}"),
        )),
    }
}

/// Every element of the child's `field` must appear in the parent's.
///
/// The field is a list, or a map whose values are the elements (as in
/// `access/delegate`, which keys linked delegations by CID).
///
/// # Errors
///
/// Fails on `field` when the parent constrains it and the child escapes
/// the constraint.
pub fn subset_of(child: &Capability, parent: &Capability, field: &str) -> Result<(), DerivationError> {
    let Some(allowed) = parent.caveat(field) else {
        return Ok(());
    };
    let Some(allowed) = elements(allowed) else {
        return Err(DerivationError::new(field, format!("{field} constraint is not a collection")));
    };
    let Some(requested) = child.caveat(field) else {
        return Err(DerivationError::new(
            field,
            format!("unrestricted {field} violates the imposed constraint"),
        ));
    };
    let Some(requested) = elements(requested) else {
        return Err(DerivationError::new(field, format!("{field} is not a collection")));
    };
    match requested.into_iter().find(|item| !allowed.contains(item)) {
        None => Ok(()),
        Some(item) => Err(DerivationError::new(
            field,
            format!("{} is not among the permitted {field}", describe(Some(item))),
        )),
    }
}

fn elements(value: &Ipld) -> Option<Vec<&Ipld>> {
    match value {
        Ipld::List(items) => Some(items.iter().collect()),
        Ipld::Map(entries) => Some(entries.values().collect()),
        _ => None,
    }
}

/// Checks that the URI in the child's `field` may be delegated from the
/// parent's.
///
/// Passes when the parent leaves `field` unset, when both are equal, when
/// the parent ends in `*` and the child has that prefix, or when both share
/// a scheme and the child's path lies below the parent's.
///
/// # Errors
///
/// Fails on `field` otherwise, including when the child drops a URI the
/// parent sets.
pub fn can_delegate_uri(child: &Capability, parent: &Capability, field: &str) -> Result<(), DerivationError> {
    let Some(parent_value) = parent.caveat(field) else {
        return Ok(());
    };
    let Ipld::String(parent_uri) = parent_value else {
        return Err(DerivationError::new(field, format!("{field} constraint is not a URI")));
    };
    let Some(child_value) = child.caveat(field) else {
        return Err(DerivationError::new(
            field,
            format!("{} has no {field}, while {parent_uri} is imposed", child.can),
        ));
    };
    let Ipld::String(child_uri) = child_value else {
        return Err(DerivationError::new(field, format!("{field} is not a URI")));
    };
    if uri_contains(parent_uri, child_uri) {
        Ok(())
    } else {
        Err(DerivationError::new(
            field,
            format!("{child_uri} violates imposed {field} constraint {parent_uri}"),
        ))
    }
}

fn uri_contains(parent: &str, child: &str) -> bool {
    if parent == child {
        return true;
    }
    if let Some(prefix) = parent.strip_suffix('*') {
        return child.starts_with(prefix);
    }
    match (url::Url::parse(parent), url::Url::parse(child)) {
        (Ok(parent), Ok(child)) => {
            let base = parent.path().trim_end_matches('/');
            parent.scheme() == child.scheme()
                && parent.host_str() == child.host_str()
                && !base.is_empty()
                && child
                    .path()
                    .strip_prefix(base)
                    .is_some_and(|rest| rest.starts_with('/'))
        }
        _ => false,
    }
}

fn describe(value: Option<&Ipld>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Ipld::String(s)) => s.clone(),
        Some(Ipld::Integer(n)) => n.to_string(),
        Some(Ipld::Link(cid)) => cid.to_string(),
        Some(other) => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cap(with: &str) -> Capability {
        Capability::parse("voucher/claim", with).unwrap()
    }

    #[test]
    fn equal_with_accepts_any_resource_from_ucan_star() {
        let parent = cap("ucan:*");
        assert!(equal_with(&cap("did:key:z6Mkalice"), &parent).is_ok());
    }

    #[test]
    fn equal_with_names_the_with_field() {
        let error = equal_with(&cap("did:key:z6Mkalice"), &cap("did:key:z6Mkbob")).unwrap_err();
        assert_eq!(error.field, "with");
        assert_eq!(
            error.to_string(),
            "Constraint violation on with: Can not derive voucher/claim with did:key:z6Mkalice from did:key:z6Mkbob"
        );
    }

    #[test]
    fn delegable_uri_accepts_equal_and_descendant_values() {
        let parent = cap("did:key:z6Mk").with_caveat("product", "https://example.com/plans");
        let same = cap("did:key:z6Mk").with_caveat("product", "https://example.com/plans");
        let below = cap("did:key:z6Mk").with_caveat("product", "https://example.com/plans/free");
        let sideways = cap("did:key:z6Mk").with_caveat("product", "https://example.com/plansfree");

        assert!(can_delegate_uri(&same, &parent, "product").is_ok());
        assert!(can_delegate_uri(&below, &parent, "product").is_ok());
        assert_eq!(
            can_delegate_uri(&sideways, &parent, "product").unwrap_err().field,
            "product"
        );
    }

    #[test]
    fn delegable_uri_accepts_wildcard_prefixes() {
        let parent = cap("did:key:z6Mk").with_caveat("identity", "mailto:*");
        let child = cap("did:key:z6Mk").with_caveat("identity", "mailto:alice@example.com");
        assert!(can_delegate_uri(&child, &parent, "identity").is_ok());
    }

    #[test]
    fn delegable_uri_rejects_dropping_an_imposed_value() {
        let parent = cap("did:key:z6Mk").with_caveat("identity", "mailto:alice@example.com");
        let error = can_delegate_uri(&cap("did:key:z6Mk"), &parent, "identity").unwrap_err();
        assert_eq!(error.field, "identity");
    }

    #[test]
    fn delegable_uri_is_unconstrained_without_a_parent_value() {
        let child = cap("did:key:z6Mk").with_caveat("identity", "mailto:alice@example.com");
        assert!(can_delegate_uri(&child, &cap("did:key:z6Mk"), "identity").is_ok());
    }

    #[test]
    fn bounded_size_compares_integers() {
        let parent = cap("did:key:z6Mk").with_caveat("size", 100);
        assert!(bounded_size(&cap("did:key:z6Mk").with_caveat("size", 100), &parent, "size").is_ok());
        assert!(bounded_size(&cap("did:key:z6Mk").with_caveat("size", 101), &parent, "size").is_err());
        assert!(bounded_size(&cap("did:key:z6Mk"), &parent, "size").is_err());
    }

    #[test]
    fn subset_of_requires_every_element() {
        let parent = cap("did:key:z6Mk").with_caveat(
            "att",
            Ipld::List(vec![Ipld::String("store/add".into()), Ipld::String("store/list".into())]),
        );
        let ok = cap("did:key:z6Mk").with_caveat("att", Ipld::List(vec![Ipld::String("store/add".into())]));
        let escalated = cap("did:key:z6Mk").with_caveat("att", Ipld::List(vec![Ipld::String("store/remove".into())]));

        assert!(subset_of(&ok, &parent, "att").is_ok());
        assert_eq!(subset_of(&escalated, &parent, "att").unwrap_err().field, "att");
    }

    #[test]
    fn subset_of_compares_map_values() {
        let link = |name: &str| Ipld::String(name.into());
        let parent = cap("did:key:z6Mk").with_caveat(
            "delegations",
            Ipld::Map([("a".to_owned(), link("a")), ("b".to_owned(), link("b"))].into()),
        );
        let ok = cap("did:key:z6Mk").with_caveat("delegations", Ipld::Map([("x".to_owned(), link("b"))].into()));
        let escalated =
            cap("did:key:z6Mk").with_caveat("delegations", Ipld::Map([("a".to_owned(), link("c"))].into()));

        assert!(subset_of(&ok, &parent, "delegations").is_ok());
        assert_eq!(subset_of(&escalated, &parent, "delegations").unwrap_err().field, "delegations");
    }

    #[test]
    fn equal_caveat_reports_both_values() {
        let parent = cap("did:key:z6Mk").with_caveat("iss", "did:mailto:example.com:alice");
        let child = cap("did:key:z6Mk").with_caveat("iss", "did:mailto:example.com:mallory");
        let error = equal_caveat(&child, &parent, "iss").unwrap_err();
        assert_eq!(
            error.reason,
            "voucher/claim violates imposed iss constraint did:mailto:example.com:mallory != did:mailto:example.com:alice"
        );
    }
}
