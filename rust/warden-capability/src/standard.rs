//! The service ability catalogue and its derivation rules.

use crate::caveats::{bounded_size, can_delegate_uri, equal_caveat, equal_link, equal_with, subset_of};
use crate::{Capability, DerivationError, DerivationRules};

/// Ability names understood by the access and storage services.
pub mod abilities {
    #![allow(missing_docs)]

    pub const TOP: &str = "*";

    pub const STORE_ADD: &str = "store/add";
    pub const STORE_REMOVE: &str = "store/remove";
    pub const STORE_LIST: &str = "store/list";

    pub const UPLOAD_ADD: &str = "upload/add";
    pub const UPLOAD_REMOVE: &str = "upload/remove";
    pub const UPLOAD_LIST: &str = "upload/list";

    pub const SPACE_INFO: &str = "space/info";
    pub const SPACE_ALLOCATE: &str = "space/allocate";

    pub const PROVIDER_ADD: &str = "provider/add";

    pub const VOUCHER_CLAIM: &str = "voucher/claim";
    pub const VOUCHER_REDEEM: &str = "voucher/redeem";

    pub const ACCESS_AUTHORIZE: &str = "access/authorize";
    pub const ACCESS_CONFIRM: &str = "access/confirm";
    pub const ACCESS_CLAIM: &str = "access/claim";
    pub const ACCESS_DELEGATE: &str = "access/delegate";

    pub const UCAN_ATTEST: &str = "ucan/attest";
    pub const UCAN_REVOKE: &str = "ucan/revoke";
}

use abilities::*;

type Check = fn(&Capability, &Capability) -> Result<(), DerivationError>;

fn store_add(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    equal_link(child, parent, "link")?;
    bounded_size(child, parent, "size")
}

fn link_only(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    equal_link(child, parent, "link")
}

fn upload_add(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    equal_link(child, parent, "root")?;
    subset_of(child, parent, "shards")
}

fn upload_remove(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    equal_link(child, parent, "root")
}

fn space_allocate(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    bounded_size(child, parent, "size")
}

fn provider_add(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    equal_caveat(child, parent, "provider")?;
    equal_caveat(child, parent, "consumer")
}

fn voucher_claim(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    can_delegate_uri(child, parent, "identity")?;
    can_delegate_uri(child, parent, "product")?;
    can_delegate_uri(child, parent, "service")
}

fn voucher_redeem(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    can_delegate_uri(child, parent, "identity")?;
    can_delegate_uri(child, parent, "product")?;
    can_delegate_uri(child, parent, "account")
}

fn access_authorize(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    equal_caveat(child, parent, "iss")?;
    subset_of(child, parent, "att")
}

fn access_confirm(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    equal_caveat(child, parent, "iss")?;
    equal_caveat(child, parent, "aud")?;
    subset_of(child, parent, "att")
}

fn access_delegate(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    subset_of(child, parent, "delegations")
}

fn ucan_attest(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    equal_link(child, parent, "proof")
}

fn ucan_revoke(child: &Capability, parent: &Capability) -> Result<(), DerivationError> {
    equal_with(child, parent)?;
    equal_link(child, parent, "ucan")
}

const CATALOGUE: &[(&str, Check)] = &[
    (STORE_ADD, store_add),
    (STORE_REMOVE, link_only),
    (UPLOAD_ADD, upload_add),
    (UPLOAD_REMOVE, upload_remove),
    (SPACE_ALLOCATE, space_allocate),
    (PROVIDER_ADD, provider_add),
    (VOUCHER_CLAIM, voucher_claim),
    (VOUCHER_REDEEM, voucher_redeem),
    (ACCESS_AUTHORIZE, access_authorize),
    (ACCESS_CONFIRM, access_confirm),
    (ACCESS_DELEGATE, access_delegate),
    (UCAN_ATTEST, ucan_attest),
    (UCAN_REVOKE, ucan_revoke),
];

impl DerivationRules {
    /// Rules for the standard service abilities.
    ///
    /// `store/list`, `upload/list`, `space/info` and `access/claim` carry
    /// no caveats and use the default rule.
    #[must_use]
    pub fn standard() -> Self {
        CATALOGUE
            .iter()
            .fold(Self::new(), |rules, (ability, check)| rules.with_rule(*ability, *check))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ipld;
    use pretty_assertions::assert_eq;

    const SPACE: &str = "did:key:z6MkspaceExample";

    fn capability(can: &str) -> Capability {
        Capability::parse(can, SPACE).unwrap()
    }

    #[test]
    fn top_derives_any_standard_ability() {
        let rules = DerivationRules::standard();
        let top = capability(TOP);
        for (ability, _) in CATALOGUE {
            assert!(rules.derives(&capability(ability), &top).is_ok(), "{ability}");
        }
    }

    #[test]
    fn voucher_claim_narrows_identity() {
        let rules = DerivationRules::standard();
        let parent = capability(VOUCHER_CLAIM).with_caveat("identity", "mailto:*");
        let alice = capability(VOUCHER_CLAIM).with_caveat("identity", "mailto:alice@example.com");
        let web = capability(VOUCHER_CLAIM).with_caveat("identity", "https://example.com");

        assert!(rules.derives(&alice, &parent).is_ok());
        assert_eq!(rules.derives(&web, &parent).unwrap_err().field, "identity");
    }

    #[test]
    fn voucher_redeem_checks_account_after_product() {
        let rules = DerivationRules::standard();
        let parent = capability(VOUCHER_REDEEM)
            .with_caveat("product", "https://example.com/plans")
            .with_caveat("account", "did:mailto:example.com:alice");
        let child = capability(VOUCHER_REDEEM)
            .with_caveat("product", "https://example.com/plans/free")
            .with_caveat("account", "did:mailto:example.com:bob");

        assert_eq!(rules.derives(&child, &parent).unwrap_err().field, "account");
    }

    #[test]
    fn access_authorize_keeps_the_account() {
        let rules = DerivationRules::standard();
        let parent = capability(ACCESS_AUTHORIZE).with_caveat("iss", "did:mailto:example.com:alice");
        let child = capability(ACCESS_AUTHORIZE)
            .with_caveat("iss", "did:mailto:example.com:alice")
            .with_caveat("att", Ipld::List(vec![]));
        let other = capability(ACCESS_AUTHORIZE).with_caveat("iss", "did:mailto:example.com:mallory");

        assert!(rules.derives(&child, &parent).is_ok());
        assert_eq!(rules.derives(&other, &parent).unwrap_err().field, "iss");
    }

    #[test]
    fn access_delegate_is_limited_to_named_delegations() {
        let rules = DerivationRules::standard();
        let named = |cids: &[&str]| {
            Ipld::Map(
                cids.iter()
                    .map(|cid| ((*cid).to_owned(), Ipld::String((*cid).to_owned())))
                    .collect(),
            )
        };
        let parent = capability(ACCESS_DELEGATE).with_caveat("delegations", named(&["bafy1", "bafy2"]));
        let child = capability(ACCESS_DELEGATE).with_caveat("delegations", named(&["bafy2"]));
        let other = capability(ACCESS_DELEGATE).with_caveat("delegations", named(&["bafy3"]));

        assert!(rules.derives(&child, &parent).is_ok());
        assert_eq!(rules.derives(&other, &parent).unwrap_err().field, "delegations");
    }

    #[test]
    fn store_add_is_size_bounded() {
        let rules = DerivationRules::standard();
        let parent = capability(STORE_ADD).with_caveat("size", 1024);
        assert!(rules.derives(&capability(STORE_ADD).with_caveat("size", 512), &parent).is_ok());
        assert_eq!(
            rules
                .derives(&capability(STORE_ADD).with_caveat("size", 2048), &parent)
                .unwrap_err()
                .field,
            "size"
        );
    }

    #[test]
    fn uncatalogued_abilities_use_the_default() {
        let rules = DerivationRules::standard();
        assert!(!rules.has_rule(SPACE_INFO));
        assert!(rules.derives(&capability(SPACE_INFO), &capability("space/*")).is_ok());
    }
}
