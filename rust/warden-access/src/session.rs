//! Caveats and payloads of the access protocol.
//!
//! Each ability the access service handles has a caveat struct that
//! round-trips through a capability's `nb` map:
//!
//! | Ability | Caveats | `with` |
//! |---------|---------|--------|
//! | `access/authorize` | [`Authorize`] | the requesting agent |
//! | `access/confirm` | [`Confirm`] | the service |
//! | `access/claim` | [`Claim`] | the claiming agent |
//! | `access/delegate` | [`Delegate`] | a space |
//! | `ucan/revoke` | [`Revoke`] | the revoking principal |
//! | `space/info` | [`SpaceInfo`] | a space |
//! | `provider/add` | [`ProviderAdd`] | an account |
//!
//! Delegations travel in results as a map from CID to archive bytes; see
//! [`encode_delegations`] and [`decode_delegations`].

use std::{collections::BTreeMap, sync::Arc};

use ipld_core::{cid::Cid, ipld::Ipld};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;
use warden_capability::{
    Ability, Capability, Resource,
    standard::abilities::{
        ACCESS_AUTHORIZE, ACCESS_CLAIM, ACCESS_CONFIRM, ACCESS_DELEGATE, PROVIDER_ADD,
        SPACE_INFO, UCAN_REVOKE,
    },
};
use warden_ucan::{CodecError, Delegation};
use warden_varsig::Did;

use crate::ProtocolError;

/// Typed `nb` caveats for one ability.
pub trait Arguments: Serialize + DeserializeOwned {
    /// The ability these caveats belong to.
    const ABILITY: &'static str;

    /// A capability to exercise [`Self::ABILITY`] on `with`.
    fn capability(&self, with: impl Into<Resource>) -> Result<Capability, ProtocolError> {
        let invalid = |reason: String| ProtocolError::InvalidCaveats {
            ability: Self::ABILITY.to_owned(),
            reason,
        };
        let can: Ability = Self::ABILITY.parse().map_err(|e| invalid(format!("{e}")))?;
        let nb = match ipld_core::serde::to_ipld(self).map_err(|e| invalid(e.to_string()))? {
            Ipld::Map(nb) => nb,
            other => return Err(invalid(format!("expected a map, found {other:?}"))),
        };
        Ok(Capability {
            can,
            with: with.into(),
            nb,
        })
    }

    /// Reads the caveats back out of `capability`.
    fn from_capability(capability: &Capability) -> Result<Self, ProtocolError> {
        ipld_core::serde::from_ipld(Ipld::Map(capability.nb.clone())).map_err(|e| {
            ProtocolError::InvalidCaveats {
                ability: Self::ABILITY.to_owned(),
                reason: e.to_string(),
            }
        })
    }
}

/// One requested ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityRequest {
    /// The ability.
    pub can: Ability,
}

impl From<Ability> for AbilityRequest {
    fn from(can: Ability) -> Self {
        Self { can }
    }
}

/// Asks the service to link the invoking agent to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorize {
    /// The `did:mailto` account.
    pub iss: Did,
    /// Abilities the agent wants from the account.
    pub att: Vec<AbilityRequest>,
}

impl Arguments for Authorize {
    const ABILITY: &'static str = ACCESS_AUTHORIZE;
}

/// The service's single-use permission to complete an authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirm {
    /// The `did:mailto` account.
    pub iss: Did,
    /// The agent being authorized.
    pub aud: Did,
    /// Abilities being granted.
    pub att: Vec<AbilityRequest>,
}

impl Arguments for Confirm {
    const ABILITY: &'static str = ACCESS_CONFIRM;
}

/// Fetches delegations addressed to the invoker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {}

impl Arguments for Claim {
    const ABILITY: &'static str = ACCESS_CLAIM;
}

/// Hands delegations to the service for later claiming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    /// The delegations, which must be attached to the invocation.
    pub delegations: BTreeMap<String, Cid>,
}

impl Delegate {
    /// Caveats naming `delegations`.
    pub fn new<'a>(delegations: impl IntoIterator<Item = &'a Delegation>) -> Self {
        Self {
            delegations: delegations
                .into_iter()
                .map(|delegation| (delegation.cid().to_string(), *delegation.cid()))
                .collect(),
        }
    }
}

impl Arguments for Delegate {
    const ABILITY: &'static str = ACCESS_DELEGATE;
}

/// Revokes a delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revoke {
    /// The delegation to revoke.
    pub ucan: Cid,
}

impl Arguments for Revoke {
    const ABILITY: &'static str = UCAN_REVOKE;
}

/// Asks for a space's provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceInfo {}

impl Arguments for SpaceInfo {
    const ABILITY: &'static str = SPACE_INFO;
}

/// Provisions a space with a provider on behalf of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAdd {
    /// The provider.
    pub provider: Did,
    /// The space.
    pub consumer: Did,
}

impl Arguments for ProviderAdd {
    const ABILITY: &'static str = PROVIDER_ADD;
}

/// What `space/info` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceDescription {
    /// The space.
    pub did: Did,
    /// Providers it is provisioned with.
    pub providers: Vec<Did>,
}

/// Packs delegations into a result: `{"delegations": {cid: archive}}`.
pub fn encode_delegations<'a>(
    delegations: impl IntoIterator<Item = &'a Arc<Delegation>>,
) -> Result<Ipld, CodecError> {
    let mut map = BTreeMap::new();
    for delegation in delegations {
        map.insert(delegation.cid().to_string(), Ipld::Bytes(delegation.archive()?));
    }
    Ok(Ipld::Map(BTreeMap::from([(
        "delegations".to_owned(),
        Ipld::Map(map),
    )])))
}

/// Unpacks a result produced by [`encode_delegations`].
pub fn decode_delegations(ability: &str, result: &Ipld) -> Result<Vec<Arc<Delegation>>, ProtocolError> {
    let unexpected = |reason: String| ProtocolError::UnexpectedResult {
        ability: ability.to_owned(),
        reason,
    };
    let Ipld::Map(result) = result else {
        return Err(unexpected("expected a map".into()));
    };
    let Some(Ipld::Map(entries)) = result.get("delegations") else {
        return Err(unexpected("missing delegations".into()));
    };
    entries
        .values()
        .map(|entry| match entry {
            Ipld::Bytes(bytes) => Delegation::extract(bytes)
                .map(Arc::new)
                .map_err(|e| unexpected(e.to_string())),
            _ => Err(unexpected("delegation is not bytes".into())),
        })
        .collect()
}

/// The confirmation delegation embedded in an emailed link.
pub fn confirmation_from_url(url: &Url) -> Result<Delegation, ProtocolError> {
    let (_, ucan) = url
        .query_pairs()
        .find(|(key, _)| key == "ucan")
        .ok_or_else(|| ProtocolError::InvalidConfirmation("missing ucan parameter".into()))?;
    Delegation::from_base64(&ucan).map_err(|e| ProtocolError::InvalidConfirmation(e.to_string()))
}
