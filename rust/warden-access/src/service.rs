//! The access service.
//!
//! Handles the session protocol (`access/authorize`, `access/confirm`,
//! `access/claim`), hands delegations over to their audience
//! (`access/delegate`), records revocations (`ucan/revoke`) and tracks
//! which spaces are provisioned (`provider/add`, `space/info`).
//!
//! Authorization runs in three steps:
//!
//! 1. An agent invokes `access/authorize` naming a `did:mailto` account.
//!    The service signs a short-lived `access/confirm` delegation to
//!    itself and emails a link carrying it to the account holder.
//! 2. Following the link invokes that delegation. It works once. The
//!    service then issues the account delegation (signed by nobody, from
//!    the account to the agent) and an attestation vouching for it.
//! 3. The agent collects both with `access/claim`.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    sync::Arc,
};

use ipld_core::{cid::Cid, ipld::Ipld};
use tracing::{debug, info};
use warden_capability::{
    Capability, Resource,
    standard::abilities::{
        ACCESS_AUTHORIZE, ACCESS_CLAIM, ACCESS_CONFIRM, ACCESS_DELEGATE, PROVIDER_ADD,
        SPACE_INFO, UCAN_REVOKE,
    },
};
use warden_common::{Clock, SharedCell, time::SystemClock};
use warden_credentials::{Absentee, Ed25519Signer, WebDidResolver, default_resolver};
use warden_ucan::{
    Delegation, MemoryRevocations, Revocation, ValidityError, attest, is_absentee,
};
use warden_varsig::{Did, Principal};

use crate::{
    AuthorityError, Failure, Invocation, Receipt,
    config::ServiceConfig,
    mailto,
    notifier::{Email, MemoryNotifier, Notifier},
    session::{
        Arguments, Authorize, Confirm, Delegate, ProviderAdd, Revoke, SpaceDescription,
        encode_delegations,
    },
    storage::{
        DelegationsStorage, MemoryDelegations, MemoryProvisions, Provision, ProvisionsStorage,
        RevocationsStorage,
    },
    validator::{Authorized, Validator},
};

/// An access service instance.
pub struct AccessService {
    signer: Ed25519Signer,
    config: ServiceConfig,
    clock: Arc<dyn Clock>,
    validator: Validator,
    delegations: Arc<dyn DelegationsStorage>,
    revocations: Arc<dyn RevocationsStorage>,
    provisions: Arc<dyn ProvisionsStorage>,
    notifier: Arc<dyn Notifier>,
    confirmed: SharedCell<HashSet<Cid>>,
}

impl AccessService {
    /// A service signing as `signer`, with in-memory storage, a
    /// [`MemoryNotifier`] and the system clock.
    pub fn new(signer: Ed25519Signer) -> Self {
        let web = WebDidResolver::new().with(signer.did(), *signer.verifier());
        Self {
            validator: Validator::new(signer.did(), Arc::new(default_resolver(web))),
            signer,
            config: ServiceConfig::default(),
            clock: Arc::new(SystemClock),
            delegations: Arc::new(MemoryDelegations::new()),
            revocations: Arc::new(MemoryRevocations::new()),
            provisions: Arc::new(MemoryProvisions::new()),
            notifier: Arc::new(MemoryNotifier::new()),
            confirmed: SharedCell::default(),
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set the delegation storage
    pub fn with_delegations(mut self, delegations: Arc<dyn DelegationsStorage>) -> Self {
        self.delegations = delegations;
        self
    }

    /// Set the revocation storage
    pub fn with_revocations(mut self, revocations: Arc<dyn RevocationsStorage>) -> Self {
        self.revocations = revocations;
        self
    }

    /// Set the provision storage
    pub fn with_provisions(mut self, provisions: Arc<dyn ProvisionsStorage>) -> Self {
        self.provisions = provisions;
        self
    }

    /// The service's DID.
    pub fn did(&self) -> Did {
        self.signer.did()
    }

    /// The configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// A resolver that knows the service's key, for agents that need to
    /// check its attestations.
    pub fn web_keys(&self) -> WebDidResolver {
        WebDidResolver::new().with(self.did(), *self.signer.verifier())
    }

    fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Handles a delegation received over a transport.
    pub async fn receive(&self, delegation: Arc<Delegation>) -> Receipt {
        let ran = *delegation.cid();
        match Invocation::new(delegation) {
            Ok(invocation) => self.handle(invocation).await,
            Err(error) => Receipt::error(ran, error),
        }
    }

    /// Handles one invocation.
    pub async fn handle(&self, invocation: Invocation) -> Receipt {
        let ran = *invocation.cid();
        let ability = invocation.capability().can.clone();
        debug!(%ran, %ability, issuer = %invocation.issuer(), "handling invocation");

        let out = if ability == ACCESS_CONFIRM {
            self.confirm(&invocation).await
        } else {
            match self
                .validator
                .validate(&invocation, self.now(), self.revocations.as_ref())
                .await
            {
                Ok(authorized) => self.dispatch(&authorized).await,
                Err(failure) => Err(failure),
            }
        };

        if let Err(failure) = &out {
            debug!(%ran, %ability, %failure, "invocation failed");
        }
        Receipt { ran, out }
    }

    async fn dispatch(&self, authorized: &Authorized) -> Result<Ipld, Failure> {
        match authorized.capability().can.as_str() {
            ACCESS_AUTHORIZE => self.authorize(authorized).await,
            ACCESS_CLAIM => self.claim(authorized).await,
            ACCESS_DELEGATE => self.delegate(authorized).await,
            UCAN_REVOKE => self.revoke(authorized).await,
            SPACE_INFO => self.space_info(authorized).await,
            PROVIDER_ADD => self.provider_add(authorized).await,
            other => Err(Failure::new(
                "HandlerNotFound",
                format!("no handler for {other}"),
            )),
        }
    }

    async fn authorize(&self, authorized: &Authorized) -> Result<Ipld, Failure> {
        let Authorize { iss, att } = Authorize::from_capability(authorized.capability())?;
        let email = mailto::to_email(&iss)?;
        let expiration = self.now().saturating_add(self.config.confirmation_ttl);

        let request = Confirm {
            iss,
            aud: authorized.invocation.issuer().clone(),
            att,
        };
        let confirmation = Delegation::builder()
            .audience(self.did())
            .capability(request.capability(&self.did())?)
            .expiration(expiration)
            .nonce(authorized.invocation.cid().to_string())
            .sign(&self.signer)?;

        let url = self.config.confirmation_url(&confirmation.to_base64()?);
        self.notifier.send(Email { to: email, url }).await;

        Ok(Ipld::Map(BTreeMap::from([
            ("request".to_owned(), Ipld::Link(*confirmation.cid())),
            ("expiration".to_owned(), Ipld::Integer(expiration.into())),
        ])))
    }

    async fn confirm(&self, invocation: &Invocation) -> Result<Ipld, Failure> {
        let now = self.now();
        let cid = *invocation.cid();
        if self.confirmed.read().contains(&cid) {
            return Err(confirm_failure("AlreadyUsed"));
        }
        if let Err(ValidityError::Expired { .. }) = invocation.delegation().check_time(now) {
            return Err(confirm_failure("Expired"));
        }

        let authorized = self
            .validator
            .validate(invocation, now, self.revocations.as_ref())
            .await?;
        let Confirm { iss, aud, att } = Confirm::from_capability(authorized.capability())?;

        if !self.confirmed.write().insert(cid) {
            return Err(confirm_failure("AlreadyUsed"));
        }

        let expiration = self.config.session_expiration.map(|ttl| now.saturating_add(ttl));
        let held = self.delegations.find_by_audience(&iss).await?;
        let account = Arc::new(
            Delegation::builder()
                .audience(aud.clone())
                .capabilities(
                    att.into_iter()
                        .map(|request| Capability::new(request.can, Resource::any())),
                )
                .proofs(held)
                .expiration_opt(expiration)
                .sign(&Absentee::new(iss.clone()))?,
        );
        let attestation = Arc::new(attest(&self.signer, aud.clone(), account.cid(), expiration)?);

        self.delegations
            .put_many(vec![account.clone(), attestation.clone()])
            .await?;
        info!(account = %iss, agent = %aud, cid = %account.cid(), "authorization confirmed");

        Ok(encode_delegations([&account, &attestation])?)
    }

    async fn claim(&self, authorized: &Authorized) -> Result<Ipld, Failure> {
        let audience = resource_did(authorized)?;
        let delegations = self.delegations.find_by_audience(&audience).await?;
        debug!(%audience, count = delegations.len(), "claimed delegations");
        Ok(encode_delegations(&delegations)?)
    }

    async fn delegate(&self, authorized: &Authorized) -> Result<Ipld, Failure> {
        let Delegate { delegations } = Delegate::from_capability(authorized.capability())?;
        let attached = authorized.invocation.proofs();

        let mut found = Vec::with_capacity(delegations.len());
        for cid in delegations.values() {
            let delegation = attached
                .iter()
                .find(|delegation| delegation.cid() == cid)
                .ok_or_else(|| {
                    Failure::new(
                        "DelegationNotFound",
                        format!("delegation {cid} was not attached"),
                    )
                })?;
            found.push(delegation.clone());
        }
        self.delegations.put_many(found).await?;
        Ok(Ipld::Map(BTreeMap::new()))
    }

    async fn revoke(&self, authorized: &Authorized) -> Result<Ipld, Failure> {
        let Revoke { ucan } = Revoke::from_capability(authorized.capability())?;
        let authority = resource_did(authorized)?;

        let attached = authorized
            .invocation
            .proofs()
            .into_iter()
            .find(|delegation| *delegation.cid() == ucan);
        let target = match attached {
            Some(target) => target,
            None => self.delegations.get(&ucan).await?.ok_or_else(|| {
                Failure::new("UCANNotFound", format!("unable to find delegation {ucan}"))
            })?,
        };

        let entitled = target.issuer() == &authority
            || target
                .attachments()
                .iter()
                .any(|proof| proof.issuer() == &authority);
        if !entitled {
            return Err(AuthorityError::NotAuthorized {
                cid: ucan,
                principal: authority,
            }
            .into());
        }

        let now = self.now();
        self.revocations
            .put(Revocation {
                revoked: ucan,
                revoked_at: now,
                revoked_by: authorized.invocation.delegation().clone(),
            })
            .await?;
        info!(revoked = %ucan, by = %authority, "revocation recorded");

        Ok(Ipld::Map(BTreeMap::from([(
            "time".to_owned(),
            Ipld::Integer(now.into()),
        )])))
    }

    async fn space_info(&self, authorized: &Authorized) -> Result<Ipld, Failure> {
        let space = resource_did(authorized)?;
        let providers: Vec<Did> = self
            .provisions
            .get(&space)
            .await?
            .into_iter()
            .map(|provision| provision.provider)
            .collect();
        if providers.is_empty() {
            return Err(Failure::new("SpaceUnknown", format!("Space not found: {space}")));
        }
        ipld_core::serde::to_ipld(SpaceDescription {
            did: space,
            providers,
        })
        .map_err(|error| Failure::new("EncodeFailed", error.to_string()))
    }

    async fn provider_add(&self, authorized: &Authorized) -> Result<Ipld, Failure> {
        let customer = resource_did(authorized)?;
        if !is_absentee(&customer) {
            return Err(Failure::new(
                "InvalidAccount",
                format!("{customer} is not an account"),
            ));
        }
        let ProviderAdd { provider, consumer } =
            ProviderAdd::from_capability(authorized.capability())?;
        if provider != self.did() {
            return Err(Failure::new(
                "InvalidProvider",
                format!("{provider} is not a provider served here"),
            ));
        }

        let cause = *authorized.invocation.cid();
        self.provisions
            .put(Provision {
                consumer: consumer.clone(),
                provider,
                customer: customer.clone(),
                cause,
            })
            .await?;
        info!(space = %consumer, account = %customer, "space provisioned");
        Ok(Ipld::Map(BTreeMap::from([(
            "id".to_owned(),
            Ipld::Link(cause),
        )])))
    }
}

impl fmt::Debug for AccessService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessService")
            .field("did", &self.did())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn confirm_failure(reason: &str) -> Failure {
    Failure::new("AccessConfirmFailure", reason)
}

fn resource_did(authorized: &Authorized) -> Result<Did, Failure> {
    let with = &authorized.capability().with;
    with.as_did().ok_or_else(|| {
        Failure::new(
            "InvalidResource",
            format!("{with} is not a DID"),
        )
    })
}
