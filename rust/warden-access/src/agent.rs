//! The agent: a key, the delegations it holds, and the operations that
//! use them.

use std::{collections::HashMap, fmt, future::Future, iter, sync::Arc};

use indexmap::IndexMap;
use ipld_core::{cid::Cid, ipld::Ipld};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use warden_capability::{
    Ability, Capability, Caveats, DerivationRules, Resource,
    standard::abilities::{ACCESS_CLAIM, SPACE_INFO},
};
use warden_common::{Clock, SharedCell, time::SystemClock};
use warden_credentials::{
    Ed25519KeyResolver, Ed25519Signer, WebDidResolver, default_resolver,
};
use warden_ucan::{
    Attesters, AuthorizationFailure, Delegation, MemoryRevocations, ProofChain, ProofStore,
    ResolveOptions, Revocation, is_attestation_of, resolve, store::index_all,
};
use warden_varsig::{CompositeResolver, Did, Principal};

use crate::{
    AgentError, AuthorityError, Invocation, ProtocolError, Receipt,
    config::AgentConfig,
    connection::{Connection, TransportError},
    mailto,
    session::{
        AbilityRequest, Arguments, Authorize, Claim, Delegate, ProviderAdd, Revoke, SpaceDescription,
        SpaceInfo, decode_delegations,
    },
};

/// Fact key under which a space's self-delegation records its name.
pub const SPACE_FACT: &str = "space";

/// What kind of client an agent is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// A user's device.
    #[default]
    Device,
    /// An application acting for a user.
    App,
    /// A service.
    Service,
}

/// Descriptive metadata about an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMeta {
    /// Display name.
    pub name: String,
    /// Kind of client.
    #[serde(rename = "type")]
    pub kind: AgentKind,
}

impl Default for AgentMeta {
    fn default() -> Self {
        Self {
            name: "agent".to_owned(),
            kind: AgentKind::Device,
        }
    }
}

/// Local bookkeeping about a space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaceMeta {
    /// The name it was created with.
    pub name: String,
    /// Whether it was registered with a provider through this agent.
    pub registered: bool,
}

/// A space the agent knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    /// The space's DID.
    pub did: Did,
    /// Local metadata.
    pub meta: SpaceMeta,
}

/// Result of [`Agent::create_space`].
#[derive(Debug, Clone)]
pub struct SpaceCreated {
    /// The new space's DID.
    pub did: Did,
    /// The space's delegation of everything to the agent.
    pub proof: Arc<Delegation>,
}

/// Arguments to [`Agent::delegate`].
#[derive(Debug, Clone)]
pub struct DelegateOptions {
    /// Who receives the delegation.
    pub audience: Did,
    /// Abilities on the current space to delegate.
    pub abilities: Vec<Ability>,
    /// Remembered locally alongside the delegation.
    pub audience_meta: Option<AgentMeta>,
    /// Overrides [`AgentConfig::default_expiration`].
    pub expiration: Option<u64>,
}

impl DelegateOptions {
    /// Delegates `abilities` to `audience`.
    pub fn new(audience: Did, abilities: impl IntoIterator<Item = Ability>) -> Self {
        Self {
            audience,
            abilities: abilities.into_iter().collect(),
            audience_meta: None,
            expiration: None,
        }
    }

    /// Set the audience's metadata
    pub fn with_meta(mut self, meta: AgentMeta) -> Self {
        self.audience_meta = Some(meta);
        self
    }

    /// Set the expiration
    pub fn with_expiration(mut self, expiration: u64) -> Self {
        self.expiration = Some(expiration);
        self
    }
}

/// Arguments to [`Agent::revoke`].
#[derive(Debug, Clone, Default)]
pub struct RevokeOptions {
    /// Delegations proving authority over one the store does not hold.
    pub proofs: Vec<Arc<Delegation>>,
}

/// Arguments to [`Agent::invoke`].
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// The resource; defaults to the current space.
    pub with: Option<Resource>,
    /// Caveats.
    pub nb: Caveats,
    /// Who performs the invocation; defaults to the connected service.
    pub audience: Option<Did>,
    /// Proofs attached in addition to the resolved chain.
    pub proofs: Vec<Arc<Delegation>>,
    /// Overrides [`AgentConfig::invocation_ttl`].
    pub expiration: Option<u64>,
    /// Distinguishes otherwise identical invocations.
    pub nonce: Option<String>,
}

impl InvokeOptions {
    /// Defaults throughout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resource
    pub fn with(mut self, resource: impl Into<Resource>) -> Self {
        self.with = Some(resource.into());
        self
    }

    /// Set the caveats
    pub fn nb(mut self, nb: Caveats) -> Self {
        self.nb = nb;
        self
    }

    /// Set the audience
    pub fn audience(mut self, audience: Did) -> Self {
        self.audience = Some(audience);
        self
    }

    /// Attach extra proofs
    pub fn proofs(mut self, proofs: impl IntoIterator<Item = Arc<Delegation>>) -> Self {
        self.proofs.extend(proofs);
        self
    }

    /// Set the nonce
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// A principal holding delegations and acting on them through a
/// [`Connection`].
pub struct Agent<C: Connection> {
    signer: Ed25519Signer,
    meta: AgentMeta,
    connection: Arc<C>,
    config: AgentConfig,
    clock: Arc<dyn Clock>,
    rules: DerivationRules,
    resolver: CompositeResolver<Ed25519KeyResolver, WebDidResolver>,
    store: ProofStore,
    revocations: MemoryRevocations,
    spaces: SharedCell<IndexMap<Did, SpaceMeta>>,
    current: SharedCell<Option<Did>>,
    audience_meta: SharedCell<HashMap<Cid, AgentMeta>>,
}

impl<C: Connection> Agent<C> {
    /// An agent signing as `signer` and talking to `connection`.
    pub fn new(signer: Ed25519Signer, connection: Arc<C>) -> Self {
        Self {
            signer,
            meta: AgentMeta::default(),
            connection,
            config: AgentConfig::default(),
            clock: Arc::new(SystemClock),
            rules: DerivationRules::standard(),
            resolver: default_resolver(WebDidResolver::new()),
            store: ProofStore::new(),
            revocations: MemoryRevocations::new(),
            spaces: SharedCell::default(),
            current: SharedCell::default(),
            audience_meta: SharedCell::default(),
        }
    }

    /// Set the metadata
    pub fn with_meta(mut self, meta: AgentMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Set the configuration
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Trust the given `did:web` keys, typically those of the services
    /// that attest sessions.
    pub fn with_web_keys(mut self, keys: WebDidResolver) -> Self {
        self.resolver = default_resolver(keys);
        self
    }

    /// Replace the derivation rules
    pub fn with_rules(mut self, rules: DerivationRules) -> Self {
        self.rules = rules;
        self
    }

    /// The agent's DID.
    pub fn did(&self) -> Did {
        self.signer.did()
    }

    /// The agent's metadata.
    pub fn meta(&self) -> &AgentMeta {
        &self.meta
    }

    /// The connection invocations go through.
    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    /// The delegations the agent holds.
    pub fn store(&self) -> &ProofStore {
        &self.store
    }

    fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Generates a space, has it delegate everything to this agent, and
    /// keeps that delegation.
    pub fn create_space(&self, name: &str) -> Result<SpaceCreated, AgentError> {
        let space = Ed25519Signer::generate()?;
        let did = space.did();
        let proof = Arc::new(
            Delegation::builder()
                .audience(self.did())
                .capability(Capability::new(Ability::top(), &did))
                .fact(
                    SPACE_FACT,
                    Ipld::Map([("name".to_owned(), Ipld::String(name.to_owned()))].into()),
                )
                .sign(&space)?,
        );

        self.store.add(proof.clone());
        self.spaces.write().insert(
            did.clone(),
            SpaceMeta {
                name: name.to_owned(),
                registered: false,
            },
        );
        info!(space = %did, name, "space created");
        Ok(SpaceCreated { did, proof })
    }

    /// The chain authorizing this agent to exercise `capability`.
    ///
    /// Account sessions count only when attested by `audience`, or by the
    /// connected service when no audience is given.
    pub fn resolve(
        &self,
        capability: &Capability,
        audience: Option<&Did>,
    ) -> Result<ProofChain, AuthorizationFailure> {
        let attester = audience.unwrap_or_else(|| self.connection.id());
        let attesters = Attesters::only(attester.clone());
        let options = ResolveOptions::new(self.now(), &self.rules, &self.resolver)
            .revocations(&self.revocations)
            .attesters(attesters);
        resolve(capability, &self.store.snapshot(), &self.did(), &options)
    }

    /// Proofs for each of `capabilities`, deduplicated. Capabilities the
    /// agent cannot prove contribute nothing. Without `capabilities`,
    /// every stored delegation.
    pub fn proofs(&self, capabilities: Option<&[Capability]>, audience: Option<&Did>) -> Vec<Arc<Delegation>> {
        let Some(capabilities) = capabilities else {
            return self.store.snapshot();
        };
        let mut proofs: IndexMap<Cid, Arc<Delegation>> = IndexMap::new();
        for capability in capabilities {
            match self.resolve(capability, audience) {
                Ok(chain) => {
                    for proof in chain.proofs() {
                        proofs.entry(*proof.cid()).or_insert(proof);
                    }
                }
                Err(failure) => debug!(%capability, %failure, "no proofs"),
            }
        }
        proofs.into_values().collect()
    }

    /// Delegates abilities on the current space, carrying the chains that
    /// prove the agent holds them.
    pub fn delegate(&self, options: DelegateOptions) -> Result<Arc<Delegation>, AgentError> {
        let space = self.current_space().ok_or(AgentError::NoCurrentSpace)?;
        let audience_meta = options.audience_meta.clone();
        let delegation = self.delegate_on(&space, options)?;
        if let Some(meta) = audience_meta {
            self.audience_meta.write().insert(*delegation.cid(), meta);
        }
        Ok(delegation)
    }

    fn delegate_on(&self, space: &Did, options: DelegateOptions) -> Result<Arc<Delegation>, AgentError> {
        let mut capabilities = Vec::with_capacity(options.abilities.len());
        let mut proofs = Vec::new();
        for ability in options.abilities {
            let capability = Capability::new(ability.clone(), space);
            let chain = self
                .resolve(&capability, None)
                .map_err(|source| AgentError::CannotDelegate { ability, source })?;
            proofs.extend(chain.proofs());
            capabilities.push(capability);
        }

        let expiration = options
            .expiration
            .or_else(|| self.config.default_expiration.map(|ttl| self.now().saturating_add(ttl)));
        let delegation = Arc::new(
            Delegation::builder()
                .audience(options.audience)
                .capabilities(capabilities)
                .proofs(proofs)
                .expiration_opt(expiration)
                .sign(&self.signer)?,
        );

        self.store.add(delegation.clone());
        info!(cid = %delegation.cid(), audience = %delegation.audience(), "delegation issued");
        Ok(delegation)
    }

    /// Delegations this agent issued, with the audience metadata given
    /// when issuing them.
    pub fn delegations_with_meta(&self) -> Vec<(Arc<Delegation>, Option<AgentMeta>)> {
        let me = self.did();
        let meta = self.audience_meta.read();
        self.store
            .snapshot()
            .into_iter()
            .filter(|delegation| delegation.issuer() == &me)
            .map(|delegation| {
                let audience = meta.get(delegation.cid()).cloned();
                (delegation, audience)
            })
            .collect()
    }

    /// Validates a delegation of a space to this agent and keeps it.
    pub fn import_space_from_delegation(
        &self,
        delegation: impl Into<Arc<Delegation>>,
    ) -> Result<Space, AgentError> {
        let delegation = delegation.into();
        delegation.validate(self.now(), &self.resolver)?;

        let me = self.did();
        if delegation.audience() != &me {
            return Err(ProtocolError::WrongAudience {
                cid: *delegation.cid(),
                expected: me,
                actual: delegation.audience().clone(),
            }
            .into());
        }
        let did = delegation
            .capabilities()
            .iter()
            .find_map(|capability| capability.with.as_did())
            .ok_or(ProtocolError::NotASpace(*delegation.cid()))?;

        let name = space_name(&did, &delegation).unwrap_or_default();
        self.store.add(delegation.clone());
        let meta = self
            .spaces
            .write()
            .entry(did.clone())
            .or_insert(SpaceMeta {
                name,
                registered: false,
            })
            .clone();
        info!(space = %did, cid = %delegation.cid(), "space imported");
        Ok(Space { did, meta })
    }

    /// Keeps a delegation and everything attached to it.
    pub fn add_proof(&self, delegation: impl Into<Arc<Delegation>>) -> Cid {
        let delegation = delegation.into();
        self.remember_spaces(iter::once(&delegation));
        self.store.add(delegation)
    }

    /// Keeps several delegations at once.
    pub fn add_proofs(&self, delegations: Vec<Arc<Delegation>>) -> Vec<Cid> {
        self.remember_spaces(&delegations);
        self.store.add_all(delegations)
    }

    /// Forgets a delegation.
    pub fn remove_proof(&self, cid: &Cid) -> Option<Arc<Delegation>> {
        self.store.remove(cid)
    }

    /// Revokes a delegation with the connected service, then stops
    /// using it.
    pub async fn revoke(&self, cid: &Cid, options: RevokeOptions) -> Result<(), AgentError> {
        let supplied = index_all(&options.proofs);
        let target = self
            .store
            .get(cid)
            .or_else(|| supplied.get(cid).cloned())
            .ok_or(AuthorityError::UnknownDelegation(*cid))?;

        let capability = Revoke { ucan: *cid }.capability(&self.did())?;
        let proofs = iter::once(target).chain(options.proofs);
        let invocation = self.invocation(capability, InvokeOptions::new().proofs(proofs))?;
        self.execute_one(invocation.clone()).await?.out?;

        self.revocations.record(Revocation {
            revoked: *cid,
            revoked_at: self.now(),
            revoked_by: invocation.delegation().clone(),
        });
        self.store.remove(cid);
        info!(%cid, "delegation revoked");
        Ok(())
    }

    /// Builds and signs an invocation of `ability` with the proofs that
    /// authorize it.
    pub fn invoke(&self, ability: Ability, mut options: InvokeOptions) -> Result<Invocation, AgentError> {
        let with = match options.with.take() {
            Some(with) => with,
            None => self.current_space().ok_or(AgentError::NoCurrentSpace)?.into(),
        };
        let capability = Capability {
            can: ability,
            with,
            nb: std::mem::take(&mut options.nb),
        };
        self.invocation(capability, options)
    }

    fn invocation(&self, capability: Capability, options: InvokeOptions) -> Result<Invocation, AgentError> {
        let audience = options
            .audience
            .unwrap_or_else(|| self.connection.id().clone());
        let mut proofs = options.proofs;
        if capability.with != self.did() {
            match self.resolve(&capability, Some(&audience)) {
                Ok(chain) => proofs.extend(chain.proofs()),
                Err(failure) if proofs.is_empty() => return Err(failure.into()),
                Err(failure) => debug!(%capability, %failure, "relying on supplied proofs"),
            }
        }
        let expiration = options
            .expiration
            .unwrap_or_else(|| self.now().saturating_add(self.config.invocation_ttl));
        Ok(Invocation::issue(
            &self.signer,
            audience,
            capability,
            proofs,
            Some(expiration),
            options.nonce,
        )?)
    }

    /// Submits a batch; receipts are in the order of `invocations`.
    pub async fn execute(&self, invocations: &[Invocation]) -> Result<Vec<Receipt>, AgentError> {
        let receipts = self.connection.execute(invocations.to_vec()).await?;
        if receipts.len() != invocations.len() {
            return Err(TransportError::ReceiptCount {
                expected: invocations.len(),
                actual: receipts.len(),
            }
            .into());
        }
        Ok(receipts)
    }

    /// [`Self::invoke`] then [`Self::execute`].
    pub async fn invoke_and_execute(&self, ability: Ability, options: InvokeOptions) -> Result<Receipt, AgentError> {
        let invocation = self.invoke(ability, options)?;
        self.execute_one(invocation).await
    }

    async fn execute_one(&self, invocation: Invocation) -> Result<Receipt, AgentError> {
        let mut receipts = self.execute(std::slice::from_ref(&invocation)).await?;
        receipts.pop().ok_or_else(|| {
            TransportError::ReceiptCount {
                expected: 1,
                actual: 0,
            }
            .into()
        })
    }

    async fn call<A: Arguments>(
        &self,
        arguments: &A,
        with: impl Into<Resource>,
        options: InvokeOptions,
    ) -> Result<Ipld, AgentError> {
        let capability = arguments.capability(with)?;
        let invocation = self.invocation(capability, options)?;
        Ok(self.execute_one(invocation).await?.out?)
    }

    /// Makes `did` the default resource for invocations and delegations.
    ///
    /// The agent must be able to prove at least one capability on it.
    pub fn set_current_space(&self, did: &Did) -> Result<(), AgentError> {
        let me = self.did();
        let held: Vec<Capability> = self
            .store
            .snapshot()
            .iter()
            .filter(|delegation| delegation.audience() == &me)
            .flat_map(|delegation| delegation.capabilities().to_vec())
            .filter(|capability| capability.with == *did)
            .chain(iter::once(Capability::new(Ability::top(), did)))
            .collect();
        if !held.iter().any(|capability| self.resolve(capability, None).is_ok()) {
            return Err(AgentError::NoProofs(did.clone()));
        }
        self.current.replace(Some(did.clone()));
        Ok(())
    }

    /// The current space.
    pub fn current_space(&self) -> Option<Did> {
        self.current.get()
    }

    /// The current space and what the agent knows about it.
    pub fn current_space_with_meta(&self) -> Option<Space> {
        let did = self.current_space()?;
        let meta = self.spaces.read().get(&did).cloned().unwrap_or_default();
        Some(Space { did, meta })
    }

    /// Spaces the agent knows about, in the order it learned of them.
    pub fn spaces(&self) -> Vec<Space> {
        self.spaces
            .read()
            .iter()
            .map(|(did, meta)| Space {
                did: did.clone(),
                meta: meta.clone(),
            })
            .collect()
    }

    /// Asks the service about a space, the current one by default.
    pub async fn get_space_info(&self, space: Option<&Did>) -> Result<SpaceDescription, AgentError> {
        let space = match space {
            Some(space) => space.clone(),
            None => self.current_space().ok_or(AgentError::NoCurrentSpace)?,
        };
        let result = self.call(&SpaceInfo {}, &space, InvokeOptions::new()).await?;
        ipld_core::serde::from_ipld(result).map_err(|error| {
            ProtocolError::UnexpectedResult {
                ability: SPACE_INFO.to_owned(),
                reason: error.to_string(),
            }
            .into()
        })
    }

    /// Provisions `space` with `provider` on behalf of `account`.
    pub async fn add_provider(&self, space: &Did, account: &Did, provider: &Did) -> Result<(), AgentError> {
        let arguments = ProviderAdd {
            provider: provider.clone(),
            consumer: space.clone(),
        };
        self.call(&arguments, account, InvokeOptions::new()).await?;
        Ok(())
    }

    /// Provisions the current space through the account behind `email`
    /// and hands the account full access to it, so that other devices
    /// logged into the account can use it.
    ///
    /// The agent must already hold a session for the account; see
    /// [`Self::authorize`].
    pub async fn register_space(&self, email: &str, provider: Option<&Did>) -> Result<(), AgentError> {
        let space = self.current_space().ok_or(AgentError::NoCurrentSpace)?;
        let account = mailto::from_email(email)?;
        let provider = provider.cloned().unwrap_or_else(|| self.connection.id().clone());
        self.add_provider(&space, &account, &provider).await?;

        let recovery = self.delegate_on(&space, DelegateOptions::new(account, [Ability::top()]))?;
        self.call(
            &Delegate::new([&*recovery]),
            &space,
            InvokeOptions::new().proofs([recovery.clone()]),
        )
        .await?;

        self.spaces.write().entry(space.clone()).or_default().registered = true;
        info!(%space, "space registered");
        Ok(())
    }

    /// Asks the service to email a confirmation link for linking this
    /// agent to the account behind `email`.
    pub async fn request_authorization(&self, email: &str, abilities: &[Ability]) -> Result<(), AgentError> {
        let arguments = Authorize {
            iss: mailto::from_email(email)?,
            att: abilities.iter().cloned().map(AbilityRequest::from).collect(),
        };
        self.call(&arguments, &self.did(), InvokeOptions::new()).await?;
        Ok(())
    }

    /// Fetches and keeps every delegation the service holds for this
    /// agent. Safe to repeat.
    pub async fn claim_delegations(&self) -> Result<Vec<Arc<Delegation>>, AgentError> {
        let delegations = self.fetch_delegations().await?;
        self.add_proofs(delegations.clone());
        Ok(delegations)
    }

    async fn fetch_delegations(&self) -> Result<Vec<Arc<Delegation>>, AgentError> {
        let result = self.call(&Claim {}, &self.did(), InvokeOptions::new()).await?;
        Ok(decode_delegations(ACCESS_CLAIM, &result)?)
    }

    /// Requests authorization and polls until the confirmed session shows
    /// up or `cancel` fires. Nothing is stored unless the session arrives.
    pub async fn authorize(
        &self,
        email: &str,
        abilities: &[Ability],
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<Delegation>>, AgentError> {
        let account = mailto::from_email(email)?;
        cancellable(cancel, self.request_authorization(email, abilities)).await?;

        let interval = self.config.poll_interval();
        loop {
            let claimed = cancellable(cancel, async {
                tokio::time::sleep(interval).await;
                self.fetch_delegations().await
            })
            .await?;
            trace!(%account, count = claimed.len(), "polled for session");

            if has_session(&account, &self.did(), &claimed) {
                self.add_proofs(claimed.clone());
                info!(%account, "session established");
                return Ok(claimed);
            }
        }
    }

    fn remember_spaces<'a>(&self, delegations: impl IntoIterator<Item = &'a Arc<Delegation>>) {
        let mut spaces = self.spaces.write();
        for delegation in delegations {
            for known in iter::once(delegation.clone()).chain(delegation.attachments()) {
                let issuer = known.issuer();
                let is_root = known.capabilities().iter().any(|c| c.with == *issuer);
                if let (true, Some(name)) = (is_root, space_name(issuer, &known)) {
                    spaces.entry(issuer.clone()).or_insert(SpaceMeta {
                        name,
                        registered: false,
                    });
                }
            }
        }
    }
}

impl<C: Connection> fmt::Debug for Agent<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("did", &self.did())
            .field("meta", &self.meta)
            .field("proofs", &self.store.len())
            .field("current", &self.current_space())
            .finish_non_exhaustive()
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = Result<T, AgentError>>,
) -> Result<T, AgentError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AgentError::Cancelled),
        result = operation => result,
    }
}

/// Whether `delegations` contain an account delegation to `agent` together
/// with an attestation for it.
fn has_session(account: &Did, agent: &Did, delegations: &[Arc<Delegation>]) -> bool {
    delegations
        .iter()
        .filter(|d| d.issuer() == account && d.audience() == agent)
        .any(|d| delegations.iter().any(|a| is_attestation_of(a, d.cid())))
}

/// The name recorded by `space` in its own delegation, searching
/// `delegation` and its attachments.
fn space_name(space: &Did, delegation: &Arc<Delegation>) -> Option<String> {
    iter::once(delegation.clone())
        .chain(delegation.attachments())
        .filter(|d| d.issuer() == space)
        .find_map(|d| match d.facts().get(SPACE_FACT) {
            Some(Ipld::Map(fact)) => match fact.get("name") {
                Some(Ipld::String(name)) => Some(name.clone()),
                _ => None,
            },
            _ => None,
        })
}
