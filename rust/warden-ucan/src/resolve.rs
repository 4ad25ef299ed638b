//! Proof chain resolution.
//!
//! Given a requested capability and a set of delegations, find a chain
//! that starts at a delegation addressed to the invoker and ends at one
//! issued by the resource itself, where every link is valid and every
//! capability is derivable from the one above it.

use std::sync::Arc;

use ipld_core::cid::Cid;
use tracing::debug;
use warden_capability::{Capability, DerivationRules};
use warden_varsig::{Did, Resolver};

use crate::{
    AuthorizationFailure, Delegation, LinkFailure, ValidityError,
    attestation::{Attesters, is_attestation_of},
    revocation::{NoRevocations, Revocations},
    store::{ProofIndex, index_all},
    time::TimeRange,
};

/// Everything resolution needs besides the proofs themselves.
#[derive(Debug, Clone)]
pub struct ResolveOptions<'a> {
    /// Current time in seconds since the epoch.
    pub now: u64,
    /// Derivation rules.
    pub rules: &'a DerivationRules,
    /// DID to verifier resolution for signature checks.
    pub resolver: &'a dyn Resolver,
    /// Revoked delegations.
    pub revocations: &'a dyn Revocations,
    /// Who may vouch for absentee delegations.
    pub attesters: Attesters,
}

impl<'a> ResolveOptions<'a> {
    /// Options with no revocations and no trusted attesters.
    pub fn new(now: u64, rules: &'a DerivationRules, resolver: &'a dyn Resolver) -> Self {
        Self {
            now,
            rules,
            resolver,
            revocations: &NoRevocations,
            attesters: Attesters::none(),
        }
    }

    /// Consults `revocations`.
    #[must_use]
    pub fn revocations(mut self, revocations: &'a dyn Revocations) -> Self {
        self.revocations = revocations;
        self
    }

    /// Trusts `attesters` to vouch for absentee delegations.
    #[must_use]
    pub fn attesters(mut self, attesters: Attesters) -> Self {
        self.attesters = attesters;
        self
    }
}

/// One delegation in a resolved chain.
#[derive(Debug, Clone)]
pub struct ChainLink {
    /// The delegation.
    pub delegation: Arc<Delegation>,
    /// The capability in it that covered the claim.
    pub capability: Capability,
    /// The attestation vouching for it, when its issuer is an absentee.
    pub attestation: Option<Arc<Delegation>>,
}

/// A resolved chain of delegations from the invoker up to the resource.
///
/// Empty when the invoker is the resource.
#[derive(Debug, Clone)]
pub struct ProofChain {
    invoker: Did,
    links: Vec<ChainLink>,
}

impl ProofChain {
    /// The principal the chain authorizes.
    #[must_use]
    pub const fn invoker(&self) -> &Did {
        &self.invoker
    }

    /// Links from the invoker's delegation up to the root.
    #[must_use]
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    /// Number of links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the invoker is the resource itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// The delegation addressed to the invoker.
    #[must_use]
    pub fn head(&self) -> Option<&Arc<Delegation>> {
        self.links.first().map(|link| &link.delegation)
    }

    /// Every delegation and attestation in the chain, each once.
    #[must_use]
    pub fn delegations(&self) -> Vec<Arc<Delegation>> {
        let all = self
            .links
            .iter()
            .flat_map(|link| std::iter::once(link.delegation.clone()).chain(link.attestation.clone()));
        unique(all)
    }

    /// What to present as proof: the head, carrying the rest of the chain
    /// as attachments, followed by every attestation in the chain.
    #[must_use]
    pub fn proofs(&self) -> Vec<Arc<Delegation>> {
        let Some((head, rest)) = self.links.split_first() else {
            return Vec::new();
        };
        let deeper: Vec<Arc<Delegation>> = rest
            .iter()
            .flat_map(|link| std::iter::once(link.delegation.clone()).chain(link.attestation.clone()))
            .collect();
        let carried = head.delegation.attachments();
        let complete = deeper
            .iter()
            .all(|proof| carried.iter().any(|known| known.cid() == proof.cid()));
        let head = if complete {
            head.delegation.clone()
        } else {
            Arc::new(head.delegation.as_ref().clone().attach(deeper))
        };
        let attestations = self.links.iter().filter_map(|link| link.attestation.clone());
        unique(std::iter::once(head).chain(attestations))
    }

    /// Intersection of the validity windows along the chain.
    #[must_use]
    pub fn time_range(&self) -> TimeRange {
        self.links.iter().fold(TimeRange::unbounded(), |range, link| {
            range.intersect(link.delegation.time_range())
        })
    }
}

fn unique(delegations: impl Iterator<Item = Arc<Delegation>>) -> Vec<Arc<Delegation>> {
    let mut out: Vec<Arc<Delegation>> = Vec::new();
    for delegation in delegations {
        if !out.iter().any(|known| known.cid() == delegation.cid()) {
            out.push(delegation);
        }
    }
    out
}

/// Finds a chain of `proofs` authorizing `invoker` to exercise `requested`.
///
/// Candidates are tried in the order they appear in `proofs`, and the proofs
/// of each candidate in the order it cites them; the first complete chain
/// wins.
///
/// # Errors
///
/// [`AuthorizationFailure`] listing why each candidate was rejected.
pub fn resolve(
    requested: &Capability,
    proofs: &[Arc<Delegation>],
    invoker: &Did,
    options: &ResolveOptions<'_>,
) -> Result<ProofChain, AuthorizationFailure> {
    if requested.with == *invoker {
        return Ok(ProofChain {
            invoker: invoker.clone(),
            links: Vec::new(),
        });
    }

    let mut search = Search {
        index: index_all(proofs),
        options,
        path: Vec::new(),
        causes: Vec::new(),
    };
    let candidates: Vec<Arc<Delegation>> = search
        .index
        .values()
        .filter(|delegation| delegation.audience() == invoker)
        .cloned()
        .collect();

    match search.find(requested, invoker, candidates) {
        Some(links) => Ok(ProofChain {
            invoker: invoker.clone(),
            links,
        }),
        None => {
            debug!(
                ability = %requested.can,
                resource = %requested.with,
                %invoker,
                causes = ?search.causes,
                "no proof chain"
            );
            Err(AuthorizationFailure {
                resource: requested.with.clone(),
                ability: requested.can.clone(),
                causes: search.causes,
            })
        }
    }
}

struct Search<'o, 'a> {
    index: ProofIndex,
    options: &'o ResolveOptions<'a>,
    path: Vec<Cid>,
    causes: Vec<LinkFailure>,
}

impl Search<'_, '_> {
    fn find(
        &mut self,
        claim: &Capability,
        audience: &Did,
        candidates: Vec<Arc<Delegation>>,
    ) -> Option<Vec<ChainLink>> {
        for delegation in candidates {
            let cid = *delegation.cid();
            if delegation.audience() != audience {
                self.causes.push(LinkFailure::AudienceMismatch {
                    cid,
                    expected: audience.clone(),
                    actual: delegation.audience().clone(),
                });
                continue;
            }
            if self.path.contains(&cid) {
                continue;
            }

            let attestation = match self.check(&delegation) {
                Ok(attestation) => attestation,
                Err(failure) => {
                    self.causes.push(failure);
                    continue;
                }
            };

            let mut rejection = None;
            let mut derived = false;
            for capability in delegation.capabilities() {
                if let Err(error) = self.options.rules.derives(claim, capability) {
                    if rejection.is_none() {
                        rejection = Some(error);
                    }
                    continue;
                }
                derived = true;

                let link = ChainLink {
                    delegation: delegation.clone(),
                    capability: capability.clone(),
                    attestation: attestation.clone(),
                };

                // The resource itself issued it: the chain is complete.
                if claim.with == *delegation.issuer() {
                    return Some(vec![link]);
                }

                // Otherwise the issuer must prove what it delegated.
                let upward = capability.narrowed_to(&claim.with);
                self.path.push(cid);
                let found = self.find_in_proofs(&delegation, &upward);
                self.path.pop();

                if let Some(mut rest) = found {
                    rest.insert(0, link);
                    return Some(rest);
                }
            }
            if let (false, Some(error)) = (derived, rejection) {
                self.causes.push(LinkFailure::Derivation { cid, error });
            }
        }
        None
    }

    fn find_in_proofs(&mut self, delegation: &Delegation, claim: &Capability) -> Option<Vec<ChainLink>> {
        let mut proofs = Vec::with_capacity(delegation.proofs().len());
        for proof in delegation.proofs() {
            match self.index.get(proof) {
                Some(found) => proofs.push(found.clone()),
                None => self.causes.push(LinkFailure::MissingProof {
                    cid: *delegation.cid(),
                    proof: *proof,
                }),
            }
        }
        self.find(claim, delegation.issuer(), proofs)
    }

    /// Validity of a single link; returns the attestation that vouches for
    /// an absentee issuer.
    fn check(&self, delegation: &Delegation) -> Result<Option<Arc<Delegation>>, LinkFailure> {
        self.check_status(delegation)?;
        if !delegation.is_absentee() {
            delegation.verify_signature(self.options.resolver)?;
            return Ok(None);
        }
        self.index
            .values()
            .find(|candidate| {
                is_attestation_of(candidate, delegation.cid())
                    && candidate.audience() == delegation.audience()
                    && self.options.attesters.accepts(candidate.issuer())
                    && !candidate.is_absentee()
                    && self.check_status(candidate).is_ok()
                    && candidate.verify_signature(self.options.resolver).is_ok()
            })
            .cloned()
            .map(Some)
            .ok_or_else(|| LinkFailure::Unattested {
                cid: *delegation.cid(),
                issuer: delegation.issuer().clone(),
            })
    }

    fn check_status(&self, delegation: &Delegation) -> Result<(), ValidityError> {
        if self.options.revocations.is_revoked(delegation.cid()) {
            return Err(ValidityError::Revoked {
                cid: *delegation.cid(),
            });
        }
        delegation.check_time(self.options.now)
    }
}
