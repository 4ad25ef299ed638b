//! Server side checks of incoming invocations.

use std::{fmt, sync::Arc};

use warden_capability::{Capability, DerivationRules};
use warden_ucan::{Attesters, MemoryRevocations, ProofChain, ResolveOptions, resolve};
use warden_varsig::{Did, Resolver};

use crate::{Failure, Invocation, storage::RevocationsStorage};

/// An invocation that passed validation.
#[derive(Debug, Clone)]
pub struct Authorized {
    /// The invocation.
    pub invocation: Invocation,
    /// The chain that authorizes it; empty when the invoker is the
    /// resource.
    pub chain: ProofChain,
}

impl Authorized {
    /// The invoked capability.
    pub fn capability(&self) -> &Capability {
        self.invocation.capability()
    }
}

/// Re-checks an invocation's attached proofs the way the agent that built
/// it did, against the service's own view of revocations.
pub struct Validator {
    authority: Did,
    rules: DerivationRules,
    resolver: Arc<dyn Resolver>,
}

impl Validator {
    /// A validator for invocations addressed to `authority`, which is also
    /// the only accepted attester.
    pub fn new(authority: Did, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            authority,
            rules: DerivationRules::standard(),
            resolver,
        }
    }

    /// Replaces the derivation rules.
    pub fn with_rules(mut self, rules: DerivationRules) -> Self {
        self.rules = rules;
        self
    }

    /// The DID invocations must be addressed to.
    pub fn authority(&self) -> &Did {
        &self.authority
    }

    /// The resolver used for signatures.
    pub fn resolver(&self) -> &dyn Resolver {
        self.resolver.as_ref()
    }

    /// Checks that `invocation` is addressed to the authority, is signed
    /// and current, and that its proofs authorize the invoker.
    pub async fn validate(
        &self,
        invocation: &Invocation,
        now: u64,
        revocations: &dyn RevocationsStorage,
    ) -> Result<Authorized, Failure> {
        if invocation.audience() != &self.authority {
            return Err(Failure::new(
                "InvalidAudience",
                format!(
                    "invocation {} is addressed to {}, expected {}",
                    invocation.cid(),
                    invocation.audience(),
                    self.authority
                ),
            ));
        }
        invocation.delegation().validate(now, self.resolver())?;

        let proofs = invocation.proofs();
        let cids: Vec<_> = proofs.iter().map(|proof| *proof.cid()).collect();
        let snapshot = MemoryRevocations::new();
        for revocation in revocations.find(&cids).await? {
            snapshot.record(revocation);
        }

        let options = ResolveOptions::new(now, &self.rules, self.resolver())
            .revocations(&snapshot)
            .attesters(Attesters::only(self.authority.clone()));
        let chain = resolve(invocation.capability(), &proofs, invocation.issuer(), &options)?;
        Ok(Authorized {
            invocation: invocation.clone(),
            chain,
        })
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("authority", &self.authority)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
