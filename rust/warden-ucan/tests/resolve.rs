//! Integration tests for proof chain resolution.
//!
//! These use real Ed25519 keys to build delegation chains and check that
//! `resolve` accepts exactly the chains it should.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use testresult::TestResult;
use warden_capability::{Capability, DerivationRules};
use warden_credentials::{Absentee, Ed25519Signer, WebDidResolver, default_resolver};
use warden_ucan::{
    Attesters, Delegation, LinkFailure, MemoryRevocations, ResolveOptions, Revocation,
    ValidityError, attest, resolve,
};
use warden_varsig::{Did, Principal, Signer, did};

const NOW: u64 = 1_700_000_000;

fn signer(seed: u8) -> Ed25519Signer {
    Ed25519Signer::import(&[seed; 32]).unwrap()
}

fn capability(can: &str, with: &Did) -> Capability {
    Capability::parse(can, with.as_str()).unwrap()
}

fn delegate(
    issuer: &impl Signer,
    audience: &impl Principal,
    capabilities: Vec<Capability>,
    proofs: &[&Arc<Delegation>],
) -> Arc<Delegation> {
    Arc::new(
        Delegation::builder()
            .audience(audience.did())
            .capabilities(capabilities)
            .proofs(proofs.iter().map(|proof| Arc::clone(proof)))
            .sign(issuer)
            .unwrap(),
    )
}

struct World {
    rules: DerivationRules,
    resolver: Box<dyn warden_varsig::Resolver>,
}

impl World {
    fn new() -> Self {
        Self {
            rules: DerivationRules::standard(),
            resolver: Box::new(default_resolver(WebDidResolver::new())),
        }
    }

    fn with_service(service: &Ed25519Signer) -> Self {
        Self {
            rules: DerivationRules::standard(),
            resolver: Box::new(default_resolver(
                WebDidResolver::new().with(service.did(), *service.verifier()),
            )),
        }
    }

    fn options(&self, now: u64) -> ResolveOptions<'_> {
        ResolveOptions::new(now, &self.rules, self.resolver.as_ref())
    }
}

// =============================================================================
// Narrowing
// =============================================================================

#[test]
fn chain_resolves_through_narrowing_delegations() -> TestResult {
    let world = World::new();
    let space = signer(1);
    let alice = signer(2);
    let bob = signer(3);

    let root = delegate(&space, &alice, vec![capability("*", &space.did())], &[]);
    let narrowed = delegate(&alice, &bob, vec![capability("store/*", &space.did())], &[&root]);

    let chain = resolve(
        &capability("store/add", &space.did()),
        &[narrowed.clone()],
        &bob.did(),
        &world.options(NOW),
    )?;

    assert_eq!(chain.len(), 2);
    assert_eq!(chain.head().map(|d| *d.cid()), Some(*narrowed.cid()));
    assert_eq!(chain.links()[1].delegation.cid(), root.cid());
    assert_eq!(chain.delegations().len(), 2);
    Ok(())
}

#[test]
fn chain_check_fails_when_ability_is_not_delegated() -> TestResult {
    let world = World::new();
    let space = signer(1);
    let alice = signer(2);
    let bob = signer(3);

    let root = delegate(&space, &alice, vec![capability("*", &space.did())], &[]);
    let narrowed = delegate(&alice, &bob, vec![capability("store/*", &space.did())], &[&root]);

    let error = resolve(
        &capability("space/info", &space.did()),
        &[narrowed, root],
        &bob.did(),
        &world.options(NOW),
    )
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        format!(
            "no proofs available for resource {} and ability space/info",
            space.did()
        )
    );
    assert!(
        error
            .causes
            .iter()
            .any(|cause| matches!(cause, LinkFailure::Derivation { error, .. } if error.field == "can")),
        "expected a derivation failure, got {:?}",
        error.causes
    );
    Ok(())
}

#[test]
fn chain_check_fails_on_caveat_escalation() -> TestResult {
    let world = World::new();
    let space = signer(1);
    let alice = signer(2);
    let bob = signer(3);
    let limited = capability("store/add", &space.did()).with_caveat("size", 100_u64);
    let escalated = capability("store/add", &space.did()).with_caveat("size", 1000_u64);

    let root = delegate(&space, &alice, vec![limited], &[]);
    let widened = delegate(&alice, &bob, vec![escalated], &[&root]);

    let error = resolve(
        &capability("store/add", &space.did()).with_caveat("size", 50_u64),
        &[widened],
        &bob.did(),
        &world.options(NOW),
    )
    .unwrap_err();

    assert!(
        error.causes.iter().any(|cause| matches!(
            cause,
            LinkFailure::Derivation { cid, error } if cid == root.cid() && error.field == "size"
        )),
        "expected size violation on the root, got {:?}",
        error.causes
    );
    Ok(())
}

#[test]
fn missing_proofs_are_failures() -> TestResult {
    let world = World::new();
    let space = signer(1);
    let alice = signer(2);
    let bob = signer(3);

    let root = delegate(&space, &alice, vec![capability("*", &space.did())], &[]);
    let leaf = Delegation::builder()
        .audience(bob.did())
        .capability(capability("store/*", &space.did()))
        .proof(root.clone())
        .sign(&alice)?;
    // Re-decode so the proof is cited but not attached.
    let leaf = Arc::new(Delegation::decode(leaf.as_bytes())?);

    let error = resolve(
        &capability("store/add", &space.did()),
        &[leaf.clone()],
        &bob.did(),
        &world.options(NOW),
    )
    .unwrap_err();

    assert_eq!(
        error.causes,
        vec![LinkFailure::MissingProof {
            cid: *leaf.cid(),
            proof: *root.cid()
        }]
    );
    Ok(())
}

// =============================================================================
// Self authorization & tie-breaking
// =============================================================================

#[test]
fn invokers_are_authorized_on_themselves() -> TestResult {
    let world = World::new();
    let space = signer(1);

    let chain = resolve(
        &capability("space/info", &space.did()),
        &[],
        &space.did(),
        &world.options(NOW),
    )?;

    assert!(chain.is_empty());
    assert!(chain.proofs().is_empty());
    Ok(())
}

#[test]
fn first_inserted_delegation_wins() -> TestResult {
    let world = World::new();
    let space = signer(1);
    let alice = signer(2);

    let first = Arc::new(
        Delegation::builder()
            .audience(alice.did())
            .capability(capability("store/*", &space.did()))
            .nonce("first")
            .sign(&space)?,
    );
    let second = delegate(&space, &alice, vec![capability("*", &space.did())], &[]);

    let chain = resolve(
        &capability("store/add", &space.did()),
        &[first.clone(), second.clone()],
        &alice.did(),
        &world.options(NOW),
    )?;
    assert_eq!(chain.head().map(|d| *d.cid()), Some(*first.cid()));

    let chain = resolve(
        &capability("store/add", &space.did()),
        &[second.clone(), first],
        &alice.did(),
        &world.options(NOW),
    )?;
    assert_eq!(chain.head().map(|d| *d.cid()), Some(*second.cid()));
    Ok(())
}

// =============================================================================
// Revocation & time
// =============================================================================

#[test]
fn revocation_poisons_every_chain_through_it() -> TestResult {
    let world = World::new();
    let space = signer(1);
    let alice = signer(2);
    let bob = signer(3);

    let root = delegate(&space, &alice, vec![capability("*", &space.did())], &[]);
    let leaf = delegate(&alice, &bob, vec![capability("store/*", &space.did())], &[&root]);
    let revoke = delegate(&space, &space, vec![capability("ucan/revoke", &space.did())], &[]);

    let revocations = MemoryRevocations::new();
    assert!(revocations.record(Revocation {
        revoked: *root.cid(),
        revoked_at: NOW,
        revoked_by: revoke,
    }));

    let options = world.options(NOW).revocations(&revocations);
    let error = resolve(&capability("store/add", &space.did()), &[leaf], &bob.did(), &options).unwrap_err();
    assert!(error.is_revoked());

    let direct = resolve(
        &capability("space/info", &space.did()),
        &[root.clone()],
        &alice.did(),
        &options,
    )
    .unwrap_err();
    assert_eq!(
        direct.causes,
        vec![LinkFailure::Invalid(ValidityError::Revoked { cid: *root.cid() })]
    );
    Ok(())
}

#[test]
fn expiration_boundary_is_exclusive() -> TestResult {
    let world = World::new();
    let space = signer(1);
    let alice = signer(2);
    let expiring = Arc::new(
        Delegation::builder()
            .audience(alice.did())
            .capability(capability("*", &space.did()))
            .expiration(NOW)
            .sign(&space)?,
    );
    let requested = capability("space/info", &space.did());

    assert!(resolve(&requested, &[expiring.clone()], &alice.did(), &world.options(NOW - 1)).is_ok());
    let error = resolve(&requested, &[expiring], &alice.did(), &world.options(NOW)).unwrap_err();
    assert!(error.is_expired());
    Ok(())
}

#[test]
fn not_before_boundary_is_inclusive() -> TestResult {
    let world = World::new();
    let space = signer(1);
    let alice = signer(2);
    let pending = Arc::new(
        Delegation::builder()
            .audience(alice.did())
            .capability(capability("*", &space.did()))
            .not_before(NOW)
            .sign(&space)?,
    );
    let requested = capability("space/info", &space.did());

    let error = resolve(&requested, &[pending.clone()], &alice.did(), &world.options(NOW - 1)).unwrap_err();
    assert!(matches!(
        error.causes.as_slice(),
        [LinkFailure::Invalid(ValidityError::NotYetValid { .. })]
    ));
    assert!(resolve(&requested, &[pending], &alice.did(), &world.options(NOW)).is_ok());
    Ok(())
}

// =============================================================================
// Attestation pairing
// =============================================================================

fn account_delegation(agent: &Ed25519Signer) -> Arc<Delegation> {
    let account = Absentee::new(did!("mailto:example.com:alice"));
    delegate(
        &account,
        agent,
        vec![Capability::parse("provider/add", "ucan:*").unwrap()],
        &[],
    )
}

#[test]
fn absentee_delegations_need_an_attestation() -> TestResult {
    let service = signer(9).with_did(did!("web:up.example.com"));
    let world = World::with_service(&service);
    let agent = signer(2);
    let account = account_delegation(&agent);
    let requested = Capability::parse("provider/add", "did:mailto:example.com:alice")?;

    let error = resolve(&requested, &[account.clone()], &agent.did(), &world.options(NOW)).unwrap_err();
    assert_eq!(
        error.causes,
        vec![LinkFailure::Unattested {
            cid: *account.cid(),
            issuer: did!("mailto:example.com:alice")
        }]
    );
    Ok(())
}

#[test]
fn attestations_for_other_delegations_do_not_count() -> TestResult {
    let service = signer(9).with_did(did!("web:up.example.com"));
    let world = World::with_service(&service);
    let agent = signer(2);
    let account = account_delegation(&agent);
    let unrelated = delegate(&agent, &agent, vec![capability("space/info", &agent.did())], &[]);
    let mismatched = Arc::new(attest(&service, agent.did(), unrelated.cid(), None)?);
    let requested = Capability::parse("provider/add", "did:mailto:example.com:alice")?;

    let error = resolve(&requested, &[account, mismatched], &agent.did(), &world.options(NOW)).unwrap_err();
    assert!(matches!(error.causes.as_slice(), [LinkFailure::Unattested { .. }]));
    Ok(())
}

#[test]
fn matching_attestations_complete_the_session() -> TestResult {
    let service = signer(9).with_did(did!("web:up.example.com"));
    let world = World::with_service(&service);
    let agent = signer(2);
    let account = account_delegation(&agent);
    let attestation = Arc::new(attest(&service, agent.did(), account.cid(), None)?);
    let requested = Capability::parse("provider/add", "did:mailto:example.com:alice")?;

    let chain = resolve(
        &requested,
        &[account.clone(), attestation.clone()],
        &agent.did(),
        &world.options(NOW).attesters(Attesters::only(service.did())),
    )?;

    assert_eq!(chain.len(), 1);
    let proofs: Vec<_> = chain.proofs().iter().map(|d| *d.cid()).collect();
    assert_eq!(proofs, vec![*account.cid(), *attestation.cid()]);
    Ok(())
}

#[test]
fn untrusted_attesters_are_ignored() -> TestResult {
    let service = signer(9).with_did(did!("web:up.example.com"));
    let world = World::with_service(&service);
    let agent = signer(2);
    let account = account_delegation(&agent);
    let attestation = Arc::new(attest(&service, agent.did(), account.cid(), None)?);
    let requested = Capability::parse("provider/add", "did:mailto:example.com:alice")?;

    let options = world
        .options(NOW)
        .attesters(Attesters::only(did!("web:other.example.com")));
    assert!(resolve(&requested, &[account, attestation], &agent.did(), &options).is_err());
    Ok(())
}

#[test]
fn account_wildcards_resolve_to_spaces_the_account_holds() -> TestResult {
    let service = signer(9).with_did(did!("web:up.example.com"));
    let world = World::with_service(&service);
    let space = signer(1);
    let agent = signer(2);
    let account = Absentee::new(did!("mailto:example.com:alice"));

    let space_to_account = delegate(&space, &account, vec![capability("*", &space.did())], &[]);
    let session = delegate(
        &account,
        &agent,
        vec![Capability::parse("*", "ucan:*")?],
        &[&space_to_account],
    );
    let attestation = Arc::new(attest(&service, agent.did(), session.cid(), None)?);

    let chain = resolve(
        &capability("store/add", &space.did()),
        &[session.clone(), attestation],
        &agent.did(),
        &world.options(NOW).attesters(Attesters::only(service.did())),
    )?;

    assert_eq!(chain.len(), 2);
    assert!(chain.links()[0].attestation.is_some());
    assert_eq!(chain.links()[1].delegation.cid(), space_to_account.cid());
    Ok(())
}

#[test]
fn self_attested_forgeries_are_rejected_by_default() -> TestResult {
    let world = World::new();
    let mallory = signer(6);
    let account = Absentee::new(did!("mailto:example.com:alice"));
    let forged = delegate(&account, &mallory, vec![Capability::parse("*", "ucan:*")?], &[]);
    let vouch = Arc::new(attest(&mallory, mallory.did(), forged.cid(), None)?);
    let requested = Capability::parse("provider/add", "did:mailto:example.com:alice")?;

    let error = resolve(&requested, &[forged.clone(), vouch], &mallory.did(), &world.options(NOW)).unwrap_err();
    assert!(error.causes.iter().any(
        |cause| matches!(cause, LinkFailure::Unattested { cid, .. } if cid == forged.cid())
    ));
    Ok(())
}

#[test]
fn attestations_must_share_the_audience() -> TestResult {
    let service = signer(9).with_did(did!("web:up.example.com"));
    let world = World::with_service(&service);
    let agent = signer(2);
    let bystander = signer(3);
    let account = account_delegation(&agent);
    let misaddressed = Arc::new(attest(&service, bystander.did(), account.cid(), None)?);
    let requested = Capability::parse("provider/add", "did:mailto:example.com:alice")?;

    let options = world.options(NOW).attesters(Attesters::only(service.did()));
    let error = resolve(&requested, &[account, misaddressed], &agent.did(), &options).unwrap_err();
    assert!(matches!(error.causes.as_slice(), [LinkFailure::Unattested { .. }]));
    Ok(())
}

// =============================================================================
// Content addressing
// =============================================================================

/// The envelope of `delegation` with the signature written before the
/// payload.
fn signature_first(delegation: &Delegation) -> Vec<u8> {
    let mut bytes = vec![0xa2, 0x61, b's'];
    bytes.extend(serde_ipld_dagcbor::to_vec(delegation.signature()).unwrap());
    bytes.extend([0x61, b'p']);
    bytes.extend(serde_ipld_dagcbor::to_vec(delegation.payload()).unwrap());
    bytes
}

#[test]
fn reordered_encodings_keep_their_identity() -> TestResult {
    let world = World::new();
    let space = signer(1);
    let bob = signer(2);
    let grant = delegate(&space, &bob, vec![capability("store/add", &space.did())], &[]);

    let reordered = signature_first(&grant);
    assert_ne!(reordered.as_slice(), grant.as_bytes());

    let decoded = Arc::new(Delegation::decode(&reordered)?);
    assert_eq!(decoded.cid(), grant.cid());
    assert_eq!(decoded.as_bytes(), grant.as_bytes());

    let revocations = MemoryRevocations::new();
    revocations.record(Revocation {
        revoked: *grant.cid(),
        revoked_at: NOW,
        revoked_by: grant.clone(),
    });
    let options = world.options(NOW).revocations(&revocations);
    let error = resolve(&capability("store/add", &space.did()), &[decoded], &bob.did(), &options).unwrap_err();
    assert!(error.is_revoked());
    Ok(())
}
