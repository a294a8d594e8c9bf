//! End-to-end workflow scenarios, claim races and registry invariants.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Barrier};
use std::thread;

use rstest::rstest;
use santa_core::{
    ActorId, AttributeToken, FileGateway, MemoryGateway, ParticipantName, PersistenceGateway,
    Registry, RegistrySnapshot, SeedConfig,
};
use santa_exchange::{
    Allocation, AssignmentView, ClaimState, Exchange, ExchangeError, RandomSelector,
    ScriptedSelector,
};
use tempfile::TempDir;

fn name(s: &str) -> ParticipantName {
    ParticipantName::from(s)
}

fn token(s: &str) -> AttributeToken {
    AttributeToken::from(s)
}

fn exchange(registry: Registry, seed: u64) -> (Exchange, Arc<MemoryGateway>) {
    let gateway = Arc::new(MemoryGateway::new());
    let ex = Exchange::new(
        registry,
        gateway.clone(),
        Box::new(RandomSelector::seeded(seed)),
    );
    (ex, gateway)
}

fn ann_bob_cara() -> Registry {
    Registry::from_seed(["Ann", "Bob", "Cara"], ["Red", "Blue"]).expect("seed")
}

/// Checks every registry invariant that must hold in any reachable state.
fn assert_invariants(snapshot: &RegistrySnapshot) {
    let mut holders = HashSet::new();
    for p in &snapshot.participants {
        if let Some(actor) = p.claimed_by {
            assert!(holders.insert(actor), "actor {actor} holds two participants");
        }
        if let Some(a) = &p.assignment {
            assert_ne!(a.recipient, p.name, "self-assignment on {}", p.name);
            assert!(
                !snapshot.attributes.contains(&a.attribute),
                "token {} assigned and still pooled",
                a.attribute
            );
        }
    }
}

// ---------------------------------------------------------------------------
// 1. Scripted scenarios
// ---------------------------------------------------------------------------

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(42)]
fn ann_confirms_and_target_mirrors_pair(#[case] seed: u64) {
    let (ex, gateway) = exchange(ann_bob_cara(), seed);
    ex.propose(ActorId(1), name("Ann")).expect("propose");
    let confirmed = ex.confirm(ActorId(1)).expect("confirm");

    let Allocation::Assigned(assignment) = confirmed.allocation else {
        panic!("expected a fresh draw, got {:?}", confirmed.allocation);
    };
    assert!([name("Bob"), name("Cara")].contains(&assignment.recipient));
    assert!([token("Red"), token("Blue")].contains(&assignment.attribute));

    let snapshot = ex.snapshot();
    let target = snapshot
        .participants
        .iter()
        .find(|p| p.name == assignment.recipient)
        .expect("target");
    let target_pair = target.assignment.as_ref().expect("target assigned");
    assert_eq!(target_pair.recipient, name("Ann"));
    assert_eq!(target_pair.attribute, assignment.attribute);
    assert!(!snapshot.attributes.contains(&assignment.attribute));
    assert_eq!(snapshot.attributes.len(), 1);

    let ann = &snapshot.participants[0];
    assert_eq!(ann.claimed_by, Some(ActorId(1)));
    assert_eq!(ann.assignment.as_ref(), Some(&assignment));

    assert_eq!(gateway.last_saved(), Some(snapshot));
}

#[test]
fn late_claimant_gets_claim_but_no_task() {
    // Bob's candidates are [Ann, Cara]: index 1 draws Cara, so Bob and Cara
    // are both assigned before Ann claims.
    let ex = Exchange::new(
        ann_bob_cara(),
        Arc::new(MemoryGateway::new()),
        Box::new(ScriptedSelector::new([1, 0])),
    );
    ex.propose(ActorId(2), name("Bob")).unwrap();
    let bob = ex.confirm(ActorId(2)).unwrap();
    assert_eq!(
        bob.allocation.assignment().map(|a| a.recipient.clone()),
        Some(name("Cara"))
    );

    ex.propose(ActorId(1), name("Ann")).unwrap();
    let ann = ex.confirm(ActorId(1)).expect("claim recorded");
    assert!(
        matches!(ann.allocation, Allocation::Exhausted { candidates: 0, .. }),
        "got {:?}",
        ann.allocation
    );
    assert_eq!(
        ex.my_assignment(ActorId(1)),
        AssignmentView::NotAssignedYet { name: name("Ann") }
    );
    assert_eq!(
        ex.claim_state(ActorId(1)),
        ClaimState::Claimed { name: name("Ann") }
    );
}

#[test]
fn exhaustion_with_prepared_registry() {
    let mut registry = ann_bob_cara();
    registry
        .assign_recipient(&name("Bob"), name("Cara"), token("Red"))
        .unwrap();
    registry
        .assign_recipient(&name("Cara"), name("Bob"), token("Red"))
        .unwrap();
    registry.remove_attribute(&token("Red")).unwrap();

    let (ex, _gateway) = exchange(registry, 0);
    ex.propose(ActorId(1), name("Ann")).unwrap();
    let confirmed = ex.confirm(ActorId(1)).unwrap();
    assert!(matches!(confirmed.allocation, Allocation::Exhausted { .. }));

    let snapshot = ex.snapshot();
    assert_eq!(snapshot.participants[0].claimed_by, Some(ActorId(1)));
    assert!(snapshot.participants[0].assignment.is_none());
    assert!(snapshot.attributes.contains(&token("Blue")), "no token spent");
}

#[test]
fn interleaved_proposals_for_same_name() {
    let (ex, _gateway) = exchange(ann_bob_cara(), 5);
    ex.propose(ActorId(10), name("Ann")).expect("X proposes");
    ex.propose(ActorId(20), name("Ann")).expect("Y proposes before X confirms");

    ex.confirm(ActorId(10)).expect("X confirms first");
    let err = ex.confirm(ActorId(20)).unwrap_err();
    assert!(matches!(err, ExchangeError::AlreadyClaimed(n) if n == name("Ann")));

    // Y's proposal was consumed; an eager re-propose now fails.
    assert_eq!(ex.claim_state(ActorId(20)), ClaimState::NoClaim);
    let err = ex.propose(ActorId(20), name("Ann")).unwrap_err();
    assert!(matches!(err, ExchangeError::NameUnavailable(_)));

    let holders: Vec<_> = ex
        .snapshot()
        .participants
        .into_iter()
        .filter(|p| p.name == name("Ann"))
        .map(|p| p.claimed_by)
        .collect();
    assert_eq!(holders, vec![Some(ActorId(10))]);
}

#[test]
fn claimable_names_include_own_claim_only() {
    let (ex, _gateway) = exchange(ann_bob_cara(), 3);
    ex.propose(ActorId(1), name("Bob")).unwrap();
    ex.confirm(ActorId(1)).unwrap();

    assert_eq!(
        ex.list_claimable_names(ActorId(1)),
        vec![name("Ann"), name("Bob"), name("Cara")]
    );
    assert_eq!(
        ex.list_claimable_names(ActorId(2)),
        vec![name("Ann"), name("Cara")]
    );
}

#[test]
fn drawn_participant_claiming_later_sees_reciprocal_pair() {
    let registry = Registry::from_seed(["Ann", "Bob"], ["Red", "Blue"]).unwrap();
    let (ex, _gateway) = exchange(registry, 11);
    ex.propose(ActorId(1), name("Ann")).unwrap();
    let ann = ex.confirm(ActorId(1)).unwrap();
    let drawn = ann.allocation.assignment().cloned().expect("Ann drew Bob");
    assert_eq!(drawn.recipient, name("Bob"));

    ex.propose(ActorId(2), name("Bob")).unwrap();
    let bob = ex.confirm(ActorId(2)).unwrap();
    let Allocation::Reciprocal(pair) = bob.allocation else {
        panic!("expected reciprocal pair, got {:?}", bob.allocation);
    };
    assert_eq!(pair.recipient, name("Ann"));
    assert_eq!(pair.attribute, drawn.attribute);
    assert_eq!(ex.snapshot().attributes.len(), 1, "no second token spent");
}

// ---------------------------------------------------------------------------
// 2. Concurrency
// ---------------------------------------------------------------------------

#[test]
fn racing_confirms_for_different_names_share_one_token() {
    for _ in 0..50 {
        // Candidate order is roster order and the selector always picks the
        // first, so whoever wins draws Cara and the loser finds no token.
        let registry = Registry::from_seed(["Cara", "Ann", "Bob"], ["Red"]).unwrap();
        let gateway = Arc::new(MemoryGateway::new());
        let ex = Arc::new(Exchange::new(
            registry,
            gateway,
            Box::new(ScriptedSelector::first()),
        ));
        ex.propose(ActorId(1), name("Ann")).unwrap();
        ex.propose(ActorId(2), name("Bob")).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [ActorId(1), ActorId(2)]
            .into_iter()
            .map(|actor| {
                let ex = ex.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    ex.confirm(actor)
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread").expect("both claims succeed"))
            .collect();

        let assigned = results
            .iter()
            .filter(|c| matches!(c.allocation, Allocation::Assigned(_)))
            .count();
        let exhausted = results
            .iter()
            .filter(|c| matches!(c.allocation, Allocation::Exhausted { .. }))
            .count();
        assert_eq!((assigned, exhausted), (1, 1));

        let snapshot = ex.snapshot();
        assert!(snapshot.attributes.is_empty());
        assert_invariants(&snapshot);
    }
}

#[test]
fn racing_confirms_for_same_name_have_one_winner() {
    for _ in 0..50 {
        let (ex, _gateway) = exchange(ann_bob_cara(), 9);
        let ex = Arc::new(ex);
        ex.propose(ActorId(1), name("Ann")).unwrap();
        ex.propose(ActorId(2), name("Ann")).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [ActorId(1), ActorId(2)]
            .into_iter()
            .map(|actor| {
                let ex = ex.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    ex.confirm(actor)
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();

        let wins = results.iter().filter(|r| r.is_ok()).count();
        let lost = results
            .iter()
            .filter(|r| matches!(r, Err(ExchangeError::AlreadyClaimed(_))))
            .count();
        assert_eq!((wins, lost), (1, 1));
        assert_eq!(ex.snapshot().attributes.len(), 1, "exactly one token spent");
    }
}

#[test]
fn many_actors_racing_keep_invariants() {
    let seed = SeedConfig::builtin();
    let roster = seed.roster.clone();
    let gateway = Arc::new(MemoryGateway::new());
    let ex = Arc::new(
        Exchange::open(gateway.clone(), seed, Box::new(RandomSelector::seeded(2024)))
            .expect("open"),
    );

    // Twenty actors, two per name: every name ends up claimed exactly once.
    let handles: Vec<_> = (0..20)
        .map(|i| {
            let ex = ex.clone();
            let wanted = ParticipantName::from(roster[i % roster.len()].clone());
            thread::spawn(move || {
                let actor = ActorId(i as i64 + 1);
                match ex.propose(actor, wanted) {
                    Ok(_) => ex.confirm(actor).is_ok(),
                    Err(_) => false,
                }
            })
        })
        .collect();
    let wins = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .filter(|won| *won)
        .count();
    assert_eq!(wins, roster.len());

    let snapshot = ex.snapshot();
    assert_invariants(&snapshot);
    assert!(snapshot.participants.iter().all(|p| p.claimed_by.is_some()));
    assert_eq!(gateway.last_saved(), Some(snapshot));
}

// ---------------------------------------------------------------------------
// 3. Randomized invariants
// ---------------------------------------------------------------------------

#[test]
fn random_operation_sequences_preserve_invariants() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    for seed in 0..25u64 {
        let mut driver = StdRng::seed_from_u64(seed);
        let (ex, _gateway) = exchange(
            SeedConfig::builtin().into_registry().expect("seed"),
            seed,
        );
        let names: Vec<ParticipantName> = ex
            .snapshot()
            .participants
            .iter()
            .map(|p| p.name.clone())
            .collect();
        let mut seen_pairs: HashMap<ParticipantName, (ParticipantName, AttributeToken)> =
            HashMap::new();
        let mut spent: HashSet<AttributeToken> = HashSet::new();

        for _ in 0..200 {
            let actor = ActorId(driver.gen_range(1..15));
            match driver.gen_range(0..4) {
                0 => {
                    let wanted = names[driver.gen_range(0..names.len())].clone();
                    let _ = ex.propose(actor, wanted);
                }
                1 => {
                    let _ = ex.confirm(actor);
                }
                2 => {
                    let _ = ex.cancel(actor);
                }
                _ => {
                    let _ = ex.my_assignment(actor);
                }
            }

            let snapshot = ex.snapshot();
            assert_invariants(&snapshot);
            for p in &snapshot.participants {
                if let Some(a) = &p.assignment {
                    let pair = (a.recipient.clone(), a.attribute.clone());
                    let previous = seen_pairs.entry(p.name.clone()).or_insert(pair.clone());
                    assert_eq!(*previous, pair, "assignment of {} changed", p.name);
                    spent.insert(a.attribute.clone());
                }
            }
            for token in &spent {
                assert!(!snapshot.attributes.contains(token), "token {token} came back");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 4. Restart from disk
// ---------------------------------------------------------------------------

#[test]
fn state_survives_restart_through_file_gateway() {
    let home = TempDir::new().expect("home");
    let gateway: Arc<dyn PersistenceGateway> = Arc::new(FileGateway::at_home(home.path()));
    let seed = SeedConfig {
        roster: vec!["Ann".into(), "Bob".into(), "Cara".into()],
        attributes: vec!["Red".into(), "Blue".into()],
    };

    let before = {
        let ex = Exchange::open(gateway.clone(), seed.clone(), Box::new(RandomSelector::seeded(1)))
            .expect("open");
        ex.propose(ActorId(1), name("Ann")).unwrap();
        ex.confirm(ActorId(1)).unwrap();
        ex.snapshot()
    };

    let ex = Exchange::open(gateway, seed, Box::new(RandomSelector::seeded(1))).expect("reopen");
    assert_eq!(ex.snapshot(), before);
    assert!(matches!(
        ex.my_assignment(ActorId(1)),
        AssignmentView::Assigned { .. }
    ));
    // Pending proposals are transient and are not restored.
    assert_eq!(ex.pending_proposals(), 0);
}
