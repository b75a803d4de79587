use super::*;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use std::sync::{Arc, Mutex, RwLock};

const T0: Timestamp = 1_000_000;
const HOUR: u64 = 3_600;
const WEEK: u64 = 7 * 24 * 3_600;

struct Platform {
    clock: Arc<ManualClock>,
    registry: Arc<RwLock<ElectionRegistry>>,
    store: BallotStore,
    platform_admin: PublicKey,
    org_admin: PublicKey,
    owner: PublicKey,
}

/// Registry and store wired together the way a deployment would do it: one
/// shared registry, a store owned by a separate identity, clocks in lockstep.
fn setup() -> Platform {
    let (_, platform_admin) = generate_keypair();
    let (_, org_admin) = generate_keypair();
    let (_, owner) = generate_keypair();

    let clock = Arc::new(ManualClock::new(T0));
    let registry = Arc::new(RwLock::new(ElectionRegistry::new(
        platform_admin,
        clock.clone(),
    )));
    registry
        .write()
        .unwrap()
        .add_org_admin(&platform_admin, 1, org_admin)
        .unwrap();

    let registry_address = registry.read().unwrap().address();
    let store = BallotStore::new(owner, 1, clock.clone())
        .with_registry(registry_address, registry.clone());

    Platform {
        clock,
        registry,
        store,
        platform_admin,
        org_admin,
        owner,
    }
}

/// Election with candidates ["Alice", "Bob", "Carol"] open [T0+1h, T0+7d].
fn create_election(platform: &Platform) -> ElectionId {
    platform
        .registry
        .write()
        .unwrap()
        .create_election(
            &platform.org_admin,
            1,
            "Board election".to_string(),
            "Annual board election".to_string(),
            T0 + HOUR,
            T0 + WEEK,
            vec![
                "Alice".to_string(),
                "Bob".to_string(),
                "Carol".to_string(),
            ],
        )
        .unwrap()
}

fn signed_ballot(
    secret: &SecretKey,
    voter: PublicKey,
    domain: &SigningDomain,
    election_id: ElectionId,
    candidate_id: u32,
    nonce: u64,
    deadline: Timestamp,
) -> (VoteData, ed25519_dalek::Signature) {
    let vote = VoteData {
        voter,
        election_id,
        candidate_id,
        nonce,
        deadline,
    };
    let signature = vote.sign(domain, secret).unwrap();
    (vote, signature)
}

#[test]
fn end_to_end_election() {
    let mut platform = setup();
    let election_id = create_election(&platform);
    assert_eq!(platform.registry.read().unwrap().election_count(), 1);

    // Three voters: two vote directly, one through a relayer
    let (_, voter_1) = generate_keypair();
    let (_, voter_2) = generate_keypair();
    let (voter_3_secret, voter_3) = generate_keypair();
    let (_, relayer) = generate_keypair();

    // One second after the window opens
    platform.clock.set(T0 + HOUR + 1);

    platform.store.vote(&voter_1, election_id, 0).unwrap();
    platform.store.vote(&voter_2, election_id, 1).unwrap();

    let (vote, signature) = signed_ballot(
        &voter_3_secret,
        voter_3,
        platform.store.domain(),
        election_id,
        0,
        0,
        T0 + WEEK,
    );
    platform
        .store
        .vote_with_signature(&relayer, &vote, &signature)
        .unwrap();

    // Tally = [2, 1, 0]
    assert_eq!(
        platform.store.all_vote_counts(election_id).unwrap(),
        vec![2, 1, 0]
    );
    assert_eq!(platform.store.vote_count(election_id, 0), 2);
    assert_eq!(platform.store.vote_count(election_id, 1), 1);
    assert_eq!(platform.store.vote_count(election_id, 2), 0);

    for voter in [&voter_1, &voter_2, &voter_3] {
        assert!(platform.store.has_voted(election_id, voter));
    }
    assert!(!platform.store.vote_record(election_id, &voter_1).unwrap().delegated);
    assert!(platform.store.vote_record(election_id, &voter_3).unwrap().delegated);

    // Receipts re-derive for the candidate actually chosen, nothing else
    assert!(platform.store.verify_vote_hash(election_id, &voter_1, 0));
    assert!(!platform.store.verify_vote_hash(election_id, &voter_1, 1));
    assert!(platform.store.verify_vote_hash(election_id, &voter_3, 0));

    // The delegated path consumed exactly one nonce
    assert_eq!(platform.store.nonce(&voter_3), 1);
    assert_eq!(platform.store.nonce(&voter_1), 0);

    // The meta-transaction event precedes the vote-cast event it paid for
    let events = platform.store.events();
    let meta_at = events
        .iter()
        .position(|e| matches!(e, Event::MetaTransactionExecuted { .. }))
        .unwrap();
    assert!(matches!(
        events[meta_at],
        Event::MetaTransactionExecuted {
            election_id: e,
            nonce_consumed: 0,
            ..
        } if e == election_id
    ));
    assert!(matches!(
        events[meta_at + 1],
        Event::VoteCast {
            is_delegated: true,
            ..
        }
    ));
    assert!(matches!(
        events[meta_at + 2],
        Event::VoteCountUpdated { new_count: 2, .. }
    ));

    // Event log serializes for external consumers
    let json = serde_json::to_string(events).unwrap();
    assert!(json.contains("meta_transaction_executed"));
    assert!(json.contains("vote_count_updated"));
}

#[test]
fn one_vote_per_voter_per_election() {
    let mut platform = setup();
    let election_id = create_election(&platform);
    let (voter_secret, voter) = generate_keypair();
    let (_, relayer) = generate_keypair();

    platform.clock.set(T0 + HOUR + 1);
    platform.store.vote(&voter, election_id, 0).unwrap();

    // Direct retry, different candidate
    assert!(matches!(
        platform.store.vote(&voter, election_id, 1),
        Err(ValidationError::AlreadyVoted(_))
    ));

    // Delegated retry with a perfectly valid signature and nonce
    let (vote, signature) = signed_ballot(
        &voter_secret,
        voter,
        platform.store.domain(),
        election_id,
        2,
        0,
        T0 + WEEK,
    );
    assert!(matches!(
        platform.store.vote_with_signature(&relayer, &vote, &signature),
        Err(ValidationError::AlreadyVoted(_))
    ));

    // Tallies unchanged by either rejection, and no nonce was burned
    assert_eq!(
        platform.store.all_vote_counts(election_id).unwrap(),
        vec![1, 0, 0]
    );
    assert_eq!(platform.store.nonce(&voter), 0);
}

#[test]
fn voting_window_is_boundary_inclusive() {
    let mut platform = setup();
    let election_id = create_election(&platform);
    let (_, early) = generate_keypair();
    let (_, on_open) = generate_keypair();
    let (_, on_close) = generate_keypair();
    let (_, late) = generate_keypair();

    // One second before the window opens
    platform.clock.set(T0 + HOUR - 1);
    assert!(matches!(
        platform.store.vote(&early, election_id, 0),
        Err(ValidationError::ElectionNotActive(_))
    ));

    // Exactly at start
    platform.clock.set(T0 + HOUR);
    platform.store.vote(&on_open, election_id, 0).unwrap();

    // Exactly at end
    platform.clock.set(T0 + WEEK);
    platform.store.vote(&on_close, election_id, 0).unwrap();

    // One second past the end
    platform.clock.set(T0 + WEEK + 1);
    assert!(matches!(
        platform.store.vote(&late, election_id, 0),
        Err(ValidationError::ElectionNotActive(_))
    ));
}

#[test]
fn nonces_are_strictly_sequential() {
    let mut platform = setup();
    let first = create_election(&platform);
    let second = create_election(&platform);
    let (voter_secret, voter) = generate_keypair();
    let (_, relayer) = generate_keypair();

    platform.clock.set(T0 + HOUR + 1);
    let domain = platform.store.domain().clone();

    // Skipping ahead is rejected, not queued
    let (vote, signature) =
        signed_ballot(&voter_secret, voter, &domain, first, 0, 1, T0 + WEEK);
    assert!(matches!(
        platform.store.vote_with_signature(&relayer, &vote, &signature),
        Err(ValidationError::InvalidNonce(0, 1))
    ));

    let (vote, signature) =
        signed_ballot(&voter_secret, voter, &domain, first, 0, 0, T0 + WEEK);
    platform
        .store
        .vote_with_signature(&relayer, &vote, &signature)
        .unwrap();
    assert_eq!(platform.store.nonce(&voter), 1);

    // The consumed nonce can never be redeemed again, even for a different
    // election
    let (vote, signature) =
        signed_ballot(&voter_secret, voter, &domain, second, 1, 0, T0 + WEEK);
    assert!(matches!(
        platform.store.vote_with_signature(&relayer, &vote, &signature),
        Err(ValidationError::InvalidNonce(1, 0))
    ));

    let (vote, signature) =
        signed_ballot(&voter_secret, voter, &domain, second, 1, 1, T0 + WEEK);
    platform
        .store
        .vote_with_signature(&relayer, &vote, &signature)
        .unwrap();
    assert_eq!(platform.store.nonce(&voter), 2);
}

#[test]
fn signatures_bind_voter_deadline_and_store() {
    let mut platform = setup();
    let election_id = create_election(&platform);
    let (_, victim) = generate_keypair();
    let (mallory_secret, _) = generate_keypair();
    let (voter_secret, voter) = generate_keypair();
    let (_, relayer) = generate_keypair();

    platform.clock.set(T0 + HOUR + 1);
    let domain = platform.store.domain().clone();

    // Mallory signs a payload naming someone else as the voter
    let vote = VoteData {
        voter: victim,
        election_id,
        candidate_id: 0,
        nonce: 0,
        deadline: T0 + WEEK,
    };
    let serialized = signing_bytes(&domain, &vote).unwrap();
    let expanded: ed25519_dalek::ExpandedSecretKey = (&mallory_secret).into();
    let forged = expanded.sign(&serialized, &PublicKey::from(&mallory_secret));
    assert!(matches!(
        platform.store.vote_with_signature(&relayer, &vote, &forged),
        Err(ValidationError::InvalidSignature)
    ));
    assert!(!platform.store.has_voted(election_id, &victim));

    // A valid signature past its deadline is dead
    let (vote, signature) = signed_ballot(
        &voter_secret,
        voter,
        &domain,
        election_id,
        0,
        0,
        T0 + HOUR,
    );
    assert!(matches!(
        platform.store.vote_with_signature(&relayer, &vote, &signature),
        Err(ValidationError::SignatureExpired)
    ));

    // A ballot signed for one store is worthless at another
    let (_, other_owner) = generate_keypair();
    let mut other_store = BallotStore::new(other_owner, 1, platform.clock.clone())
        .with_registry(
            platform.registry.read().unwrap().address(),
            platform.registry.clone(),
        );
    let (vote, signature) = signed_ballot(
        &voter_secret,
        voter,
        &domain,
        election_id,
        0,
        0,
        T0 + WEEK,
    );
    assert!(matches!(
        other_store.vote_with_signature(&relayer, &vote, &signature),
        Err(ValidationError::InvalidSignature)
    ));

    // At its own store it redeems fine, also via the wire form
    let ballot = SignedBallot { vote, signature };
    let ballot = SignedBallot::from_bytes(&ballot.as_bytes()).unwrap();
    platform.store.submit(&relayer, &ballot).unwrap();
    assert!(platform.store.has_voted(election_id, &voter));
}

#[test]
fn pausing_blocks_submissions_but_keeps_state() {
    let mut platform = setup();
    let election_id = create_election(&platform);
    let (_, voter_1) = generate_keypair();
    let (_, voter_2) = generate_keypair();

    platform.clock.set(T0 + HOUR + 1);
    platform.store.vote(&voter_1, election_id, 0).unwrap();

    platform.store.pause(&platform.owner).unwrap();
    assert!(matches!(
        platform.store.vote(&voter_2, election_id, 0),
        Err(ValidationError::VotingPaused)
    ));

    // Prior votes and tallies are untouched
    assert!(platform.store.has_voted(election_id, &voter_1));
    assert_eq!(platform.store.vote_count(election_id, 0), 1);

    platform.store.unpause(&platform.owner).unwrap();
    platform.store.vote(&voter_2, election_id, 0).unwrap();
    assert_eq!(platform.store.vote_count(election_id, 0), 2);
}

#[test]
fn deactivation_mid_window_stops_voting() {
    let mut platform = setup();
    let election_id = create_election(&platform);
    let (_, voter) = generate_keypair();

    platform.clock.set(T0 + HOUR + 1);
    platform
        .registry
        .write()
        .unwrap()
        .toggle_election_status(&platform.platform_admin, election_id)
        .unwrap();

    assert!(matches!(
        platform.store.vote(&voter, election_id, 0),
        Err(ValidationError::ElectionNotActive(_))
    ));

    platform
        .registry
        .write()
        .unwrap()
        .toggle_election_status(&platform.platform_admin, election_id)
        .unwrap();
    platform.store.vote(&voter, election_id, 0).unwrap();
}

#[test]
fn tallies_sum_to_the_number_of_successful_votes() {
    let mut platform = setup();
    let election_id = create_election(&platform);
    platform.clock.set(T0 + HOUR + 1);

    let choices = [0u32, 1, 0, 2, 1, 0, 0, 2];
    for candidate_id in choices.iter() {
        let (_, voter) = generate_keypair();
        platform.store.vote(&voter, election_id, *candidate_id).unwrap();
    }

    let counts = platform.store.all_vote_counts(election_id).unwrap();
    assert_eq!(counts, vec![4, 2, 2]);
    assert_eq!(counts.iter().sum::<u64>(), choices.len() as u64);
}

#[test]
fn concurrent_duplicate_votes_admit_exactly_one() {
    let platform = setup();
    let election_id = create_election(&platform);
    platform.clock.set(T0 + HOUR + 1);

    let (_, voter) = generate_keypair();
    let store = Arc::new(Mutex::new(platform.store));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        handles.push(std::thread::spawn(move || {
            store.lock().unwrap().vote(&voter, election_id, 0)
        }));
    }
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(ValidationError::AlreadyVoted(_))))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 3);
    assert_eq!(store.lock().unwrap().vote_count(election_id, 0), 1);
}
