use crate::*;
use digest::Digest;
use ed25519_dalek::PublicKey;
use ed25519_dalek::Signature;
use log::{debug, info, warn};
use rand::Rng;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One recorded vote. Existence of the record is the "has voted" flag, and
/// the record is immutable once written - there is no revocation or change.
///
/// The hash is a spot-check receipt, not a hiding commitment: the store holds
/// tallies and per-voter records in the clear, so the hash only lets a third
/// party who knows the salt re-derive and confirm what was recorded.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VoteRecord {
    #[serde(with = "hex_serde")]
    pub vote_hash: Vec<u8>,

    #[serde(with = "hex_serde")]
    pub salt: Vec<u8>,

    pub timestamp: Timestamp,
    pub delegated: bool,
}

type VoterKey = [u8; 32];

/// Records votes exactly once per (election, voter), keeps live tallies, and
/// accepts relayer-submitted ballots signed by the voter.
///
/// The owner is fixed at construction, as is the signing domain; both are the
/// one-time initialization of the store. The registry reference may be
/// attached at construction time or swapped later by the owner.
pub struct BallotStore {
    owner: PublicKey,
    domain: SigningDomain,
    registry: Option<(Address, Arc<dyn ElectionLookup>)>,
    paused: bool,
    votes: BTreeMap<(ElectionId, VoterKey), VoteRecord>,
    tallies: BTreeMap<(ElectionId, u32), u64>,
    nonces: BTreeMap<VoterKey, u64>,
    clock: Arc<dyn Clock>,
    events: Vec<Event>,
}

impl BallotStore {
    pub fn new(owner: PublicKey, chain_id: u64, clock: Arc<dyn Clock>) -> Self {
        BallotStore {
            owner,
            domain: SigningDomain::new(chain_id, Address::random()),
            registry: None,
            paused: false,
            votes: BTreeMap::new(),
            tallies: BTreeMap::new(),
            nonces: BTreeMap::new(),
            clock,
            events: Vec::new(),
        }
    }

    /// Attach a registry at construction time.
    pub fn with_registry(
        mut self,
        registry_address: Address,
        lookup: Arc<dyn ElectionLookup>,
    ) -> Self {
        self.registry = Some((registry_address, lookup));
        self
    }

    /// Cast a vote directly as the voter.
    pub fn vote(
        &mut self,
        voter: &PublicKey,
        election_id: ElectionId,
        candidate_id: u32,
    ) -> Result<(), ValidationError> {
        let now = self.clock.now();
        let view = self.votable_view(election_id, now)?;
        if self.votes.contains_key(&(election_id, *voter.as_bytes())) {
            return Err(ValidationError::AlreadyVoted(election_id));
        }
        if candidate_id >= view.candidate_count {
            return Err(ValidationError::InvalidCandidate(candidate_id, election_id));
        }

        self.record_vote(*voter, election_id, candidate_id, now, false);
        Ok(())
    }

    /// Redeem a ballot pre-signed by the voter, submitted by `relayer`.
    ///
    /// The nonce must equal the voter's current stored nonce exactly, so a
    /// voter's payloads are redeemable only in the order they were numbered,
    /// and each exactly once.
    pub fn vote_with_signature(
        &mut self,
        relayer: &PublicKey,
        vote_data: &VoteData,
        signature: &Signature,
    ) -> Result<(), ValidationError> {
        let now = self.clock.now();
        let view = self.votable_view(vote_data.election_id, now)?;
        let voter_key = *vote_data.voter.as_bytes();
        if self.votes.contains_key(&(vote_data.election_id, voter_key)) {
            return Err(ValidationError::AlreadyVoted(vote_data.election_id));
        }
        if vote_data.candidate_id >= view.candidate_count {
            return Err(ValidationError::InvalidCandidate(
                vote_data.candidate_id,
                vote_data.election_id,
            ));
        }
        if now > vote_data.deadline {
            return Err(ValidationError::SignatureExpired);
        }
        let expected = self.nonces.get(&voter_key).copied().unwrap_or(0);
        if vote_data.nonce != expected {
            return Err(ValidationError::InvalidNonce(expected, vote_data.nonce));
        }
        if let Err(err) = vote_data.verify(&self.domain, signature) {
            warn!(
                "store: rejected delegated vote for election {}: {}",
                vote_data.election_id, err
            );
            return Err(err);
        }

        // Consume the nonce before anything else is written
        self.nonces.insert(voter_key, expected + 1);
        self.events.push(Event::MetaTransactionExecuted {
            voter: vote_data.voter,
            relayer: *relayer,
            election_id: vote_data.election_id,
            nonce_consumed: vote_data.nonce,
        });

        self.record_vote(
            vote_data.voter,
            vote_data.election_id,
            vote_data.candidate_id,
            now,
            true,
        );
        Ok(())
    }

    /// Redeem a [`SignedBallot`] as it arrived off the wire.
    pub fn submit(
        &mut self,
        relayer: &PublicKey,
        ballot: &SignedBallot,
    ) -> Result<(), ValidationError> {
        self.vote_with_signature(relayer, &ballot.vote, &ballot.signature)
    }

    /// Swap the registry reference. Owner only.
    pub fn set_election_factory(
        &mut self,
        caller: &PublicKey,
        registry_address: Address,
        lookup: Arc<dyn ElectionLookup>,
    ) -> Result<(), ValidationError> {
        if caller != &self.owner {
            return Err(ValidationError::NotOwner);
        }
        if registry_address.is_zero() {
            return Err(ValidationError::InvalidFactoryAddress);
        }

        let old_registry = self.registry.as_ref().map(|(address, _)| *address);
        self.registry = Some((registry_address, lookup));
        info!("store: election factory set to {}", registry_address);
        self.events.push(Event::ElectionFactoryUpdated {
            old_registry,
            new_registry: registry_address,
            changed_by: *caller,
        });
        Ok(())
    }

    /// Stop accepting vote submissions. Owner only.
    pub fn pause(&mut self, caller: &PublicKey) -> Result<(), ValidationError> {
        if caller != &self.owner {
            return Err(ValidationError::NotOwner);
        }
        self.paused = true;
        info!("store: paused");
        Ok(())
    }

    /// Resume accepting vote submissions. Owner only.
    pub fn unpause(&mut self, caller: &PublicKey) -> Result<(), ValidationError> {
        if caller != &self.owner {
            return Err(ValidationError::NotOwner);
        }
        self.paused = false;
        info!("store: unpaused");
        Ok(())
    }

    pub fn has_voted(&self, election_id: ElectionId, voter: &PublicKey) -> bool {
        self.votes.contains_key(&(election_id, *voter.as_bytes()))
    }

    pub fn vote_record(&self, election_id: ElectionId, voter: &PublicKey) -> Option<&VoteRecord> {
        self.votes.get(&(election_id, *voter.as_bytes()))
    }

    pub fn vote_hash(&self, election_id: ElectionId, voter: &PublicKey) -> Option<&[u8]> {
        self.vote_record(election_id, voter)
            .map(|record| record.vote_hash.as_slice())
    }

    pub fn vote_salt(&self, election_id: ElectionId, voter: &PublicKey) -> Option<&[u8]> {
        self.vote_record(election_id, voter)
            .map(|record| record.salt.as_slice())
    }

    pub fn vote_timestamp(&self, election_id: ElectionId, voter: &PublicKey) -> Option<Timestamp> {
        self.vote_record(election_id, voter)
            .map(|record| record.timestamp)
    }

    pub fn vote_count(&self, election_id: ElectionId, candidate_id: u32) -> u64 {
        self.tallies
            .get(&(election_id, candidate_id))
            .copied()
            .unwrap_or(0)
    }

    /// Tallies for every candidate of an election, in candidate-index order.
    pub fn all_vote_counts(&self, election_id: ElectionId) -> Result<Vec<u64>, ValidationError> {
        let (_, lookup) = self
            .registry
            .as_ref()
            .ok_or(ValidationError::ElectionFactoryNotSet)?;
        let view = lookup.election_view(election_id)?;
        Ok((0..view.candidate_count)
            .map(|candidate_id| self.vote_count(election_id, candidate_id))
            .collect())
    }

    /// Recompute the hash from the stored salt and timestamp with the
    /// supplied candidate and compare it against the stored hash.
    ///
    /// `false` means either no vote was recorded or the voter voted for a
    /// different candidate than `candidate_id`.
    pub fn verify_vote_hash(
        &self,
        election_id: ElectionId,
        voter: &PublicKey,
        candidate_id: u32,
    ) -> bool {
        match self.votes.get(&(election_id, *voter.as_bytes())) {
            Some(record) => {
                let recomputed =
                    vote_hash(voter, candidate_id, election_id, record.timestamp, &record.salt);
                recomputed == record.vote_hash
            }
            None => false,
        }
    }

    /// Next nonce expected from this voter. Starts at 0.
    pub fn nonce(&self, voter: &PublicKey) -> u64 {
        self.nonces.get(voter.as_bytes()).copied().unwrap_or(0)
    }

    pub fn registry_address(&self) -> Option<Address> {
        self.registry.as_ref().map(|(address, _)| *address)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn owner(&self) -> &PublicKey {
        &self.owner
    }

    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    pub fn store_address(&self) -> Address {
        self.domain.store_address
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Shared precondition checks for both submission paths, in order:
    /// paused, factory configured, election found, election votable.
    fn votable_view(
        &self,
        election_id: ElectionId,
        now: Timestamp,
    ) -> Result<ElectionView, ValidationError> {
        if self.paused {
            return Err(ValidationError::VotingPaused);
        }
        let (_, lookup) = self
            .registry
            .as_ref()
            .ok_or(ValidationError::ElectionFactoryNotSet)?;
        let view = lookup.election_view(election_id)?;
        if !view.is_votable_at(now) {
            return Err(ValidationError::ElectionNotActive(election_id));
        }
        Ok(view)
    }

    /// All preconditions passed - write the record, bump the tally, emit.
    fn record_vote(
        &mut self,
        voter: PublicKey,
        election_id: ElectionId,
        candidate_id: u32,
        now: Timestamp,
        delegated: bool,
    ) {
        let salt = random_salt();
        let hash = vote_hash(&voter, candidate_id, election_id, now, &salt);

        self.votes.insert(
            (election_id, *voter.as_bytes()),
            VoteRecord {
                vote_hash: hash.clone(),
                salt: salt.to_vec(),
                timestamp: now,
                delegated,
            },
        );
        let count = self.tallies.entry((election_id, candidate_id)).or_insert(0);
        *count += 1;
        let new_count = *count;

        debug!(
            "store: vote recorded for election {} candidate {} (delegated: {})",
            election_id, candidate_id, delegated
        );
        self.events.push(Event::VoteCast {
            voter,
            election_id,
            candidate_id,
            vote_hash: hash,
            timestamp: now,
            is_delegated: delegated,
        });
        self.events.push(Event::VoteCountUpdated {
            election_id,
            candidate_id,
            new_count,
        });
    }
}

/// SHA-256 over the fixed field sequence (voter, candidate, election,
/// timestamp, salt).
fn vote_hash(
    voter: &PublicKey,
    candidate_id: u32,
    election_id: ElectionId,
    timestamp: Timestamp,
    salt: &[u8],
) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(voter.as_bytes());
    hasher.update(candidate_id.to_be_bytes());
    hasher.update(election_id.to_be_bytes());
    hasher.update(timestamp.to_be_bytes());
    hasher.update(salt);
    hasher.finalize().to_vec()
}

fn random_salt() -> [u8; 32] {
    let mut csprng = rand::rngs::OsRng {};
    csprng.gen()
}
