use crate::*;
use ed25519_dalek::PublicKey;

/// Append-only log entries emitted by the registry and the ballot store.
///
/// Internally tagged so external consumers get self-describing JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Event {
    ElectionCreated {
        org_id: OrgId,
        election_id: ElectionId,
        name: String,
        #[serde(with = "EdPublicKeyHex")]
        creator: PublicKey,
        start_time: Timestamp,
        end_time: Timestamp,
    },
    OrgAdminAdded {
        org_id: OrgId,
        #[serde(with = "EdPublicKeyHex")]
        admin: PublicKey,
        #[serde(with = "EdPublicKeyHex")]
        added_by: PublicKey,
    },
    OrgAdminRemoved {
        org_id: OrgId,
        #[serde(with = "EdPublicKeyHex")]
        admin: PublicKey,
        #[serde(with = "EdPublicKeyHex")]
        removed_by: PublicKey,
    },
    ElectionStatusChanged {
        election_id: ElectionId,
        is_active: bool,
        #[serde(with = "EdPublicKeyHex")]
        changed_by: PublicKey,
    },
    VoteCast {
        #[serde(with = "EdPublicKeyHex")]
        voter: PublicKey,
        election_id: ElectionId,
        candidate_id: u32,
        #[serde(with = "hex_serde")]
        vote_hash: Vec<u8>,
        timestamp: Timestamp,
        is_delegated: bool,
    },
    VoteCountUpdated {
        election_id: ElectionId,
        candidate_id: u32,
        new_count: u64,
    },
    MetaTransactionExecuted {
        #[serde(with = "EdPublicKeyHex")]
        voter: PublicKey,
        #[serde(with = "EdPublicKeyHex")]
        relayer: PublicKey,
        election_id: ElectionId,
        nonce_consumed: u64,
    },
    ElectionFactoryUpdated {
        old_registry: Option<Address>,
        new_registry: Address,
        #[serde(with = "EdPublicKeyHex")]
        changed_by: PublicKey,
    },
}
