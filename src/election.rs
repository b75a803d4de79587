use crate::*;
use ed25519_dalek::PublicKey;

pub type OrgId = u64;

/// Sequential, assigned by the registry starting at 1.
pub type ElectionId = u64;

/// A registered election.
///
/// Immutable after creation except for the `active` flag, which only the
/// platform admin may toggle. The candidate list is fixed; votes reference
/// candidates by index into it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Election {
    pub id: ElectionId,
    pub org_id: OrgId,
    pub name: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub active: bool,
    pub candidates: Vec<String>,

    #[serde(with = "EdPublicKeyHex")]
    pub creator: PublicKey,
    pub created_at: Timestamp,
}

impl Election {
    /// Votable means the admin flag is set and `now` falls inside the voting
    /// window. Both boundaries are inclusive.
    pub fn is_votable_at(&self, now: Timestamp) -> bool {
        self.active && self.start_time <= now && now <= self.end_time
    }

    pub fn view(&self) -> ElectionView {
        ElectionView {
            id: self.id,
            org_id: self.org_id,
            active: self.active,
            start_time: self.start_time,
            end_time: self.end_time,
            candidate_count: self.candidates.len() as u32,
        }
    }
}

/// Snapshot of the election state a vote is validated against.
///
/// The ballot store reads one of these per vote through the lookup port, so
/// the active flag, window and candidate count all come from the same read.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct ElectionView {
    pub id: ElectionId,
    pub org_id: OrgId,
    pub active: bool,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub candidate_count: u32,
}

impl ElectionView {
    pub fn is_votable_at(&self, now: Timestamp) -> bool {
        self.active && self.start_time <= now && now <= self.end_time
    }
}
