use crate::*;

use thiserror::Error;

/// Operational error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("ballotbox: signature error: {0}")]
    SignatureError(#[from] ed25519_dalek::SignatureError),

    #[error("ballotbox: mismatched public keys")]
    MismatchedPublicKeys,

    #[error("ballotbox: invalid address - invalid hexadecimal")]
    AddressBadHex,

    #[error("ballotbox: invalid address - wrong length")]
    AddressBadLen,

    #[error("ballotbox: CBOR error encoding ballot: {0}")]
    CBORSerialization(#[from] serde_cbor::Error),

    #[error("ballotbox: JSON error deserializing ballot: {0}")]
    JSONDeserialization(#[from] serde_json::Error),
}

/// Rejection conditions surfaced by the registry and the ballot store.
///
/// Every rejection leaves the system in its prior state, so all of these are
/// safe for the caller to retry with corrected input.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("ballotbox validation: caller is not the platform admin")]
    NotPlatformAdmin,

    #[error("ballotbox validation: caller is not an admin of organization {0}")]
    NotOrgAdmin(OrgId),

    #[error("ballotbox validation: caller is not the store owner")]
    NotOwner,

    #[error("ballotbox validation: admin identity is the zero key")]
    InvalidAdminAddress,

    #[error("ballotbox validation: election name is empty")]
    EmptyInput,

    #[error("ballotbox validation: election has no candidates")]
    NoCandidatesProvided,

    #[error("ballotbox validation: end time must be after start time")]
    InvalidTimeRange,

    #[error("ballotbox validation: start time must be in the future")]
    StartTimeMustBeInFuture,

    #[error("ballotbox validation: candidate {0} does not exist in election {1}")]
    InvalidCandidate(u32, ElectionId),

    #[error("ballotbox validation: factory address is the zero address")]
    InvalidFactoryAddress,

    #[error("ballotbox validation: already an admin of organization {0}")]
    AlreadyAnAdmin(OrgId),

    #[error("ballotbox validation: not an admin of organization {0}")]
    NotAnAdmin(OrgId),

    #[error("ballotbox validation: voter has already voted in election {0}")]
    AlreadyVoted(ElectionId),

    #[error("ballotbox validation: election {0} not found")]
    ElectionNotFound(ElectionId),

    #[error("ballotbox validation: election {0} is not active")]
    ElectionNotActive(ElectionId),

    #[error("ballotbox validation: no election factory configured")]
    ElectionFactoryNotSet,

    #[error("ballotbox validation: signature does not match voter")]
    InvalidSignature,

    #[error("ballotbox validation: signature deadline has passed")]
    SignatureExpired,

    #[error("ballotbox validation: invalid nonce: expected {0}, got {1}")]
    InvalidNonce(u64, u64),

    #[error("ballotbox validation: vote submissions are paused")]
    VotingPaused,
}
