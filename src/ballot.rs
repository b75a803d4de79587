use crate::*;
use ed25519_dalek::ExpandedSecretKey;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use ed25519_dalek::Signature;

/// Scheme name baked into every signing envelope.
pub const SIGNING_NAME: &str = "ballotbox";

/// Scheme version baked into every signing envelope.
pub const SIGNING_VERSION: &str = "1";

/// Context a ballot signature is bound to.
///
/// Including the chain id and the store address in the signed bytes means a
/// signature redeemed against one store can never be replayed against another
/// store or on another chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SigningDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub store_address: Address,
}

impl SigningDomain {
    pub fn new(chain_id: u64, store_address: Address) -> Self {
        SigningDomain {
            name: SIGNING_NAME.to_string(),
            version: SIGNING_VERSION.to_string(),
            chain_id,
            store_address,
        }
    }
}

/// A vote payload signed off-line by the voter and submitted by a relayer.
///
/// Field order is part of the signing format and must not change.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VoteData {
    #[serde(with = "EdPublicKeyHex")]
    pub voter: PublicKey,
    pub election_id: ElectionId,
    pub candidate_id: u32,

    /// Must equal the voter's current stored nonce exactly.
    pub nonce: u64,

    /// Last timestamp (inclusive) at which the payload may be redeemed.
    pub deadline: Timestamp,
}

#[derive(Serialize)]
struct SigningEnvelope<'a> {
    domain: &'a SigningDomain,
    vote: &'a VoteData,
}

/// The canonical bytes a voter signs: CBOR of the domain followed by the
/// vote payload.
pub fn signing_bytes(domain: &SigningDomain, vote: &VoteData) -> Result<Vec<u8>, Error> {
    let envelope = SigningEnvelope { domain, vote };
    Ok(serde_cbor::to_vec(&envelope)?)
}

impl VoteData {
    /// Sign this payload with the voter's secret key.
    ///
    /// The key must match `self.voter`.
    pub fn sign(&self, domain: &SigningDomain, secret: &SecretKey) -> Result<Signature, Error> {
        let public = PublicKey::from(secret);
        if public != self.voter {
            return Err(Error::MismatchedPublicKeys);
        }

        let serialized = signing_bytes(domain, self)?;
        let expanded: ExpandedSecretKey = secret.into();
        Ok(expanded.sign(&serialized, &public))
    }

    /// Verify that `signature` was produced by `self.voter` over this exact
    /// payload under `domain`.
    pub fn verify(
        &self,
        domain: &SigningDomain,
        signature: &Signature,
    ) -> Result<(), ValidationError> {
        let serialized =
            signing_bytes(domain, self).map_err(|_| ValidationError::InvalidSignature)?;
        self.voter
            .verify_strict(&serialized, signature)
            .map_err(|_| ValidationError::InvalidSignature)
    }
}

/// Wire form of a delegated vote as it travels from the voter to a relayer.
#[derive(Serialize, Deserialize, Clone)]
pub struct SignedBallot {
    pub vote: VoteData,

    #[serde(with = "EdSignatureHex")]
    pub signature: Signature,
}

impl SignedBallot {
    pub fn new(vote: VoteData, domain: &SigningDomain, secret: &SecretKey) -> Result<Self, Error> {
        let signature = vote.sign(domain, secret)?;
        Ok(SignedBallot { vote, signature })
    }

    /// Pack into bytes
    pub fn as_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).expect("ballotbox: Unexpected error packing ballot")
    }

    /// Unpack from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // If it starts with `{` then it's JSON
        if bytes.first() == Some(&b'{') {
            Ok(serde_json::from_slice(bytes)?)
        } else {
            Ok(serde_cbor::from_slice(bytes)?)
        }
    }
}
