use crate::*;
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryInto;
use std::str::FromStr;

/// Opaque identity of a registry or store instance.
///
/// Stands in for the contract address in events and in the signing domain; the
/// all-zero address is reserved as "unset" and rejected wherever an address is
/// being recorded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Generate a fresh address from the OS CSPRNG
    pub fn random() -> Self {
        let mut csprng = rand::rngs::OsRng {};
        Address(csprng.gen())
    }

    pub fn zero() -> Self {
        Address([0; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::AddressBadHex)?;
        if bytes.len() != 32 {
            return Err(Error::AddressBadLen);
        }

        // This unwrap is OK - we know the length is valid
        let bytes: [u8; 32] = bytes.try_into().unwrap();
        Ok(Address(bytes))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        std::str::FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address() {
        let address = Address::random();
        assert!(!address.is_zero());

        let stringed = address.to_string();
        let from_string = Address::from_str(&stringed).unwrap();
        assert_eq!(address, from_string);

        assert!(Address::from_str("not hex").is_err());
        assert!(Address::from_str("deadbeef").is_err());
        assert!(Address::zero().is_zero());
    }
}
