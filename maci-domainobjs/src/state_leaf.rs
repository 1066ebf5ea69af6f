//! A signed-up participant's entry in the global state tree.

use crate::keypair::PublicKey;

use maci_crypto::hashing::hash4;
use maci_crypto::serde_utils::field_to_decimal;
use maci_crypto::Field;

use serde::{Deserialize, Serialize};

/// One leaf of the state tree: who may vote, with how many credits, since
/// when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateLeaf {
    pub public_key: PublicKey,
    #[serde(with = "serde_u128_string")]
    pub voice_credit_balance: u128,
    pub timestamp: u64,
}

impl StateLeaf {
    pub fn new(public_key: PublicKey, voice_credit_balance: u128, timestamp: u64) -> Self {
        Self { public_key, voice_credit_balance, timestamp }
    }

    /// The blank leaf: the padding public key with zero credits. Index 0 of
    /// the state tree always holds this leaf, and trees are zero-padded
    /// with its hash.
    pub fn blank() -> Self {
        Self::new(PublicKey::padding_key(), 0, 0)
    }

    pub fn as_array(&self) -> [Field; 4] {
        [
            self.public_key.x(),
            self.public_key.y(),
            Field::from(self.voice_credit_balance),
            Field::from(self.timestamp),
        ]
    }

    pub fn as_circuit_inputs(&self) -> Vec<String> {
        self.as_array().iter().map(field_to_decimal).collect()
    }

    pub fn hash(&self) -> Field {
        hash4(&self.as_array())
    }
}

mod serde_u128_string {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
