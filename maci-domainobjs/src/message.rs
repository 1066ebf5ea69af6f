//! The on-chain message format: an opaque 10-word payload tagged with its
//! kind. For vote messages the payload is the command ciphertext; for
//! top-up messages only the first two words carry data.

use crate::keypair::PublicKey;

use maci_crypto::hashing::hash5;
use maci_crypto::serde_utils::{field_to_decimal, FieldStr};
use maci_crypto::Field;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::serde_as;

/// Fixed payload width of every message.
pub const MESSAGE_DATA_LENGTH: usize = 10;

/// Which state machine a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// An encrypted vote (or key-change) command.
    Vote,
    /// A plaintext voice credit top-up.
    Topup,
}

impl MessageKind {
    #[inline]
    pub fn to_field(self) -> Field {
        match self {
            MessageKind::Vote => Field::from(1u64),
            MessageKind::Topup => Field::from(2u64),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            MessageKind::Vote => "1",
            MessageKind::Topup => "2",
        }
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match String::deserialize(deserializer)?.as_str() {
            "1" => Ok(MessageKind::Vote),
            "2" => Ok(MessageKind::Topup),
            other => Err(D::Error::custom(format!("unknown message kind: {}", other))),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub kind: MessageKind,
    #[serde_as(as = "[FieldStr; 10]")]
    pub data: [Field; MESSAGE_DATA_LENGTH],
}

impl Message {
    pub fn new(kind: MessageKind, data: [Field; MESSAGE_DATA_LENGTH]) -> Self {
        Self { kind, data }
    }

    pub fn as_array(&self) -> [Field; MESSAGE_DATA_LENGTH + 1] {
        let mut out = [Field::from(0u64); MESSAGE_DATA_LENGTH + 1];
        out[0] = self.kind.to_field();
        out[1..].copy_from_slice(&self.data);
        out
    }

    pub fn as_circuit_inputs(&self) -> Vec<String> {
        self.as_array().iter().map(field_to_decimal).collect()
    }

    /// The message leaf hash. The payload is compressed in two halves, then
    /// bound to the kind and the ephemeral encryption key.
    pub fn hash(&self, enc_public_key: &PublicKey) -> Field {
        hash5(&[
            self.kind.to_field(),
            hash5(&self.data[..5]),
            hash5(&self.data[5..]),
            enc_public_key.x(),
            enc_public_key.y(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::Keypair;

    fn data(seed: u64) -> [Field; MESSAGE_DATA_LENGTH] {
        let mut out = [Field::from(0u64); MESSAGE_DATA_LENGTH];
        for (i, word) in out.iter_mut().enumerate() {
            *word = Field::from(seed + i as u64);
        }
        out
    }

    #[test]
    fn test_as_array_prepends_kind() {
        let message = Message::new(MessageKind::Topup, data(3));
        let array = message.as_array();
        assert_eq!(array.len(), 11);
        assert_eq!(array[0], Field::from(2u64));
        assert_eq!(&array[1..], &message.data);
    }

    #[test]
    fn test_hash_binds_kind_and_enc_key() {
        let keypair = Keypair::new();
        let vote = Message::new(MessageKind::Vote, data(1));
        let topup = Message::new(MessageKind::Topup, data(1));
        assert_ne!(vote.hash(keypair.public_key()), topup.hash(keypair.public_key()));

        let other = Keypair::new();
        assert_ne!(vote.hash(keypair.public_key()), vote.hash(other.public_key()));
    }

    #[test]
    fn test_json_round_trip() {
        let message = Message::new(MessageKind::Vote, data(9));
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }
}
