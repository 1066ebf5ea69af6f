//! Plaintext commands and their wire forms.
//!
//! A vote command packs its five 50-bit numeric fields into one 250-bit
//! word so the signed payload is only four field elements. The signed and
//! encrypted form is a [`Message`] of kind 1; top-up commands travel in the
//! clear as kind 2.

use crate::keypair::{PrivateKey, PublicKey};
use crate::message::{Message, MessageKind, MESSAGE_DATA_LENGTH};

use maci_crypto::hashing::hash4;
use maci_crypto::serde_utils::{field_to_decimal, prime_to_decimal, FieldStr};
use maci_crypto::{
    decrypt, encrypt, gen_random_salt, sign, verify_signature, CryptoError, EcdhSharedKey, Field,
    Scalar, Signature,
};

use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

/// Numeric command fields are constrained to 50 bits so five of them pack
/// into a single field element.
const PACKING_FIELD_BITS: u32 = 50;

fn packing_shift(bits: u32) -> Field {
    let mut shift = Field::from(1u64);
    let step = Field::from(1u64 << PACKING_FIELD_BITS);
    for _ in 0..bits / PACKING_FIELD_BITS {
        shift *= step;
    }
    shift
}

/// A vote (or key-change) command, before signing and encryption.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCommand {
    #[serde_as(as = "DisplayFromStr")]
    pub state_index: u64,
    #[serde(rename = "newPubKey")]
    pub new_public_key: PublicKey,
    #[serde_as(as = "DisplayFromStr")]
    pub vote_option_index: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub new_vote_weight: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub nonce: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub poll_id: u64,
    #[serde_as(as = "FieldStr")]
    pub salt: Field,
}

impl VoteCommand {
    /// Creates a command with a random salt.
    ///
    /// Panics if any numeric field exceeds 50 bits.
    pub fn new(
        state_index: u64,
        new_public_key: PublicKey,
        vote_option_index: u64,
        new_vote_weight: u64,
        nonce: u64,
        poll_id: u64,
    ) -> Self {
        Self::with_salt(
            state_index,
            new_public_key,
            vote_option_index,
            new_vote_weight,
            nonce,
            poll_id,
            gen_random_salt(),
        )
    }

    pub fn with_salt(
        state_index: u64,
        new_public_key: PublicKey,
        vote_option_index: u64,
        new_vote_weight: u64,
        nonce: u64,
        poll_id: u64,
        salt: Field,
    ) -> Self {
        let limit = 1u64 << PACKING_FIELD_BITS;
        assert!(state_index < limit);
        assert!(vote_option_index < limit);
        assert!(new_vote_weight < limit);
        assert!(nonce < limit);
        assert!(poll_id < limit);

        Self {
            state_index,
            new_public_key,
            vote_option_index,
            new_vote_weight,
            nonce,
            poll_id,
            salt,
        }
    }

    /// Packs the five numeric fields into one 250-bit word:
    /// bits 0..50 state index, 50..100 vote option index, 100..150 vote
    /// weight, 150..200 nonce, 200..250 poll id.
    pub fn packed(&self) -> Field {
        Field::from(self.state_index)
            + Field::from(self.vote_option_index) * packing_shift(50)
            + Field::from(self.new_vote_weight) * packing_shift(100)
            + Field::from(self.nonce) * packing_shift(150)
            + Field::from(self.poll_id) * packing_shift(200)
    }

    pub fn as_array(&self) -> [Field; 4] {
        [
            self.packed(),
            self.new_public_key.x(),
            self.new_public_key.y(),
            self.salt,
        ]
    }

    pub fn as_circuit_inputs(&self) -> Vec<String> {
        self.as_array().iter().map(field_to_decimal).collect()
    }

    pub fn hash(&self) -> Field {
        hash4(&self.as_array())
    }

    /// Signs the command hash.
    pub fn sign(&self, private_key: &PrivateKey) -> Signature {
        sign(private_key.scalar(), self.hash())
    }

    /// Checks a signature over the command hash.
    pub fn verify_signature(&self, signature: &Signature, public_key: &PublicKey) -> bool {
        verify_signature(self.hash(), signature, public_key.point())
    }

    /// Encrypts the command and its signature into a vote message.
    ///
    /// The plaintext is the 4-word command array followed by the signature
    /// commitment and response; the response scalar embeds losslessly since
    /// the Baby Jubjub scalar field is smaller than the SNARK field.
    pub fn encrypt(&self, signature: &Signature, shared_key: &EcdhSharedKey) -> Message {
        let mut plaintext = self.as_array().to_vec();
        plaintext.push(signature.r8.0);
        plaintext.push(signature.r8.1);
        plaintext.push(Field::from_le_bytes_mod_order(
            &signature.s.into_bigint().to_bytes_le(),
        ));

        let ciphertext = encrypt(&plaintext, shared_key, Field::from(0u64));
        let mut data = [Field::from(0u64); MESSAGE_DATA_LENGTH];
        data.copy_from_slice(&ciphertext);
        Message::new(MessageKind::Vote, data)
    }

    /// Decrypts a vote message back into a command and its signature.
    ///
    /// Fails if the MAC does not check out, the packed word carries bits
    /// beyond the five 50-bit fields, or the recovered public key is not a
    /// valid curve point.
    pub fn decrypt(
        message: &Message,
        shared_key: &EcdhSharedKey,
    ) -> Result<(Self, Signature), CryptoError> {
        let plaintext = decrypt(&message.data, shared_key, Field::from(0u64), 7)?;

        let packed = BigUint::from_bytes_le(&plaintext[0].into_bigint().to_bytes_le());
        if packed.bits() > 250 {
            return Err(CryptoError::NotInField(packed.to_str_radix(10)));
        }
        let mask = (BigUint::from(1u64) << PACKING_FIELD_BITS) - 1u64;
        let extract = |pos: u32| -> u64 {
            let chunk = (&packed >> pos) & &mask;
            chunk.to_u64_digits().first().copied().unwrap_or(0)
        };

        let new_public_key = PublicKey::from_coords(plaintext[1], plaintext[2])?;
        let command = Self::with_salt(
            extract(0),
            new_public_key,
            extract(50),
            extract(100),
            extract(150),
            extract(200),
            plaintext[3],
        );

        let signature = Signature {
            r8: (plaintext[4], plaintext[5]),
            s: Scalar::from_le_bytes_mod_order(&plaintext[6].into_bigint().to_bytes_le()),
        };

        Ok((command, signature))
    }
}

/// A plaintext voice credit top-up.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopupCommand {
    #[serde_as(as = "DisplayFromStr")]
    pub state_index: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub poll_id: u64,
}

impl TopupCommand {
    pub fn new(state_index: u64, amount: u128, poll_id: u64) -> Self {
        Self { state_index, amount, poll_id }
    }

    /// Renders the top-up as a message: the state index and amount occupy
    /// the first two payload words, the rest stay zero.
    pub fn to_message(&self) -> Message {
        let mut data = [Field::from(0u64); MESSAGE_DATA_LENGTH];
        data[0] = Field::from(self.state_index);
        data[1] = Field::from(self.amount);
        Message::new(MessageKind::Topup, data)
    }
}

/// Either kind of command, tagged the way messages are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmdType")]
pub enum Command {
    #[serde(rename = "1")]
    Vote(VoteCommand),
    #[serde(rename = "2")]
    Topup(TopupCommand),
}

impl Command {
    /// The command hash used for circuit inputs. Top-ups hash their message
    /// payload words.
    pub fn hash(&self) -> Field {
        match self {
            Command::Vote(command) => command.hash(),
            Command::Topup(command) => hash4(&[
                Field::from(command.state_index),
                Field::from(command.amount),
                Field::from(command.poll_id),
                Field::from(0u64),
            ]),
        }
    }

    pub fn as_circuit_inputs(&self) -> Vec<String> {
        match self {
            Command::Vote(command) => command.as_circuit_inputs(),
            Command::Topup(command) => vec![
                command.state_index.to_string(),
                command.amount.to_string(),
                command.poll_id.to_string(),
                prime_to_decimal(&Field::from(0u64)),
            ],
        }
    }
}
