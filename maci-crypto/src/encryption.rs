//! Field-native authenticated encryption keyed by an ECDH shared secret.
//!
//! Plaintext words are zero-padded to a multiple of the block width and
//! masked with a Poseidon keystream; a chained MAC word is appended. The
//! ciphertext for a 7-word command is therefore always 10 words, which is
//! the fixed message width the accumulator expects.

use crate::hashing::{hash2, hash3, hash4};
use crate::{CryptoError, Field};

/// The (x, y) coordinates of an ECDH shared point.
pub type EcdhSharedKey = (Field, Field);

/// An encrypted sequence of field elements, MAC word last.
pub type Ciphertext = Vec<Field>;

const BLOCK_WIDTH: usize = 3;

fn padded_len(length: usize) -> usize {
    ((length + BLOCK_WIDTH - 1) / BLOCK_WIDTH) * BLOCK_WIDTH
}

fn keystream_word(key: &EcdhSharedKey, nonce: Field, index: usize) -> Field {
    hash4(&[key.0, key.1, nonce, Field::from(index as u64)])
}

fn mac(key: &EcdhSharedKey, nonce: Field, words: &[Field]) -> Field {
    let mut acc = hash3(&[key.0, key.1, nonce]);
    for word in words {
        acc = hash2(&[acc, *word]);
    }
    acc
}

/// Encrypts `plaintext` under the shared key and nonce.
pub fn encrypt(plaintext: &[Field], key: &EcdhSharedKey, nonce: Field) -> Ciphertext {
    let mut padded = plaintext.to_vec();
    padded.resize(padded_len(plaintext.len()), Field::from(0u64));

    let mut ciphertext: Vec<Field> = padded
        .iter()
        .enumerate()
        .map(|(i, word)| *word + keystream_word(key, nonce, i))
        .collect();
    ciphertext.push(mac(key, nonce, &ciphertext));
    ciphertext
}

/// Decrypts a ciphertext produced by [`encrypt`], returning exactly
/// `length` plaintext words.
///
/// Fails with [`CryptoError::Decryption`] if the MAC does not match or the
/// padding words are nonzero, which is how a message encrypted under a
/// different shared key manifests.
pub fn decrypt(
    ciphertext: &[Field],
    key: &EcdhSharedKey,
    nonce: Field,
    length: usize,
) -> Result<Vec<Field>, CryptoError> {
    let expected = padded_len(length) + 1;
    if ciphertext.len() != expected {
        return Err(CryptoError::CiphertextLength(ciphertext.len(), expected));
    }

    let (body, tag) = ciphertext.split_at(ciphertext.len() - 1);
    if mac(key, nonce, body) != tag[0] {
        return Err(CryptoError::Decryption);
    }

    let plaintext: Vec<Field> = body
        .iter()
        .enumerate()
        .map(|(i, word)| *word - keystream_word(key, nonce, i))
        .collect();

    if plaintext[length..].iter().any(|word| *word != Field::from(0u64)) {
        return Err(CryptoError::Decryption);
    }

    Ok(plaintext[..length].to_vec())
}
