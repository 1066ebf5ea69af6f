//! Baby Jubjub keypairs with the `macisk.` / `macipk.` serialization
//! format. Only the public half of a keypair round-trips through JSON by
//! default; private keys are serialized explicitly and only where the
//! caller asks for them.

use maci_crypto::hashing::hash2;
use maci_crypto::keys::{derive_public_key, ecdh_shared_key, gen_private_key};
use maci_crypto::serde_utils::{prime_from_decimal, prime_to_decimal};
use maci_crypto::{CryptoError, CurvePoint, EcdhSharedKey, Field, Scalar};

use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const PRIVATE_KEY_PREFIX: &str = "macisk.";
const PUBLIC_KEY_PREFIX: &str = "macipk.";

fn field_to_le_hex<F: PrimeField>(value: &F) -> String {
    hex::encode(value.into_bigint().to_bytes_le())
}

fn field_from_le_hex<F: PrimeField>(s: &str) -> Result<F, CryptoError> {
    let bytes = hex::decode(s).map_err(|_| CryptoError::MalformedKey(s.to_string()))?;
    let value = BigUint::from_bytes_le(&bytes);
    prime_from_decimal(&value.to_str_radix(10))
}

/// A voter's or coordinator's private key: a Baby Jubjub scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey(Scalar);

impl PrivateKey {
    /// Samples a fresh private key.
    pub fn new() -> Self {
        Self(gen_private_key())
    }

    pub fn from_scalar(scalar: Scalar) -> Self {
        Self(scalar)
    }

    #[inline]
    pub fn scalar(&self) -> &Scalar {
        &self.0
    }

    /// The private key as a circuit input.
    pub fn as_circuit_input(&self) -> String {
        prime_to_decimal(&self.0)
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PRIVATE_KEY_PREFIX, field_to_le_hex(&self.0))
    }
}

impl FromStr for PrivateKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(PRIVATE_KEY_PREFIX)
            .ok_or_else(|| CryptoError::MalformedKey(s.to_string()))?;
        Ok(Self(field_from_le_hex(body)?))
    }
}

impl Serialize for PrivateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A public key: a point on Baby Jubjub, stored affine so its coordinates
/// can feed hashes and circuit inputs directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(CurvePoint);

static PADDING_KEY: Lazy<PublicKey> = Lazy::new(|| {
    let (x, y) = maci_crypto::padding_public_key_coords();
    PublicKey::from_coords(x, y).expect("padding key is a valid curve point")
});

impl PublicKey {
    pub fn from_point(point: CurvePoint) -> Self {
        Self(point)
    }

    /// Builds a public key from affine coordinates, rejecting points that
    /// are not on the curve or not in the prime-order subgroup.
    pub fn from_coords(x: Field, y: Field) -> Result<Self, CryptoError> {
        let point = CurvePoint::new_unchecked(x, y);
        if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
            return Err(CryptoError::NotOnCurve(
                prime_to_decimal(&x),
                prime_to_decimal(&y),
            ));
        }
        Ok(Self(point))
    }

    /// The reserved padding key. Nobody knows its private key; it backs
    /// the blank state leaf and stands in for the ephemeral key of top-up
    /// messages.
    pub fn padding_key() -> Self {
        *PADDING_KEY
    }

    #[inline]
    pub fn point(&self) -> &CurvePoint {
        &self.0
    }

    #[inline]
    pub fn x(&self) -> Field {
        self.0.x
    }

    #[inline]
    pub fn y(&self) -> Field {
        self.0.y
    }

    pub fn as_array(&self) -> [Field; 2] {
        [self.0.x, self.0.y]
    }

    pub fn as_circuit_inputs(&self) -> Vec<Field> {
        self.as_array().to_vec()
    }

    pub fn hash(&self) -> Field {
        hash2(&self.as_array())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            PUBLIC_KEY_PREFIX,
            field_to_le_hex(&self.0.x),
            field_to_le_hex(&self.0.y)
        )
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(PUBLIC_KEY_PREFIX)
            .ok_or_else(|| CryptoError::MalformedKey(s.to_string()))?;
        if body.len() != 128 {
            return Err(CryptoError::MalformedKey(s.to_string()));
        }
        let x = field_from_le_hex(&body[..64])?;
        let y = field_from_le_hex(&body[64..])?;
        Self::from_coords(x, y)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A private key together with its derived public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypair {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl Keypair {
    /// Generates a fresh keypair.
    pub fn new() -> Self {
        Self::from_private_key(PrivateKey::new())
    }

    pub fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = PublicKey::from_point(derive_public_key(private_key.scalar()));
        Self { private_key, public_key }
    }

    #[inline]
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    #[inline]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Derives the ECDH shared key between one party's private key and the
    /// other's public key.
    pub fn gen_ecdh_shared_key(private_key: &PrivateKey, public_key: &PublicKey) -> EcdhSharedKey {
        ecdh_shared_key(private_key.scalar(), public_key.point())
    }
}

impl Default for Keypair {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_key_serialization_round_trip() {
        let key = PrivateKey::new();
        let s = key.to_string();
        assert!(s.starts_with("macisk."));
        assert_eq!(s.parse::<PrivateKey>().unwrap(), key);
    }

    #[test]
    fn test_public_key_serialization_round_trip() {
        let keypair = Keypair::new();
        let s = keypair.public_key().to_string();
        assert!(s.starts_with("macipk."));
        assert_eq!(s.parse::<PublicKey>().unwrap(), *keypair.public_key());
    }

    #[test]
    fn test_public_key_rejects_offcurve_coords() {
        assert!(PublicKey::from_coords(Field::from(1u64), Field::from(1u64)).is_err());
    }

    #[test]
    fn test_padding_key_is_stable() {
        assert_eq!(PublicKey::padding_key(), PublicKey::padding_key());
        let (x, y) = maci_crypto::padding_public_key_coords();
        assert_eq!(PublicKey::padding_key().x(), x);
        assert_eq!(PublicKey::padding_key().y(), y);
    }

    #[test]
    fn test_shared_key_is_symmetric() {
        let a = Keypair::new();
        let b = Keypair::new();
        assert_eq!(
            Keypair::gen_ecdh_shared_key(a.private_key(), b.public_key()),
            Keypair::gen_ecdh_shared_key(b.private_key(), a.public_key()),
        );
    }

    #[test]
    fn test_json_round_trip() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(keypair.public_key()).unwrap();
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, *keypair.public_key());
    }
}
