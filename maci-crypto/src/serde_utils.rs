//! Serde adapters for field elements.
//!
//! Snapshots serialize every field element as a decimal string, matching
//! the wire format the rest of the protocol stack consumes. The adapters
//! also double as validated decimal parsers: values at or above the field
//! modulus are rejected instead of silently reduced.

use crate::{CryptoError, Field};

use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use serde_with::{DeserializeAs, SerializeAs};

/// Renders a prime field element as a decimal string.
pub fn prime_to_decimal<F: PrimeField>(value: &F) -> String {
    BigUint::from_bytes_le(&value.into_bigint().to_bytes_le()).to_str_radix(10)
}

/// Parses a decimal string into a prime field element, rejecting values
/// outside the canonical range.
pub fn prime_from_decimal<F: PrimeField>(s: &str) -> Result<F, CryptoError> {
    let value: BigUint = s.parse().map_err(|_| CryptoError::NotInField(s.to_string()))?;
    let modulus = BigUint::from_bytes_le(&F::MODULUS.to_bytes_le());
    if value >= modulus {
        return Err(CryptoError::NotInField(s.to_string()));
    }
    Ok(F::from_le_bytes_mod_order(&value.to_bytes_le()))
}

/// Shorthand for the SNARK field.
#[inline]
pub fn field_to_decimal(value: &Field) -> String {
    prime_to_decimal(value)
}

/// Shorthand for the SNARK field.
#[inline]
pub fn field_from_decimal(s: &str) -> Result<Field, CryptoError> {
    prime_from_decimal(s)
}

/// A `serde_with` adapter serializing any prime field element as a decimal
/// string. Usable as `#[serde_as(as = "FieldStr")]`, including nested in
/// `Vec` and `BTreeMap` positions.
pub struct FieldStr;

impl<F: PrimeField> SerializeAs<F> for FieldStr {
    fn serialize_as<S>(source: &F, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&prime_to_decimal(source))
    }
}

impl<'de, F: PrimeField> DeserializeAs<'de, F> for FieldStr {
    fn deserialize_as<D>(deserializer: D) -> Result<F, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        prime_from_decimal(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SNARK_FIELD_SIZE_DEC;

    #[test]
    fn test_decimal_round_trip() {
        let value = Field::from(123456789u64);
        let s = field_to_decimal(&value);
        assert_eq!(s, "123456789");
        assert_eq!(field_from_decimal(&s).unwrap(), value);
    }

    #[test]
    fn test_rejects_values_at_or_above_modulus() {
        assert!(field_from_decimal(SNARK_FIELD_SIZE_DEC).is_err());
        assert!(field_from_decimal("not a number").is_err());
    }

    #[test]
    fn test_zero_and_max() {
        assert_eq!(field_from_decimal("0").unwrap(), Field::from(0u64));
        let max = "21888242871839275222246405745257275088548364400416034343698204186575808495616";
        assert!(field_from_decimal(max).is_ok());
    }
}
