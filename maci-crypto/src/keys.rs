//! Baby Jubjub key operations: key generation, ECDH, and the Schnorr-style
//! signature scheme used to authenticate commands.

use crate::hashing::hash5;
use crate::{CurvePoint, Field, Scalar};

use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BigInteger, PrimeField};
use ark_std::UniformRand;
use sha2::{Digest, Sha256};

/// A signature over a single field element: a curve point commitment and a
/// response scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub r8: (Field, Field),
    pub s: Scalar,
}

/// Samples a fresh private key.
pub fn gen_private_key() -> Scalar {
    Scalar::rand(&mut rand::thread_rng())
}

/// Derives the public key corresponding to a private key.
pub fn derive_public_key(private_key: &Scalar) -> CurvePoint {
    CurvePoint::generator()
        .mul_bigint(private_key.into_bigint())
        .into_affine()
}

/// Derives the ECDH shared secret between a private key and a foreign
/// public key, as the coordinates of the shared point.
pub fn ecdh_shared_key(private_key: &Scalar, public_key: &CurvePoint) -> (Field, Field) {
    let shared = public_key.mul_bigint(private_key.into_bigint()).into_affine();
    (shared.x, shared.y)
}

/// The signature challenge binds the commitment, the signer's public key
/// and the message, then maps into the scalar field.
fn challenge(r8: &(Field, Field), public_key: &CurvePoint, message: Field) -> Scalar {
    let e = hash5(&[r8.0, r8.1, public_key.x, public_key.y, message]);
    Scalar::from_le_bytes_mod_order(&e.into_bigint().to_bytes_le())
}

/// Signs a message (a single field element, typically a command hash).
///
/// The nonce is derived deterministically from the private key and the
/// message, so signing never consumes ambient randomness.
pub fn sign(private_key: &Scalar, message: Field) -> Signature {
    let mut hasher = Sha256::new();
    hasher.update(private_key.into_bigint().to_bytes_le());
    hasher.update(message.into_bigint().to_bytes_le());
    let nonce = Scalar::from_le_bytes_mod_order(&hasher.finalize());

    let commitment = CurvePoint::generator().mul_bigint(nonce.into_bigint()).into_affine();
    let r8 = (commitment.x, commitment.y);

    let public_key = derive_public_key(private_key);
    let s = nonce + challenge(&r8, &public_key, message) * private_key;

    Signature { r8, s }
}

/// Verifies a signature against a message and a public key. Returns `false`
/// for malformed commitments rather than erroring, since invalid signatures
/// are an expected input class.
pub fn verify_signature(message: Field, signature: &Signature, public_key: &CurvePoint) -> bool {
    let commitment = CurvePoint::new_unchecked(signature.r8.0, signature.r8.1);
    if !commitment.is_on_curve() || !commitment.is_in_correct_subgroup_assuming_on_curve() {
        return false;
    }

    let e = challenge(&signature.r8, public_key, message);
    let lhs = CurvePoint::generator().mul_bigint(signature.s.into_bigint());
    let rhs = commitment.into_group() + public_key.mul_bigint(e.into_bigint());

    lhs == rhs
}
