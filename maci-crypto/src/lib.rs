//! Cryptographic building blocks for the MACI replica engine.
//!
//! Everything the state machine treats as opaque lives here: the SNARK
//! field type, the fixed-arity hashes used for Merkle nodes and
//! commitments, Baby Jubjub keys with ECDH / signatures / field-native
//! authenticated encryption, and the incremental quinary Merkle tree.

pub mod constants;
pub mod encryption;
pub mod errors;
pub mod hashing;
pub mod keys;
pub mod quintree;
pub mod serde_utils;

pub use constants::{nothing_up_my_sleeve, padding_public_key_coords, SNARK_FIELD_SIZE_DEC};
pub use encryption::{decrypt, encrypt, Ciphertext, EcdhSharedKey};
pub use errors::CryptoError;
pub use hashing::{
    gen_random_salt,
    gen_tree_commitment,
    hash2,
    hash3,
    hash4,
    hash5,
    hash_left_right,
    poseidon,
    sha256_hash,
};
pub use keys::{derive_public_key, ecdh_shared_key, gen_private_key, sign, verify_signature, Signature};
pub use quintree::{IncrementalQuinTree, MerkleProof};

/// The BN254 scalar field. Every value that crosses the circuit boundary is
/// an element of this field.
pub type Field = ark_bn254::Fr;

/// The Baby Jubjub scalar field, used for private keys and signature
/// scalars.
pub type Scalar = ark_ed_on_bn254::Fr;

/// A point on Baby Jubjub in affine form. Public keys and signature
/// commitments are such points; their coordinates live in [`Field`].
pub type CurvePoint = ark_ed_on_bn254::EdwardsAffine;
