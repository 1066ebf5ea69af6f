//! Fixed-arity Poseidon hashes and the EVM-style packed sha256 hash.
//!
//! The Poseidon instance is a rate-2 sponge over the BN254 scalar field
//! with Grain-LFSR generated round constants, shared by every arity; the
//! fixed-arity wrappers zero-pad their input to the declared width, which
//! is the contract the domain objects rely on.

use crate::{CryptoError, Field, IncrementalQuinTree};

use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_ff::{BigInteger, PrimeField};
use ark_std::UniformRand;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

const POSEIDON_RATE: usize = 2;
const POSEIDON_CAPACITY: usize = 1;
const POSEIDON_FULL_ROUNDS: usize = 8;
const POSEIDON_PARTIAL_ROUNDS: usize = 57;
const POSEIDON_ALPHA: u64 = 5;

static POSEIDON_CONFIG: Lazy<PoseidonConfig<Field>> = Lazy::new(|| {
    let (ark, mds) = find_poseidon_ark_and_mds::<Field>(
        Field::MODULUS_BIT_SIZE as u64,
        POSEIDON_RATE,
        POSEIDON_FULL_ROUNDS as u64,
        POSEIDON_PARTIAL_ROUNDS as u64,
        0,
    );
    PoseidonConfig::new(
        POSEIDON_FULL_ROUNDS,
        POSEIDON_PARTIAL_ROUNDS,
        POSEIDON_ALPHA,
        mds,
        ark,
        POSEIDON_RATE,
        POSEIDON_CAPACITY,
    )
});

/// Hashes an arbitrary-length slice of field elements with Poseidon.
pub fn poseidon(inputs: &[Field]) -> Field {
    let mut sponge = PoseidonSponge::new(&*POSEIDON_CONFIG);
    for input in inputs {
        sponge.absorb(input);
    }
    sponge.squeeze_native_field_elements(1)[0]
}

fn hash_fixed(arity: usize, inputs: &[Field]) -> Field {
    debug_assert!(inputs.len() <= arity);
    let mut padded = inputs.to_vec();
    padded.resize(arity, Field::from(0u64));
    poseidon(&padded)
}

/// Hashes up to 2 elements.
pub fn hash2(inputs: &[Field]) -> Field {
    hash_fixed(2, inputs)
}

/// Hashes up to 3 elements.
pub fn hash3(inputs: &[Field]) -> Field {
    hash_fixed(3, inputs)
}

/// Hashes up to 4 elements.
pub fn hash4(inputs: &[Field]) -> Field {
    hash_fixed(4, inputs)
}

/// Hashes up to 5 elements.
pub fn hash5(inputs: &[Field]) -> Field {
    hash_fixed(5, inputs)
}

/// Hashes a left and right node, the shape every commitment takes.
#[inline]
pub fn hash_left_right(left: Field, right: Field) -> Field {
    hash2(&[left, right])
}

/// Hashes an array of field elements the way the EVM would hash the
/// equivalent abi-packed uint256 array, reduced into the field. Used for
/// the combined public-input hash of every batch.
pub fn sha256_hash(inputs: &[Field]) -> Field {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input.into_bigint().to_bytes_be());
    }
    Field::from_be_bytes_mod_order(&hasher.finalize())
}

/// Samples a uniformly random field element, used as a commitment salt.
pub fn gen_random_salt() -> Field {
    Field::rand(&mut rand::thread_rng())
}

/// Builds a quinary tree over `leaves` and returns `hash2(root, salt)`.
///
/// This is the commitment shape used for tally results, per-option spent
/// credits and subsidy vectors.
pub fn gen_tree_commitment(leaves: &[Field], salt: Field, depth: usize) -> Result<Field, CryptoError> {
    let mut tree = IncrementalQuinTree::new(depth, Field::from(0u64));
    for leaf in leaves {
        tree.insert(*leaf)?;
    }
    Ok(hash_left_right(tree.root(), salt))
}
