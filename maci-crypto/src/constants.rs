use crate::Field;

use ark_ec::twisted_edwards::TECurveConfig;
use ark_ec::AffineRepr;
use ark_ed_on_bn254::{EdwardsAffine, EdwardsConfig};
use ark_ff::Field as _;
use once_cell::sync::Lazy;

/// The BN254 scalar field modulus, in decimal. Kept around for
/// documentation and for tests which check range validation.
pub const SNARK_FIELD_SIZE_DEC: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// The zero leaf used by every accumulator in the protocol: the Keccak-256
/// hash of the bytestring "Maci", reduced into the field.
const NOTHING_UP_MY_SLEEVE_DEC: &str =
    "8370432830353022751713833565135785980866757267633941821328460903436894336785";

static NOTHING_UP_MY_SLEEVE: Lazy<Field> =
    Lazy::new(|| crate::serde_utils::field_from_decimal(NOTHING_UP_MY_SLEEVE_DEC).expect("constant parses"));

/// The reserved padding public key, derived by hash-to-curve from the zero
/// leaf so nobody knows the corresponding private key: starting from the
/// zero-leaf value as a candidate y coordinate, solve the twisted Edwards
/// equation `a x^2 + y^2 = 1 + d x^2 y^2` for x, step y until x^2 has a
/// square root, and clear the cofactor to land in the prime-order
/// subgroup. Top-up messages and the blank state leaf both use it.
static PADDING_KEY_COORDS: Lazy<(Field, Field)> = Lazy::new(|| {
    let a = EdwardsConfig::COEFF_A;
    let d = EdwardsConfig::COEFF_D;

    let mut y = *NOTHING_UP_MY_SLEEVE;
    loop {
        // x^2 = (1 - y^2) / (a - d y^2)
        let y2 = y * y;
        if let Some(inverse) = (a - d * y2).inverse() {
            if let Some(x) = ((Field::from(1u64) - y2) * inverse).sqrt() {
                let point = EdwardsAffine::new_unchecked(x, y).clear_cofactor();
                if !point.is_zero() {
                    return (point.x, point.y);
                }
            }
        }
        y += Field::from(1u64);
    }
});

/// Returns the zero leaf used by the state and message accumulators.
#[inline]
pub fn nothing_up_my_sleeve() -> Field {
    *NOTHING_UP_MY_SLEEVE
}

/// Returns the (x, y) coordinates of the reserved padding public key.
#[inline]
pub fn padding_public_key_coords() -> (Field, Field) {
    *PADDING_KEY_COORDS
}
