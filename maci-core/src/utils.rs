//! Small-value packing for circuit public inputs, and field/integer
//! conversions.
//!
//! Each circuit receives its batch bounds and counters packed into a single
//! field element in 50-bit lanes, mirroring what the verifying contract
//! computes on its side.

use maci_crypto::Field;

use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;

const LANE_BITS: u32 = 50;

fn lane_shift(lane: u32) -> Field {
    let mut shift = Field::from(1u64);
    let step = Field::from(1u64 << LANE_BITS);
    for _ in 0..lane {
        shift *= step;
    }
    shift
}

fn lanes(packed: Field, count: u32) -> Vec<u64> {
    let value = BigUint::from_bytes_le(&packed.into_bigint().to_bytes_le());
    let mask = (BigUint::from(1u64) << LANE_BITS) - 1u64;
    (0..count)
        .map(|i| {
            let lane = (&value >> (i * LANE_BITS)) & &mask;
            lane.to_u64_digits().first().copied().unwrap_or(0)
        })
        .collect()
}

/// Packs the public inputs of a message-processing batch:
/// lane 0 max vote options, lane 1 signup count, lane 2 batch start,
/// lane 3 batch end.
pub fn pack_process_message_small_vals(
    max_vote_options: usize,
    num_sign_ups: usize,
    batch_start_index: usize,
    batch_end_index: usize,
) -> Field {
    Field::from(max_vote_options as u64)
        + Field::from(num_sign_ups as u64) * lane_shift(1)
        + Field::from(batch_start_index as u64) * lane_shift(2)
        + Field::from(batch_end_index as u64) * lane_shift(3)
}

pub fn unpack_process_message_small_vals(packed: Field) -> (u64, u64, u64, u64) {
    let l = lanes(packed, 4);
    (l[0], l[1], l[2], l[3])
}

/// Packs the public inputs of a tally batch: lane 0 the batch number
/// (start index divided by the batch size), lane 1 the signup count.
pub fn pack_tally_votes_small_vals(
    batch_start_index: usize,
    batch_size: usize,
    num_sign_ups: usize,
) -> Field {
    Field::from((batch_start_index / batch_size) as u64)
        + Field::from(num_sign_ups as u64) * lane_shift(1)
}

pub fn unpack_tally_votes_small_vals(packed: Field) -> (u64, u64) {
    let l = lanes(packed, 2);
    (l[0], l[1])
}

/// Packs the public inputs of a subsidy batch: lane 0 the column batch
/// index, lane 1 the row batch index, lane 2 the signup count.
pub fn pack_subsidy_small_vals(
    row_batch_index: usize,
    col_batch_index: usize,
    num_sign_ups: usize,
) -> Field {
    Field::from(col_batch_index as u64)
        + Field::from(row_batch_index as u64) * lane_shift(1)
        + Field::from(num_sign_ups as u64) * lane_shift(2)
}

pub fn unpack_subsidy_small_vals(packed: Field) -> (u64, u64, u64) {
    let l = lanes(packed, 3);
    (l[1], l[0], l[2])
}

/// Converts a field element back to a `u64`, if it fits.
pub fn field_to_u64(value: &Field) -> Option<u64> {
    let bytes = value.into_bigint().to_bytes_le();
    if bytes[8..].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(buf))
}

/// Converts a field element back to a `u128`, if it fits.
pub fn field_to_u128(value: &Field) -> Option<u128> {
    let bytes = value.into_bigint().to_bytes_le();
    if bytes[16..].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&bytes[..16]);
    Some(u128::from_le_bytes(buf))
}
