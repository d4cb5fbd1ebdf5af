// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Builtin hash algorithms

use xxhash_rust::xxh64::xxh64;

const FNV_PRIME: u32 = 16_777_619;
const FNV_OFFSET: u32 = 2_166_136_261;

/// 32-bit FNV-1a with a final avalanche step. Input bytes are sign extended before mixing.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn hash_ex(data: &[u8]) -> u64 {
    let mut hash = data.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ i32::from(*byte as i8) as u32).wrapping_mul(FNV_PRIME)
    });
    hash = hash.wrapping_add(hash << 13);
    hash ^= hash >> 7;
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 17;
    hash = hash.wrapping_add(hash << 5);
    u64::from(hash)
}

/// xxHash64 with seed 0
#[must_use]
pub fn bmv2_hash(data: &[u8]) -> u64 {
    xxh64(data, 0)
}
