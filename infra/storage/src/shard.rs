//! Deterministic mapping from identifiers to sharded file paths.
//!
//! The hash is the classic 31-multiplier string hash over UTF-16 code units with
//! 32-bit wrapping arithmetic, so layouts written by other implementations of the
//! same scheme resolve to the same directories.

use crate::identifier::Identifier;
use std::path::{Path, PathBuf};

/// Hex characters consumed per directory level.
pub const SEGMENT_WIDTH: usize = 2;

/// Directory levels used when nothing else is configured.
pub const DEFAULT_SHARD_DEPTH: usize = 2;

/// Segment used once the 8-character hex string is exhausted.
const PAD_SEGMENT: &str = "00";

/// Absolute value of the wrapped 32-bit string hash of `id`.
///
/// `i32::MIN` has no positive counterpart in 32 bits, so its magnitude
/// `0x8000_0000` is returned as is.
#[must_use]
pub fn shard_hash(id: &str) -> u32 {
    id.encode_utf16()
        .fold(0_i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
        .unsigned_abs()
}

/// Lowercase, zero-padded, 8-character hex rendering of [`shard_hash`].
#[must_use]
pub fn shard_hex(id: &str) -> String {
    format!("{:08x}", shard_hash(id))
}

/// The directory segments for `id` at the given depth.
#[must_use]
pub fn shard_segments(id: &str, depth: usize) -> Vec<String> {
    let hex = shard_hex(id);
    (0..depth)
        .map(|level| {
            let start = level * SEGMENT_WIDTH;
            hex.get(start..start + SEGMENT_WIDTH).unwrap_or(PAD_SEGMENT).to_owned()
        })
        .collect()
}

/// `root/<seg_0>/.../<seg_{depth-1}>/<id>`. Pure; touches no filesystem state.
#[must_use]
pub fn shard_path(root: &Path, id: &Identifier, depth: usize) -> PathBuf {
    let mut path = root.to_path_buf();
    path.extend(shard_segments(id.as_str(), depth));
    path.push(id.as_str());
    path
}
