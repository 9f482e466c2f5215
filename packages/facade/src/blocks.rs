//! Virtual block decomposition for callers that expect block locations.
//!
//! Files in the cache tier are not stored as blocks. Callers such as split
//! planners still want block metadata, so a file is cut into fixed-size
//! pieces that all point at the one worker serving the file.

use std::num::NonZeroU64;

use tierfs_core::{VirtualBlockLocation, WorkerAddress};

/// Number of virtual blocks for a file of `length` bytes.
///
/// A file of exactly one block size is one block. Otherwise the count is
/// `length / block_size + 1`, which leaves a trailing empty block when the
/// length is a larger exact multiple of the block size.
pub fn block_count(length: u64, block_size: NonZeroU64) -> u64 {
    let block_size = block_size.get();
    if length == block_size {
        1
    } else {
        length / block_size + 1
    }
}

/// Cut a file into virtual blocks, numbered from 1.
pub fn synthesize(
    length: u64,
    block_size: NonZeroU64,
    worker: &WorkerAddress,
    ufs_path: &str,
) -> Vec<VirtualBlockLocation> {
    let size = block_size.get();
    (0..block_count(length, block_size))
        .map(|i| {
            let offset = i * size;
            VirtualBlockLocation {
                block_id: i + 1,
                offset,
                length: size.min(length.saturating_sub(offset)),
                worker: worker.clone(),
                ufs_locations: vec![ufs_path.to_string()],
            }
        })
        .collect()
}
