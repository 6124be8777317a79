use crate::{pow::meets_difficulty, Block, HexHash};
use rayon::prelude::*;
use tracing::info;

/// Nonces hashed per worker thread before the next window starts.
const NONCE_BATCH: usize = 1 << 14;

/// Searches nonces in parallel until a digest has `difficulty` leading sentinel
/// characters. First-match semantics: the result is the lowest qualifying nonce,
/// identical to what the sequential `pow::solve` finds.
/// Sets `block.nonce` and returns the winning nonce with its hash.
///
/// Windows of `NONCE_BATCH * threads` nonces are scanned in increasing order,
/// each split evenly across the pool.
pub fn solve_parallel(block: &mut Block, difficulty: u32) -> (u64, HexHash) {
    let template = &*block;
    let window = NONCE_BATCH * rayon::current_num_threads().max(1);

    let mut base = 0u64;
    let (nonce, hash) = loop {
        let found = (0..window)
            .into_par_iter()
            .map(|offset| {
                let nonce = base.wrapping_add(offset as u64);
                (nonce, template.hash_with_nonce(nonce))
            })
            .find_first(|(_, hash)| meets_difficulty(hash, difficulty));
        if let Some(found) = found {
            break found;
        }
        base = base.wrapping_add(window as u64);
    };

    block.nonce = nonce;
    info!(
        "Mined block {} with nonce {} and hash {}",
        block.index, nonce, hash
    );
    (nonce, hash)
}
