//! Peer synchronization: joining the network, announcing blocks and the
//! longest-valid-chain consensus scan.
//!
//! Peer addresses are trusted strings. Anyone can register any address, so a
//! hostile caller can fill the peer set with junk; the only defence is that
//! unreachable peers cost one timeout per scan.

use crate::{error::ApiError, state::AppState};
use chainmesh_core::{chain::longest_valid, Block, Chain, ChainSnapshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Registers with `target`, then rebuilds the local chain from its records and
/// adopts its peer list. A tampered chain fails the whole call and leaves local
/// state untouched.
pub async fn register_with(state: &AppState, target: &str) -> Result<(), ApiError> {
    let snapshot = state
        .client
        .register_node(target, &state.public_address)
        .await?;
    let difficulty = state.difficulty().await;
    let chain = Chain::from_records(snapshot.chain, difficulty)?;

    let mut ledger = state.ledger.write().await;
    ledger.replace_chain(chain);
    ledger.merge_peers(snapshot.peer_list);
    ledger.merge_peers([target]);
    info!(
        "registered with {target}: chain length {}, {} peers",
        ledger.chain().len(),
        ledger.peers().len()
    );
    Ok(())
}

/// Startup bootstrap: register with `target`, then tell every other peer we
/// exist.
pub async fn join_network(state: &AppState, target: &str) -> Result<(), ApiError> {
    register_with(state, target).await?;

    let others: Vec<String> = {
        let ledger = state.ledger.read().await;
        ledger
            .peers()
            .others(&state.public_address)
            .into_iter()
            .filter(|p| p != target)
            .collect()
    };
    let mut calls = JoinSet::new();
    for peer in others {
        let state = state.clone();
        calls.spawn(async move {
            if let Err(e) = state.client.update_peers(&peer, &state.public_address).await {
                debug!("could not introduce ourselves: {e}");
            }
        });
    }
    while calls.join_next().await.is_some() {}
    Ok(())
}

/// Best-effort broadcast of a sealed block to every peer but ourselves.
/// Returns how many peers accepted it.
pub async fn announce_new_block(state: &AppState, block: &Block) -> usize {
    let peers = state
        .ledger
        .read()
        .await
        .peers()
        .others(&state.public_address);

    let mut calls = JoinSet::new();
    for peer in peers {
        let client = state.client.clone();
        let block = block.clone();
        calls.spawn(async move {
            match client.post_block(&peer, &block).await {
                Ok(()) => true,
                Err(e) => {
                    debug!("announce of block #{} failed: {e}", block.index);
                    false
                }
            }
        });
    }

    let mut delivered = 0;
    while let Some(joined) = calls.join_next().await {
        if matches!(joined, Ok(true)) {
            delivered += 1;
        }
    }
    delivered
}

/// Fetches every peer's chain concurrently (lock released) and reconstructs the
/// longest valid one that beats `current_len`. `None` if nobody is ahead.
pub async fn fetch_longer_chain(state: &AppState) -> Option<(String, Chain)> {
    let (current_len, difficulty, peers) = {
        let ledger = state.ledger.read().await;
        (
            ledger.chain().len(),
            ledger.difficulty(),
            ledger.peers().others(&state.public_address),
        )
    };

    let mut fetches = JoinSet::new();
    for peer in peers {
        let client = state.client.clone();
        fetches.spawn(async move {
            let res = client.fetch_chain(&peer).await;
            (peer, res)
        });
    }

    let mut snapshots: Vec<(String, ChainSnapshot)> = Vec::new();
    while let Some(joined) = fetches.join_next().await {
        match joined {
            Ok((peer, Ok(snapshot))) => snapshots.push((peer, snapshot)),
            Ok((_, Err(e))) => warn!("skipping peer during consensus: {e}"),
            Err(e) => warn!("consensus fetch task failed: {e}"),
        }
    }

    let (source, snapshot) = longest_valid(current_len, snapshots, difficulty)?;
    match Chain::from_records(snapshot.chain, difficulty) {
        Ok(chain) => Some((source, chain)),
        Err(e) => {
            warn!("chain from {source} failed reconstruction: {e}");
            None
        }
    }
}

/// Longest-valid-chain rule. Returns whether the local chain was replaced;
/// the chain never gets shorter.
pub async fn consensus(state: &AppState) -> bool {
    let Some((source, chain)) = fetch_longer_chain(state).await else {
        return false;
    };
    let adopted = state.ledger.write().await.adopt_if_longer(chain);
    if adopted {
        info!("adopted longer chain from {source}");
    }
    adopted
}
