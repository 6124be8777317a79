use crate::{
    state::AppState,
    sync::{announce_new_block, fetch_longer_chain},
};
use chainmesh_core::{mine::solve_parallel, Block};
use rand::Rng;
use std::{ops::RangeInclusive, time::Duration};
use tokio::sync::watch;
use tracing::{error, info};

/// What one pass of the miner loop ended with.
#[derive(Debug)]
pub enum MineOutcome {
    /// Pool was empty.
    Idle,
    /// The tip moved while solving; transactions went back to the pool.
    Stale,
    /// Mined and still canonical after consensus; sent to this many peers.
    Announced { block: Block, delivered: usize },
    /// Mined, but consensus adopted a longer peer chain that replaced it.
    Superseded { block: Block },
}

pub struct Miner {
    state: AppState,
    interval: RangeInclusive<u64>,
}

impl Miner {
    pub fn new(state: AppState, interval: RangeInclusive<u64>) -> Self {
        Self { state, interval }
    }

    /// Sleeps a random interval between passes until `shutdown` is signalled or
    /// its sender goes away.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("miner loop started as {}", self.state.node_id);
        loop {
            let wait = Duration::from_secs(rand::thread_rng().gen_range(self.interval.clone()));
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => break,
            }
            self.tick().await;
        }
        info!("miner loop stopped");
    }

    /// One pass: mine, reconcile, then announce only if our block survived.
    ///
    /// The survival check and any chain replacement happen under the same write
    /// lock, so a block that arrived from a peer in between cannot make us
    /// announce something already superseded or drop something still canonical.
    pub async fn tick(&self) -> MineOutcome {
        let state = &self.state;
        let (candidate, difficulty) = {
            let mut ledger = state.ledger.write().await;
            let Some(candidate) = ledger.prepare_candidate(state.node_id.as_str()) else {
                return MineOutcome::Idle;
            };
            (candidate, ledger.difficulty())
        };

        let fallback = candidate.transactions.clone();
        let solved = tokio::task::spawn_blocking(move || {
            let mut block = candidate;
            let (_, hash) = solve_parallel(&mut block, difficulty);
            block.hash = hash;
            block
        })
        .await;
        let block = match solved {
            Ok(block) => block,
            Err(e) => {
                error!("proof-of-work worker failed: {e}");
                state.ledger.write().await.restore_transactions(fallback);
                return MineOutcome::Stale;
            }
        };

        if !state.ledger.write().await.commit_mined(block.clone(), &block.hash) {
            return MineOutcome::Stale;
        }

        let longer = fetch_longer_chain(state).await;
        let still_canonical = {
            let mut ledger = state.ledger.write().await;
            if let Some((source, chain)) = longer {
                if ledger.adopt_if_longer(chain) {
                    info!("adopted longer chain from {source}");
                }
            }
            ledger.holds_block(&block)
        };

        if !still_canonical {
            info!("block #{} was superseded by a longer peer chain", block.index);
            return MineOutcome::Superseded { block };
        }
        let delivered = announce_new_block(state, &block).await;
        info!("Block #{} is mined by '{}'.", block.index, state.node_id);
        MineOutcome::Announced { block, delivered }
    }
}
