use crate::constants::{
    DEFAULT_LISTEN, DEFAULT_MINE_INTERVAL_MAX_SECS, DEFAULT_MINE_INTERVAL_MIN_SECS,
};
use anyhow::{ensure, Result};
use chainmesh_core::constants::DEFAULT_DIFFICULTY;
use clap::Parser;
use std::{net::SocketAddr, ops::RangeInclusive};

#[derive(Parser, Debug)]
#[command(name = "chainmesh-node")]
#[command(about = "Proof-of-work ledger node with longest-chain sync over HTTP")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long, default_value = DEFAULT_LISTEN)]
    pub listen: SocketAddr,

    /// Address advertised to peers (defaults to http://<listen>)
    #[arg(long)]
    pub public_address: Option<String>,

    /// Known node to register with on startup, e.g. http://127.0.0.1:8000
    #[arg(long)]
    pub bootstrap: Option<String>,

    /// Leading '0' hex characters required in a block hash
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    pub difficulty: u32,

    /// Lower bound of the randomized miner sleep, in seconds
    #[arg(long, default_value_t = DEFAULT_MINE_INTERVAL_MIN_SECS)]
    pub mine_interval_min: u64,

    /// Upper bound of the randomized miner sleep, in seconds
    #[arg(long, default_value_t = DEFAULT_MINE_INTERVAL_MAX_SECS)]
    pub mine_interval_max: u64,

    /// Serve and sync without running the miner loop
    #[arg(long)]
    pub no_mine: bool,
}

#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub listen: SocketAddr,
    pub public_address: String,
    pub bootstrap: Option<String>,
    pub difficulty: u32,
    /// Seconds, inclusive on both ends.
    pub mine_interval: RangeInclusive<u64>,
    pub mining: bool,
}

impl NodeConfig {
    pub fn new(listen: SocketAddr) -> Self {
        Self {
            listen,
            public_address: format!("http://{listen}"),
            bootstrap: None,
            difficulty: DEFAULT_DIFFICULTY,
            mine_interval: DEFAULT_MINE_INTERVAL_MIN_SECS..=DEFAULT_MINE_INTERVAL_MAX_SECS,
            mining: true,
        }
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }
}

impl TryFrom<Args> for NodeConfig {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> Result<Self> {
        ensure!(
            args.mine_interval_min <= args.mine_interval_max,
            "--mine-interval-min ({}) exceeds --mine-interval-max ({})",
            args.mine_interval_min,
            args.mine_interval_max
        );
        let mut config = Self::new(args.listen);
        if let Some(public) = args.public_address {
            config.public_address = public.trim_end_matches('/').to_string();
        }
        config.bootstrap = args.bootstrap.map(|b| b.trim_end_matches('/').to_string());
        config.difficulty = args.difficulty;
        config.mine_interval = args.mine_interval_min..=args.mine_interval_max;
        config.mining = !args.no_mine;
        Ok(config)
    }
}
