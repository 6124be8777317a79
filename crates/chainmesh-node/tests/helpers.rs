#![allow(dead_code)]

use axum::{
    routing::{get, post},
    Json, Router,
};
use chainmesh_core::{pow, Block, ChainSnapshot, Ledger, Transaction};
use chainmesh_node::{config::NodeConfig, serve, state::AppState};
use tokio::{net::TcpListener, sync::oneshot};

pub const TEST_DIFFICULTY: u32 = 1;

pub struct TestNode {
    pub state: AppState,
    pub url: String,
    _stop: oneshot::Sender<()>,
}

impl TestNode {
    pub async fn len(&self) -> usize {
        self.state.ledger.read().await.chain().len()
    }

    pub async fn blocks(&self) -> Vec<Block> {
        self.state.ledger.read().await.chain().blocks().to_vec()
    }

    pub async fn peers(&self) -> Vec<String> {
        self.state.ledger.read().await.peers().to_vec()
    }

    pub async fn add_peer(&self, url: &str) {
        self.state
            .ledger
            .write()
            .await
            .register_peer(url)
            .expect("non-empty peer");
    }

    /// Mines `n` blocks locally, one transaction each, without touching peers.
    pub async fn mine_blocks(&self, n: usize, author: &str) {
        let mut ledger = self.state.ledger.write().await;
        for i in 0..n {
            ledger
                .submit_transaction(author, &format!("{author} #{i}"))
                .expect("valid transaction");
            ledger.mine(self.state.node_id.as_str()).expect("block mined");
        }
    }

    /// A correctly solved block extending this node's tip.
    pub async fn next_block(&self, content: &str) -> Block {
        let index = self.len().await as u64;
        self.next_block_at(index, content).await
    }

    /// A block that points at this node's tip with proper work but carries
    /// an arbitrary `index`.
    pub async fn next_block_at(&self, index: u64, content: &str) -> Block {
        let ledger = self.state.ledger.read().await;
        let tip = ledger.chain().last_block().expect("genesis").clone();
        let mut block = Block::new(
            index,
            vec![Transaction::new("peer", content)],
            tip.hash,
            TEST_DIFFICULTY,
            "peer",
        );
        let (_, hash) = pow::solve(&mut block, TEST_DIFFICULTY);
        block.hash = hash;
        block
    }
}

async fn bind() -> (TcpListener, String, NodeConfig) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let config = NodeConfig::new(addr).with_difficulty(TEST_DIFFICULTY);
    (listener, format!("http://{addr}"), config)
}

/// Starts a real node on an ephemeral port; it stops when the handle drops.
pub async fn spawn_node() -> TestNode {
    let (listener, url, config) = bind().await;
    let state = AppState::new(&config);
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(serve(listener, state.clone(), async {
        let _ = stopped.await;
    }));
    TestNode {
        state,
        url,
        _stop: stop,
    }
}

/// Connects every pair of nodes in both directions.
pub async fn mesh(nodes: &[&TestNode]) {
    for a in nodes {
        for b in nodes {
            if a.url != b.url {
                a.add_peer(&b.url).await;
            }
        }
    }
}

/// A fake peer that answers `/chain` and `/register_node` with a fixed body.
pub async fn spawn_static_peer(snapshot: ChainSnapshot) -> String {
    let (listener, url, _) = bind().await;
    let chain = {
        let snapshot = snapshot.clone();
        move || async move { Json(snapshot) }
    };
    let register = move || async move { Json(snapshot) };
    let app = Router::new()
        .route("/chain", get(chain))
        .route("/register_node", post(register));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    url
}

/// Nothing listens here.
pub fn dead_peer() -> String {
    "http://127.0.0.1:9".to_string()
}

/// Snapshot of a standalone ledger with `blocks` mined blocks after genesis.
pub fn offline_snapshot(blocks: usize, author: &str) -> ChainSnapshot {
    let mut ledger = Ledger::new(TEST_DIFFICULTY);
    for i in 0..blocks {
        ledger
            .submit_transaction(author, &format!("{author} #{i}"))
            .expect("valid transaction");
        ledger.mine("offline").expect("block mined");
    }
    ledger.snapshot()
}
