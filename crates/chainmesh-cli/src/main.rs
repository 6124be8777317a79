use anyhow::{bail, Context, Result};
use chainmesh_core::{ChainSnapshot, Transaction};
use clap::{Parser, Subcommand};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "chainmesh-cli")]
#[command(about = "CLI client for a chainmesh node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8000)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction
    Submit {
        #[arg(long)]
        author: String,
        #[arg(long)]
        content: String,
    },
    /// Print chain length, transaction count and the latest blocks
    Chain {
        /// How many of the newest blocks to list
        #[arg(long, default_value_t = 10)]
        last: usize,
    },
    /// Print one block by index as JSON
    Block { index: u64 },
    /// Print one confirmed transaction by hash as JSON
    Tx { hash: String },
    /// List unconfirmed transactions
    Pending,
    /// List the node's known peers
    Peers,
    /// Make the node join the network through a bootstrap node
    RegisterWith {
        /// Bootstrap node URL
        bootstrap: String,
    },
    /// Add an address to the node's peer set
    AddPeer { address: String },
}

#[derive(Serialize)]
struct NewTransaction<'a> {
    author: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct NodeAddress<'a> {
    node_address: &'a str,
}

async fn get_json<T: DeserializeOwned>(client: &reqwest::Client, node: &str, route: &str) -> Result<T> {
    let res = client
        .get(format!("{node}/{route}"))
        .send()
        .await
        .with_context(|| format!("querying {node}"))?;
    if !res.status().is_success() {
        bail!("{node} answered {}", res.status());
    }
    Ok(res.json().await?)
}

async fn fetch_chain(client: &reqwest::Client, node: &str) -> Result<ChainSnapshot> {
    get_json(client, node, "chain").await
}

async fn post_and_print<T: Serialize>(client: &reqwest::Client, url: String, body: &T) -> Result<()> {
    debug!("POST {url}");
    let res = client.post(&url).json(body).send().await?;
    let status = res.status();
    let text = res.text().await?;
    println!("status: {}", status);
    println!("{text}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();

    match cli.cmd {
        Command::Submit { author, content } => {
            let tx = NewTransaction {
                author: &author,
                content: &content,
            };
            post_and_print(&client, format!("{node}/new_transaction"), &tx).await?;
        }
        Command::Chain { last } => {
            let snapshot = fetch_chain(&client, node).await?;
            println!(
                "length: {}  transactions: {}  peers: {}",
                snapshot.length,
                snapshot.transaction_count(),
                snapshot.peer_list.len()
            );
            for block in snapshot.chain.iter().rev().take(last) {
                println!(
                    "#{:<6} {}  txs={:<4} miner={}",
                    block.index,
                    block.hash,
                    block.transactions.len(),
                    if block.miner.is_empty() { "-" } else { block.miner.as_str() }
                );
            }
        }
        Command::Block { index } => {
            let snapshot = fetch_chain(&client, node).await?;
            let block = snapshot
                .block(index)
                .with_context(|| format!("no block #{index} on {node}"))?;
            println!("{}", serde_json::to_string_pretty(block)?);
        }
        Command::Tx { hash } => {
            let snapshot = fetch_chain(&client, node).await?;
            let tx = snapshot
                .find_transaction(&hash)
                .with_context(|| format!("no confirmed transaction {hash} on {node}"))?;
            println!("{}", serde_json::to_string_pretty(tx)?);
        }
        Command::Pending => {
            let pending: Vec<Transaction> = get_json(&client, node, "pending_tx").await?;
            println!("{}", serde_json::to_string_pretty(&pending)?);
        }
        Command::Peers => {
            let snapshot = fetch_chain(&client, node).await?;
            for peer in snapshot.peer_list {
                println!("{peer}");
            }
        }
        Command::RegisterWith { bootstrap } => {
            let body = NodeAddress {
                node_address: &bootstrap,
            };
            post_and_print(&client, format!("{node}/register_with"), &body).await?;
        }
        Command::AddPeer { address } => {
            let body = NodeAddress {
                node_address: &address,
            };
            post_and_print(&client, format!("{node}/update_peers"), &body).await?;
        }
    }
    Ok(())
}
