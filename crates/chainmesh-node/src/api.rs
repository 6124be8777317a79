use crate::{client::NodeAddress, error::ApiError, state::AppState, sync};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chainmesh_core::{Block, ChainSnapshot, LedgerError, Transaction};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// Missing fields read as empty so they fail validation instead of decoding.
#[derive(Debug, Deserialize)]
pub struct NewTransaction {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/new_transaction", post(new_transaction))
        .route("/chain", get(get_chain))
        .route("/register_node", post(register_node))
        .route("/register_with", post(register_with))
        .route("/add_block", post(add_block))
        .route("/pending_tx", get(pending_tx))
        .route("/update_peers", post(update_peers))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn new_transaction(
    State(state): State<AppState>,
    Json(tx): Json<NewTransaction>,
) -> Result<impl IntoResponse, ApiError> {
    let tx = state
        .ledger
        .write()
        .await
        .submit_transaction(&tx.author, &tx.content)?;
    info!("pooled transaction {} from {}", tx.hash, tx.author);
    Ok((StatusCode::CREATED, "Success"))
}

async fn get_chain(State(state): State<AppState>) -> Json<ChainSnapshot> {
    Json(state.ledger.read().await.snapshot())
}

async fn register_node(
    State(state): State<AppState>,
    Json(body): Json<NodeAddress>,
) -> Result<Json<ChainSnapshot>, ApiError> {
    let mut ledger = state.ledger.write().await;
    if ledger.register_peer(&body.node_address)? {
        info!("new peer {}", body.node_address);
    }
    Ok(Json(ledger.snapshot()))
}

async fn register_with(
    State(state): State<AppState>,
    Json(body): Json<NodeAddress>,
) -> Result<impl IntoResponse, ApiError> {
    if body.node_address.is_empty() {
        return Err(LedgerError::InvalidPeerAddress.into());
    }
    sync::register_with(&state, body.node_address.trim_end_matches('/')).await?;
    Ok((StatusCode::OK, "Registration successful"))
}

async fn add_block(
    State(state): State<AppState>,
    Json(block): Json<Block>,
) -> Result<impl IntoResponse, ApiError> {
    state.ledger.write().await.receive_block(block)?;
    Ok((StatusCode::CREATED, "Block added to the chain"))
}

async fn pending_tx(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.ledger.read().await.pending_transactions())
}

async fn update_peers(
    State(state): State<AppState>,
    Json(body): Json<NodeAddress>,
) -> Result<impl IntoResponse, ApiError> {
    state.ledger.write().await.register_peer(&body.node_address)?;
    Ok((StatusCode::OK, "Peer added"))
}
