//! REST API server for picochain
//!
//! Serves two audiences over the same surface: peers, which poll the raw
//! `/chain` and `/pending-transactions` endpoints, and clients (wallets,
//! CLIs), whose consensus-answering endpoints synchronize with peers before
//! responding. The peer-facing endpoints deliberately never sync, so two
//! nodes polling each other cannot recurse.

use axum::{
    extract::{Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::block::Block;
use crate::blockchain::Blockchain;
use crate::crypto::KeyPair;
use crate::error::ChainError;
use crate::registry::NodeRegistry;
use crate::sync::{self, PeerClient};
use crate::transaction::Transaction;

/// Shared state behind every handler. All ledger mutation goes through the
/// single `RwLock`, which serializes mining and sync against each other.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Blockchain>>,
    pub registry: Arc<NodeRegistry>,
    pub client: PeerClient,
    /// This node's own base URL, excluded when polling the registry.
    pub base_url: String,
}

impl AppState {
    pub fn new(ledger: Blockchain, registry: NodeRegistry, base_url: String) -> Self {
        AppState {
            ledger: Arc::new(RwLock::new(ledger)),
            registry: Arc::new(registry),
            client: PeerClient::new(),
            base_url,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Chain(ChainError),
    InvalidInput(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Chain(e) => {
                let status = match e {
                    ChainError::StaleMiningResult => StatusCode::CONFLICT,
                    ChainError::PeerUnreachable(_) => StatusCode::BAD_GATEWAY,
                    ChainError::KeyMismatch
                    | ChainError::MissingSignature
                    | ChainError::InvalidSignature
                    | ChainError::InvalidAddress
                    | ChainError::NonPositiveAmount
                    | ChainError::InsufficientBalance(_)
                    | ChainError::Crypto(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::Chain(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct WalletResponse {
    address: String,
    private_key: String,
}

#[derive(Deserialize)]
pub struct MineRequest {
    pub address: String,
}

#[derive(Deserialize)]
pub struct SendRequest {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub private_key: String,
}

#[derive(Deserialize)]
pub struct BalanceRequest {
    pub address: String,
}

#[derive(Serialize)]
struct BalanceResponse {
    address: String,
    balance: i64,
}

#[derive(Deserialize)]
pub struct RegisterNodeRequest {
    pub url: String,
}

#[derive(Serialize)]
struct SuccessResponse {
    message: String,
}

// ============================================================================
// Middleware
// ============================================================================

async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints (for testing)
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        // Peer-facing endpoints: raw local state, no sync
        .route("/chain", get(get_chain))
        .route("/pending-transactions", get(get_pending_transactions))
        // Client endpoints
        .route("/generate-wallet", get(generate_wallet))
        .route("/latest-block", get(get_latest_block))
        .route("/replace-chain", get(replace_chain))
        .route("/valid-pending-transactions", get(get_valid_pending))
        .route("/transactions/:address", get(get_transactions_for_address))
        .route("/mine", post(mine))
        .route("/send", post(send_token))
        .route("/balance", post(get_balance))
        // Registry endpoints
        .route("/nodes", get(list_nodes).post(register_node))
        // System endpoints
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
        .layer(cors)
}

/// Run the API server until the process is stopped.
pub async fn run_api_server(state: AppState, port: u16) -> Result<(), ChainError> {
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    Json(serde_json::json!({
        "status": "healthy",
        "height": ledger.chain.len(),
        "pending": ledger.pending_transactions.len(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn generate_wallet() -> Json<WalletResponse> {
    let keypair = KeyPair::generate();
    Json(WalletResponse {
        address: keypair.address(),
        private_key: keypair.private_key_hex(),
    })
}

async fn get_chain(State(state): State<AppState>) -> Json<Vec<Block>> {
    let ledger = state.ledger.read().await;
    Json(ledger.chain.clone())
}

async fn get_pending_transactions(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    let ledger = state.ledger.read().await;
    Json(ledger.pending_transactions.clone())
}

async fn get_latest_block(State(state): State<AppState>) -> Result<Json<Block>, ApiError> {
    let mut ledger = state.ledger.write().await;
    sync::replace_chain(&mut ledger, &state.registry, &state.client, &state.base_url).await;

    match ledger.latest_block() {
        Some(block) => Ok(Json(block.clone())),
        None => Err(ApiError::Chain(ChainError::ChainInvalid)),
    }
}

async fn replace_chain(State(state): State<AppState>) -> Json<Vec<Block>> {
    let mut ledger = state.ledger.write().await;
    sync::replace_chain(&mut ledger, &state.registry, &state.client, &state.base_url).await;
    Json(ledger.chain.clone())
}

/// The merged (local plus peer) mempool after reconciliation, without
/// mutating local state: a preview of what the next mined block would carry.
async fn get_valid_pending(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    let ledger = state.ledger.read().await;
    let candidates =
        sync::collect_pending(&ledger, &state.registry, &state.client, &state.base_url).await;
    Json(ledger.validate_pending_transactions(candidates))
}

async fn get_transactions_for_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<Vec<Transaction>> {
    let mut ledger = state.ledger.write().await;
    sync::replace_chain(&mut ledger, &state.registry, &state.client, &state.base_url).await;
    Json(ledger.transactions_for_address(&address))
}

/// Runs one full mining cycle under the write lock, so no other mutation can
/// interleave between the post-mine sync and the commit.
async fn mine(
    State(state): State<AppState>,
    Json(req): Json<MineRequest>,
) -> Result<Json<Block>, ApiError> {
    if req.address.is_empty() {
        return Err(ApiError::InvalidInput(
            "reward address cannot be empty".to_string(),
        ));
    }

    let mut ledger = state.ledger.write().await;
    let block = sync::mine_pending_transactions(
        &mut ledger,
        &state.registry,
        &state.client,
        &state.base_url,
        &req.address,
    )
    .await?;

    Ok(Json(block))
}

async fn send_token(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let mut ledger = state.ledger.write().await;
    sync::replace_chain(&mut ledger, &state.registry, &state.client, &state.base_url).await;

    let mut tx = Transaction::new(Some(req.from), req.to, req.amount);
    tx.sign(&req.private_key)?;
    ledger.add_transaction(tx.clone())?;

    tracing::info!(amount = req.amount, "transaction admitted to mempool");
    Ok(Json(tx))
}

async fn get_balance(
    State(state): State<AppState>,
    Json(req): Json<BalanceRequest>,
) -> Json<BalanceResponse> {
    let mut ledger = state.ledger.write().await;
    sync::replace_chain(&mut ledger, &state.registry, &state.client, &state.base_url).await;

    Json(BalanceResponse {
        balance: ledger.balance_of(&req.address),
        address: req.address,
    })
}

async fn list_nodes(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.list())
}

async fn register_node(
    State(state): State<AppState>,
    Json(req): Json<RegisterNodeRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if req.url.is_empty() {
        return Err(ApiError::InvalidInput("node url cannot be empty".to_string()));
    }
    state.registry.add(&req.url)?;

    Ok(Json(SuccessResponse {
        message: format!("registered node {}", req.url),
    }))
}
