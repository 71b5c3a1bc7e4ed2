//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the ledger over HTTP. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                              | Description                          |
//! |--------|-----------------------------------|--------------------------------------|
//! | GET    | `/health`                         | Liveness probe                       |
//! | GET    | `/status`                         | Supply, rate, account count, digest  |
//! | GET    | `/config`                         | Owner, protocol wallet, fee rate     |
//! | GET    | `/accounts/:address`              | Balance, exemption, stats, holding   |
//! | GET    | `/allowances/:owner/:spender`     | Outstanding allowance                |
//! | POST   | `/transfer`                       | Direct transfer                      |
//! | POST   | `/transfer-from`                  | Delegated transfer                   |
//! | POST   | `/approve`                        | Set an allowance                     |
//! | POST   | `/allowance/increase`             | Raise an allowance                   |
//! | POST   | `/allowance/decrease`             | Lower an allowance                   |
//! | POST   | `/admin/protocol-perc`            | Change the fee rate (owner only)     |
//! | POST   | `/admin/protocol-wallet`          | Change the fee wallet (owner only)   |
//! | POST   | `/admin/exempt`                   | Exempt an account (owner only)       |
//! | POST   | `/admin/unexempt`                 | Revoke an exemption (owner only)     |
//! | GET    | `/ws`                             | Live ledger event stream             |
//!
//! Every mutating request names its `caller` in the body. Each mutation
//! holds the ledger's write lock for its whole duration, including the
//! snapshot write, so calls are applied one at a time.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use comrade_protocol::{
    Address, Ledger, LedgerConfig, LedgerError, LedgerEvent, LedgerResult, TransferReceipt,
};

use crate::metrics::SharedMetrics;
use crate::state::SnapshotStore;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone. Everything sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The hosted ledger.
    pub ledger: Arc<RwLock<Ledger>>,
    /// Broadcast channel for live event notifications.
    pub event_tx: broadcast::Sender<LedgerEvent>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Where snapshots go. `None` keeps the ledger in memory only.
    pub store: Option<Arc<SnapshotStore>>,
}

impl AppState {
    /// Runs one ledger mutation under the write lock.
    ///
    /// On success the ledger's events are drained, folded into metrics,
    /// broadcast to subscribers, and the snapshot is rewritten. On failure
    /// the rejection is counted and nothing else happens.
    async fn mutate<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Ledger) -> LedgerResult<T>,
    ) -> Result<T, ApiError> {
        let mut ledger = self.ledger.write().await;

        let value = match f(&mut *ledger) {
            Ok(value) => value,
            Err(err) => {
                self.metrics.reject(err.code());
                tracing::info!(op, code = err.code(), "rejected: {}", err);
                return Err(ApiError::Ledger(err));
            }
        };

        let events = ledger.drain_events();
        self.metrics.observe(&events);
        self.metrics.accounts.set(ledger.account_count() as i64);
        for event in events {
            // No subscribers is fine.
            let _ = self.event_tx.send(event);
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&*ledger).await {
                // The in-memory ledger stays authoritative; the next
                // successful write or the shutdown save catches up.
                tracing::error!(op, "snapshot write failed: {:#}", e);
            }
        }

        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable code.
    pub code: String,
}

/// Failure of an API call.
#[derive(Debug)]
pub enum ApiError {
    /// The ledger rejected the operation.
    Ledger(LedgerError),
    /// A path parameter was not a valid address.
    InvalidAddress(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => match err {
                LedgerError::NotOwner { .. } => StatusCode::FORBIDDEN,
                LedgerError::InsufficientBalance { .. }
                | LedgerError::CannotPayFee { .. }
                | LedgerError::InsufficientAllowance { .. }
                | LedgerError::Overflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
                LedgerError::AlreadyExempt(_) | LedgerError::NotExempt(_) => StatusCode::CONFLICT,
                LedgerError::RateTooHigh { .. } => StatusCode::BAD_REQUEST,
            },
            ApiError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Ledger(err) => ErrorBody {
                error: err.to_string(),
                code: err.code().to_string(),
            },
            ApiError::InvalidAddress(msg) => ErrorBody {
                error: msg,
                code: "invalid_address".to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::parse(raw).map_err(|e| ApiError::InvalidAddress(format!("{raw}: {e}")))
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/config", get(config_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/allowances/:owner/:spender", get(allowance_handler))
        .route("/transfer", post(transfer_handler))
        .route("/transfer-from", post(transfer_from_handler))
        .route("/approve", post(approve_handler))
        .route("/allowance/increase", post(increase_allowance_handler))
        .route("/allowance/decrease", post(decrease_allowance_handler))
        .route("/admin/protocol-perc", post(protocol_perc_handler))
        .route("/admin/protocol-wallet", post(protocol_wallet_handler))
        .route("/admin/exempt", post(exempt_handler))
        .route("/admin/unexempt", post(unexempt_handler))
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request Types
// ---------------------------------------------------------------------------

/// Body of `POST /transfer`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub caller: Address,
    pub to: Address,
    pub amount: u64,
}

/// Body of `POST /transfer-from`. `caller` is the spender.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferFromRequest {
    pub caller: Address,
    pub from: Address,
    pub to: Address,
    pub amount: u64,
}

/// Body of `POST /approve` and the allowance adjustments. `caller` is the
/// owner granting the allowance.
#[derive(Debug, Serialize, Deserialize)]
pub struct AllowanceRequest {
    pub caller: Address,
    pub spender: Address,
    pub amount: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProtocolPercRequest {
    pub caller: Address,
    pub rate_bps: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProtocolWalletRequest {
    pub caller: Address,
    pub wallet: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExemptionRequest {
    pub caller: Address,
    pub account: Address,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub total_supply: u64,
    pub fee_rate_bps: u32,
    pub accounts: usize,
    pub exempt_accounts: usize,
    /// BLAKE3 digest of the canonical ledger state.
    pub state_digest: String,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Address,
    pub balance: u64,
    pub exempt: bool,
    pub tokens_sent: u64,
    pub fees_paid: u64,
    /// Fee the account's outstanding allowances would cost at today's rate.
    pub allowance_holding: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllowanceResponse {
    pub owner: Address,
    pub spender: Address,
    pub allowance: u64,
    /// The owner's aggregate holding after this change.
    pub owner_holding: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub from: Address,
    pub to: Address,
    pub amount: u64,
    pub fee: u64,
}

impl TransferResponse {
    fn new(from: Address, to: Address, receipt: TransferReceipt) -> Self {
        Self {
            from,
            to,
            amount: receipt.amount,
            fee: receipt.fee,
        }
    }
}

fn account_view(ledger: &Ledger, address: Address) -> AccountResponse {
    let stats = ledger.stats_of(&address);
    AccountResponse {
        address,
        balance: ledger.balance_of(&address),
        exempt: ledger.is_exempt(&address),
        tokens_sent: stats.tokens_sent,
        fees_paid: stats.fees_paid,
        allowance_holding: ledger.allowance_holding(&address),
    }
}

fn allowance_view(ledger: &Ledger, owner: Address, spender: Address) -> AllowanceResponse {
    AllowanceResponse {
        owner,
        spender,
        allowance: ledger.allowance(&owner, &spender),
        owner_holding: ledger.allowance_holding(&owner),
    }
}

// ---------------------------------------------------------------------------
// Query Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — ledger-wide summary.
async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let ledger = state.ledger.read().await;
    Json(StatusResponse {
        version: state.version.clone(),
        total_supply: ledger.total_supply(),
        fee_rate_bps: ledger.protocol_perc(),
        accounts: ledger.account_count(),
        exempt_accounts: ledger.exemptions().len(),
        state_digest: ledger.state_digest(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /config`
async fn config_handler(State(state): State<AppState>) -> Json<LedgerConfig> {
    Json(state.ledger.read().await.config().clone())
}

/// `GET /accounts/:address` — unknown accounts report zeros.
async fn account_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let address = parse_address(&address)?;
    let ledger = state.ledger.read().await;
    Ok(Json(account_view(&ledger, address)))
}

/// `GET /allowances/:owner/:spender`
async fn allowance_handler(
    State(state): State<AppState>,
    Path((owner, spender)): Path<(String, String)>,
) -> Result<Json<AllowanceResponse>, ApiError> {
    let owner = parse_address(&owner)?;
    let spender = parse_address(&spender)?;
    let ledger = state.ledger.read().await;
    Ok(Json(allowance_view(&ledger, owner, spender)))
}

// ---------------------------------------------------------------------------
// Transfer Handlers
// ---------------------------------------------------------------------------

/// `POST /transfer` — moves `amount` from the caller, fee on top.
async fn transfer_handler(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let receipt = state
        .mutate("transfer", |l| l.transfer(req.caller, req.to, req.amount))
        .await?;
    Ok(Json(TransferResponse::new(req.caller, req.to, receipt)))
}

/// `POST /transfer-from` — spends the caller's allowance over `from`.
async fn transfer_from_handler(
    State(state): State<AppState>,
    Json(req): Json<TransferFromRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let receipt = state
        .mutate("transfer_from", |l| {
            l.transfer_from(req.caller, req.from, req.to, req.amount)
        })
        .await?;
    Ok(Json(TransferResponse::new(req.from, req.to, receipt)))
}

// ---------------------------------------------------------------------------
// Allowance Handlers
// ---------------------------------------------------------------------------

async fn approve_handler(
    State(state): State<AppState>,
    Json(req): Json<AllowanceRequest>,
) -> Result<Json<AllowanceResponse>, ApiError> {
    let view = state
        .mutate("approve", |l| {
            l.approve(req.caller, req.spender, req.amount)?;
            Ok(allowance_view(l, req.caller, req.spender))
        })
        .await?;
    Ok(Json(view))
}

async fn increase_allowance_handler(
    State(state): State<AppState>,
    Json(req): Json<AllowanceRequest>,
) -> Result<Json<AllowanceResponse>, ApiError> {
    let view = state
        .mutate("increase_allowance", |l| {
            l.increase_allowance(req.caller, req.spender, req.amount)?;
            Ok(allowance_view(l, req.caller, req.spender))
        })
        .await?;
    Ok(Json(view))
}

async fn decrease_allowance_handler(
    State(state): State<AppState>,
    Json(req): Json<AllowanceRequest>,
) -> Result<Json<AllowanceResponse>, ApiError> {
    let view = state
        .mutate("decrease_allowance", |l| {
            l.decrease_allowance(req.caller, req.spender, req.amount)?;
            Ok(allowance_view(l, req.caller, req.spender))
        })
        .await?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// Admin Handlers
// ---------------------------------------------------------------------------

async fn protocol_perc_handler(
    State(state): State<AppState>,
    Json(req): Json<ProtocolPercRequest>,
) -> Result<Json<LedgerConfig>, ApiError> {
    let config = state
        .mutate("set_protocol_perc", |l| {
            l.set_protocol_perc(req.caller, req.rate_bps)?;
            Ok(l.config().clone())
        })
        .await?;
    Ok(Json(config))
}

async fn protocol_wallet_handler(
    State(state): State<AppState>,
    Json(req): Json<ProtocolWalletRequest>,
) -> Result<Json<LedgerConfig>, ApiError> {
    let config = state
        .mutate("set_protocol_wallet", |l| {
            l.set_protocol_wallet(req.caller, req.wallet)?;
            Ok(l.config().clone())
        })
        .await?;
    Ok(Json(config))
}

async fn exempt_handler(
    State(state): State<AppState>,
    Json(req): Json<ExemptionRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let view = state
        .mutate("add_exempt", |l| {
            l.add_exempt(req.caller, req.account)?;
            Ok(account_view(l, req.account))
        })
        .await?;
    Ok(Json(view))
}

async fn unexempt_handler(
    State(state): State<AppState>,
    Json(req): Json<ExemptionRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let view = state
        .mutate("remove_exempt", |l| {
            l.remove_exempt(req.caller, req.account)?;
            Ok(account_view(l, req.account))
        })
        .await?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// `GET /ws` — WebSocket upgrade for live event streaming.
///
/// Clients receive one JSON-encoded [`LedgerEvent`] per message. The
/// connection is push-only; client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}
