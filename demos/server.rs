//! Simple REST API server example for the transfer engine.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /v1/transfers` - Transfer funds between two accounts
//! - `GET /v1/accounts/{id}` - Get an account by id
//!
//! Two accounts are seeded on startup: `1` with 1000.00 and `2` with 500.00.
//!
//! ## Example Usage
//!
//! ```bash
//! # Transfer
//! curl -X POST http://localhost:3000/v1/transfers \
//!   -H "Content-Type: application/json" \
//!   -d '{"accountFromId": "1", "accountToId": "2", "amount": "200.00"}'
//!
//! # Get account
//! curl http://localhost:3000/v1/accounts/1
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use funds_transfer_rs::logging::init_logging;
use funds_transfer_rs::{
    Account, AccountId, AccountRepository, InMemoryAccountRepository, LoggingNotificationService,
    TransferEngine, TransferError, TransferRequest,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

// === Application State ===

/// Shared application state containing the engine and its account store.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TransferEngine>,
    pub accounts: Arc<InMemoryAccountRepository>,
}

// === Error Handling ===

/// Wrapper for converting `TransferError` into HTTP responses.
pub struct AppError(TransferError);

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self.0 {
            TransferError::InvalidAccountId
            | TransferError::InvalidAmount
            | TransferError::AccountNotFound(_)
            | TransferError::InsufficientFunds(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string()).into_response()
            }
            TransferError::LockTimeout(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string()).into_response()
            }
            TransferError::Overflow => {
                error!(error = %self.0, "transfer failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred",
                )
                    .into_response()
            }
        }
    }
}

// === Handlers ===

/// POST /v1/transfers - Transfer funds.
async fn transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, &'static str), AppError> {
    // Lock waits can block for the full timeout; keep them off the async workers.
    let engine = state.engine.clone();
    let outcome = tokio::task::spawn_blocking(move || engine.transfer(&request)).await;
    match outcome {
        Ok(result) => {
            result?;
            Ok((StatusCode::OK, "Transfer successful"))
        }
        Err(e) => {
            error!(error = %e, "transfer task failed");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred",
            ))
        }
    }
}

/// GET /v1/accounts/{id} - Get account by id.
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Account>, (StatusCode, String)> {
    let account_id = AccountId::from(id);
    state
        .accounts
        .get_account(&account_id)
        .map(|shared| Json(shared.lock().clone()))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                TransferError::AccountNotFound(account_id).to_string(),
            )
        })
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/transfers", post(transfer))
        .route("/v1/accounts/{id}", get(get_account))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(false);

    let accounts = Arc::new(InMemoryAccountRepository::new());
    accounts.create_account(Account::with_balance(AccountId::from("1"), dec!(1000.00))?)?;
    accounts.create_account(Account::with_balance(AccountId::from("2"), dec!(500.00))?)?;

    let state = AppState {
        engine: Arc::new(TransferEngine::new(
            accounts.clone(),
            Arc::new(LoggingNotificationService),
        )),
        accounts,
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    info!("Transfer API server running on http://127.0.0.1:3000");
    info!("  POST /v1/transfers      - Transfer funds");
    info!("  GET  /v1/accounts/{{id}}  - Get account by id");

    axum::serve(listener, app).await?;
    Ok(())
}
