use super::{check_token, parse_body, AppError, AppState};
use crate::account::{Account, AccountDirectory, RegistrationError};
use crate::workflow::DeleteAccountOutput;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Request to register a new account
#[derive(Deserialize)]
pub struct RegisterAccountRequest {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Response for account listing
#[derive(Serialize, Deserialize)]
pub struct AccountList {
    pub accounts: Vec<Account>,
}

/// Create account API router
pub fn create_accounts_router(state: AppState) -> Router {
    Router::new()
        .route("/api/accounts", get(list_accounts).post(register_account))
        .route("/api/accounts/:id", delete(delete_account))
        .with_state(Arc::new(state))
}

/// GET /api/accounts - List registered accounts, ordered by id
async fn list_accounts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AccountList>, AppError> {
    check_token(&state, &headers)?;

    let all = state.registry.get_all().await.map_err(|e| {
        error!(error = %format!("{:#}", e), "Failed to list accounts");
        AppError::InternalServerError
    })?;

    let mut accounts: Vec<Account> = all.into_values().collect();
    accounts.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(Json(AccountList { accounts }))
}

/// POST /api/accounts - Register a new account
async fn register_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Account>), AppError> {
    check_token(&state, &headers)?;
    let request: RegisterAccountRequest = parse_body(&body)?;

    let account = state
        .registry
        .register(&request.id, &request.name)
        .map_err(|e| match e {
            RegistrationError::InvalidId(v) => AppError::BadRequest(v.to_string()),
            RegistrationError::AlreadyExists => {
                AppError::Conflict(format!("Account '{}' already exists", request.id))
            }
            RegistrationError::Storage(msg) => {
                error!(account_id = %request.id, error = %msg, "Failed to persist account");
                AppError::InternalServerError
            }
        })?;

    info!(account_id = %account.id, "Account registered");
    Ok((StatusCode::CREATED, Json(account)))
}

/// DELETE /api/accounts/:id - Remove an account (stored envelopes are kept)
async fn delete_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteAccountOutput>, AppError> {
    check_token(&state, &headers)?;

    let output = state.workflows.delete_account(&id).await?;
    Ok(Json(output))
}
