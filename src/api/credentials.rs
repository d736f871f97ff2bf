use super::{check_token, parse_body, AppError, AppState};
use crate::workflow::{
    AccountKeyRequest, GetCredentialsOutput, StoreCredentialsOutput, StoreCredentialsRequest,
    ValidateAccountOutput,
};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::post,
    Router,
};
use std::sync::Arc;

/// Create credential API router
pub fn create_credentials_router(state: AppState) -> Router {
    Router::new()
        .route("/api/credentials/store", post(store_credentials))
        .route("/api/credentials/get", post(get_credentials))
        .route("/api/credentials/validate", post(validate_account))
        .with_state(Arc::new(state))
}

/// POST /api/credentials/store - Encrypt and persist an account's credentials
async fn store_credentials(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StoreCredentialsOutput>, AppError> {
    check_token(&state, &headers)?;
    let request: StoreCredentialsRequest = parse_body(&body)?;

    let output = state.workflows.store_credentials(request).await?;
    Ok(Json(output))
}

/// POST /api/credentials/get - Decrypt an account's credentials
///
/// POST rather than GET so key and nonce travel in the body, not the URL.
async fn get_credentials(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GetCredentialsOutput>, AppError> {
    check_token(&state, &headers)?;
    let request: AccountKeyRequest = parse_body(&body)?;

    let output = state.workflows.get_credentials(request).await?;
    Ok(Json(output))
}

/// POST /api/credentials/validate - Check stored credentials decrypt
async fn validate_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ValidateAccountOutput>, AppError> {
    check_token(&state, &headers)?;
    let request: AccountKeyRequest = parse_body(&body)?;

    let output = state.workflows.validate_account(request).await?;
    Ok(Json(output))
}
