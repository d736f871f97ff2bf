//! HTTP boundary for the vault.
//!
//! Routes:
//! - `POST /api/credentials/store`, `/get`, `/validate`
//! - `GET|POST /api/accounts`, `DELETE /api/accounts/:id`
//!
//! Every route honours the optional bearer token in [`AppState::api_token`].

pub mod accounts;
pub mod credentials;


pub use accounts::create_accounts_router;
pub use credentials::create_credentials_router;

use crate::account::AccountRegistry;
use crate::auth::authorize;
use crate::error::CredentialError;
use crate::workflow::CredentialWorkflows;
use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Shared state for all vault routes
#[derive(Clone)]
pub struct AppState {
    pub workflows: CredentialWorkflows,
    pub registry: Arc<AccountRegistry>,
    /// Required bearer token. None = every request admitted.
    pub api_token: Option<String>,
}

/// Full vault API: credential and account routes
pub fn create_router(state: AppState) -> Router {
    create_credentials_router(state.clone()).merge(create_accounts_router(state))
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// API error types
#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// Envelope rejected or decrypted data malformed
    Unprocessable(String),
    InternalServerError,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::InvalidData(msg) => AppError::BadRequest(msg),
            CredentialError::NotFound(msg) => AppError::NotFound(msg),
            CredentialError::Decryption | CredentialError::DataFormat => {
                AppError::Unprocessable(e.to_string())
            }
            CredentialError::Internal(inner) => {
                error!(error = %format!("{:#}", inner), "Credential operation failed");
                AppError::InternalServerError
            }
        }
    }
}

/// Rejects the request unless it carries the configured bearer token.
fn check_token(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    authorize(headers, state.api_token.as_deref()).map_err(|e| {
        debug!(reason = %e, "Rejected unauthenticated request");
        AppError::Unauthorized(e.to_string())
    })
}

/// Parses a JSON body without echoing its contents in the error.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        AppError::BadRequest(format!("Invalid JSON body ({:?} error)", e.classify()))
    })
}
