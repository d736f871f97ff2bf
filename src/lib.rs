// Selling-partner account records
pub mod account;

// HTTP API
pub mod api;

// Bearer-token gate
pub mod auth;

// Blob storage backends
pub mod blob;

// Configuration loading
pub mod config;

// Envelope codec, encryption service, envelope store
pub mod credentials;

// Error taxonomy
pub mod error;

// Store / get / validate orchestration
pub mod workflow;

pub use error::{CredentialError, Result};
