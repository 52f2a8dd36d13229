//! Core library for absensi: the authenticated session client for the
//! work-from-home attendance API.
//!
//! - [`api`]: `ApiClient`, the session client with single refresh-and-retry
//!   on token expiry, plus typed attendance, profile and notification calls
//! - [`auth`]: credential storage and access-token claims
//! - [`config`]: on-disk configuration
//! - [`models`]: request/response types

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, LoginRedirect};
pub use auth::{AuthData, CredentialStore};
pub use config::Config;
