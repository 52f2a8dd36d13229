//! REST API client module for the attendance service.
//!
//! This module provides the `ApiClient` session client. Every request
//! carries the stored bearer token; an expired token is renewed once via
//! the refresh endpoint (the refresh cookie travels in the transport's
//! cookie store) and the request retried. If renewal fails the local
//! session is wiped and the `LoginRedirect` hook fires.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{ApiClient, LoginRedirect, LogoutOutcome, NoRedirect, LOGIN_ENDPOINT};
pub use error::{ApiError, TOKEN_EXPIRED_MESSAGE};
pub use transport::{
    ApiResponse, FileUpload, HttpTransport, PendingRequest, Transport, DEFAULT_REQUEST_TIMEOUT_SECS,
};
