//! REST API client module for the brewdesk account service.
//!
//! This module provides the `ApiClient` for the register, login and profile
//! endpoints, and the `ApiError` taxonomy every request failure maps into.
//!
//! Authenticated calls use a bearer token obtained from login or register.

pub mod client;
pub mod error;

pub use client::{ApiClient, REQUEST_TIMEOUT_SECS};
pub use error::{network_guidance, ApiError};
