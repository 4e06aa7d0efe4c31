//! brewdesk core: the account and session layer of the coffee-shop
//! management app.
//!
//! - `api`: JSON client for the register/login/profile endpoints
//! - `auth`: credential storage and the `SessionManager` state machine
//! - `bootstrap`: startup wiring and session restore
//! - `diagnostics`: read-only report on the stored session
//! - `events`: the navigation port session transitions are published on
//! - `config`, `validation`, `utils`: supporting pieces for front ends

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod diagnostics;
pub mod events;
pub mod models;
pub mod utils;
pub mod validation;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthAction, AuthError, SessionManager, SessionSnapshot, SessionStatus};
pub use config::Config;
pub use events::{Route, SessionEvent};
pub use models::UserProfile;
