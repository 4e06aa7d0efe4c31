//! Data models for brewdesk accounts.
//!
//! - `UserProfile`: the signed-in account as returned by `/auth/profile`
//! - Auth wire types: `LoginRequest`, `RegisterRequest`, `AuthResponse`
//! - `Credentials`: a normalized login/register result

pub mod auth;
pub mod user;

pub use auth::{AuthResponse, Credentials, LoginRequest, RegisterRequest};
pub use user::UserProfile;
