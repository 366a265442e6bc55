//! Application middleware
//!
//! Each middleware has its own dedicated file following the framework convention.

mod auth;
mod logging;

pub use auth::{AuthMiddleware, AuthUser, TOKEN_COOKIE};
pub use logging::LoggingMiddleware;
