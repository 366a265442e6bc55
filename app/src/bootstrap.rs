//! Runtime registrations
//!
//! Runs once the database is connected, before the server or a worker
//! starts.

use campus::global_middleware;

use crate::middleware;

/// Register global middleware
pub async fn register() {
    global_middleware!(middleware::LoggingMiddleware);
}
