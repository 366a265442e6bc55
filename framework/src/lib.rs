//! Campus framework
//!
//! Laravel-style building blocks for the Campus school management service:
//! hyper serving with matchit routing and middleware, a service container,
//! `.env` configuration, SeaORM models with tenant scoping and soft deletes,
//! Inertia page responses, table queries, a database-backed job queue and
//! notifications.

pub mod app;
pub mod config;
pub mod container;
pub mod database;
pub mod error;
pub mod export;
pub mod http;
pub mod inertia;
pub mod logging;
pub mod middleware;
pub mod notification;
pub mod query;
pub mod queue;
pub mod routing;
pub mod server;
pub mod testing;

pub use app::Application;
pub use config::{env, env_optional, AppConfig, Config, Environment, ServerConfig};
pub use container::App;
pub use database::{DatabaseConfig, DbConnection, DB};
pub use error::{AppError, FrameworkError, ValidationErrors, GENERIC_ERROR_MESSAGE};
pub use http::{FormRequest, HttpResponse, Redirect, Request, Response, ResponseExt};
pub use inertia::{Inertia, InertiaConfig, InertiaContext};
pub use middleware::{Middleware, Next};
pub use routing::{route, validate_route_path, GroupDef, Router};
pub use server::Server;

#[doc(hidden)]
pub use routing::__route_impl;

pub use async_trait::async_trait;
pub use inventory;
pub use serde_json;

/// JSON response from `serde_json::json!` syntax
///
/// ```rust,ignore
/// json_response!({ "id": student.id, "name": student.full_name() })
/// ```
#[macro_export]
macro_rules! json_response {
    ($($json:tt)+) => {
        ::std::result::Result::<$crate::HttpResponse, $crate::HttpResponse>::Ok(
            $crate::HttpResponse::json($crate::serde_json::json!($($json)+))
        )
    };
}
