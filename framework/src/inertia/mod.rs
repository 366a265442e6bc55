mod config;
mod context;
mod response;

pub use config::InertiaConfig;
pub use context::InertiaContext;
pub use response::{Inertia, InertiaResponse};
