//! HTTP surface for the unfurl engine.
pub mod config;
pub mod routes;

pub use config::ServerConfig;
pub use routes::{build_router, AppState};
