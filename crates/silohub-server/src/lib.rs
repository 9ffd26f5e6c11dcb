//! HTTP control-plane surface for silohub.

pub mod api;
pub mod config;
pub mod observability;
pub mod routes;
pub mod server;

pub use api::ApiError;
pub use config::AppConfig;
pub use server::{AppState, ServerBuilder, SilohubServer, build_app, build_state, spawn_workers};
