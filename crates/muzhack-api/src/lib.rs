//! Axum HTTP front end.
//!
//! This crate provides:
//! - `POST /jobs`, dispatching into the bounded job executor
//! - Liveness and readiness probes
//! - Prometheus metrics
//! - Request id, request logging and CORS middleware

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
