//! Axum HTTP shim over the learning-to-content pipeline.
//!
//! This crate provides:
//! - Webhook intake answering 202 with a pollable workflow handle
//! - Workflow status polling backed by a bounded in-process registry
//! - Table maintenance endpoints
//! - Rate limiting, request ids and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use registry::WorkflowRegistry;
pub use routes::create_router;
pub use state::AppState;
