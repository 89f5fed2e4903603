//! # PetPort HTTP Server
//!
//! Exposes the lifecycle jobs as HTTP functions.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/functions/*` - Grace period and corruption functions
//! - `/observability/*` - Health and counters

pub mod config;
pub mod functions_routes;
pub mod observability_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use functions_routes::{functions_routes, ErrorResponse, FunctionsState};
pub use server::HttpServer;
