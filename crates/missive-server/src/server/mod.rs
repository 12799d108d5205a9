//! Server-side components of the `missive` HTTP service.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration and validation.
//! - [`telemetry`] - `tracing` subscriber setup.
//! - [`error`] - the JSON error model and store error mapping.
//! - [`pipeline`] - request context resolution that runs before handlers.
//! - [`wire`] - request and response bodies plus the cursor link.
//! - [`service`] - shared state and the route handlers.
//! - [`router`] - the route table and middleware stack.
//!
//! These components are wired together in the server's `main.rs`.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod router;
pub mod service;
pub mod telemetry;
pub mod wire;
