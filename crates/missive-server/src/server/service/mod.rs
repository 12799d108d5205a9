//! HTTP service implementation.
//!
//! ## Structure
//!
//! - [`state`] - shared application state and the blocking-pool bridge to
//!   the store.
//! - [`handler`] - one async handler per route.

pub mod handler;
pub mod state;
