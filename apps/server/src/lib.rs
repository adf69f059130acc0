//! Oxygen server - HTTP proxy between the marketing site and Salesforce.
//!
//! The binary lives in `main.rs`; this library surface exists so integration
//! tests can assemble the router against mock backends.

pub mod api;
pub mod config;
pub mod error;
pub mod main_lib;

pub use main_lib::{build_state, init_tracing, AppState};
