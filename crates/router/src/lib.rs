//! MIA router service library.
//!
//! The router is the public entry point for animation jobs. It owns no GPU
//! and does no validation beyond the request envelope: each `POST /animate`
//! is forwarded to the next worker in a fixed pool, round-robin, and the
//! worker's answer is relayed back. The binary entrypoint lives in
//! `main.rs`; everything is exposed here so integration tests can build the
//! same application.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod router;
pub mod routes;
pub mod state;
