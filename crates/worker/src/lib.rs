//! MIA worker service library.
//!
//! One worker owns one GPU and serves `POST /animate`: it authenticates the
//! caller, validates the mesh, runs the external animation pipeline under an
//! exclusive GPU lease and returns the produced artifacts base64-encoded.
//! The binary entrypoint lives in `main.rs`; everything is exposed here so
//! integration tests can build the same application.

pub mod auth;
pub mod config;
pub mod error;
pub mod library;
pub mod middleware;
pub mod pipeline;
pub mod process;
pub mod render;
pub mod router;
pub mod routes;
pub mod scratch;
pub mod service;
pub mod state;
