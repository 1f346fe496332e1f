//! Command-line client for `POST /animate`: uploads a mesh, then writes the
//! animated mesh and any previews the service returned to disk.

pub mod client;
pub mod config;
pub mod error;
pub mod output;
