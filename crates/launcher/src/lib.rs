//! Starts one worker per GPU plus the router for an environment, and keeps
//! them running as a unit: when any of them exits, or the launcher is asked
//! to stop, every child is stopped.

pub mod config;
pub mod error;
pub mod plan;
pub mod supervisor;
