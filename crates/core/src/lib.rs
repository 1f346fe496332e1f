//! Shared domain types for the animation dispatch services.
//!
//! Holds everything both the router and the worker need without pulling in
//! any HTTP machinery: the job wire types, mesh payload validation, the
//! static deployment table and the round-robin worker pool.

pub mod config;
pub mod deployment;
pub mod error;
pub mod job;
pub mod mesh;
pub mod pool;
