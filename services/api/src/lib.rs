//! services/api/src/lib.rs
//!
//! The HTTP service around `training_core`: configuration, the PostgreSQL adapter
//! and the axum web layer. The binaries in `src/bin` wire these together.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
