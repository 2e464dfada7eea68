//! services/api/src/lib.rs
//!
//! Library half of the `api` service: adapters for the core ports, configuration,
//! the service error type, and the HTTP surface.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
