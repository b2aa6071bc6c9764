//! TrapWatch Library
//!
//! This library provides the backend of the TrapWatch dashboard: the trap
//! status model, the relay to the local detection service, and the web API
//! the dashboard frontend renders from.

// Module declarations
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod relay;
pub mod services;
pub mod web;
