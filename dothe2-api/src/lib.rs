//! # Dothe2 API Server Library
//!
//! HTTP surface over the shared services.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `email`: SMTP notification sender
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod email;
pub mod error;
pub mod routes;
