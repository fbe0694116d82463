//! # Dothe2 Worker Library
//!
//! Background maintenance for the Dothe2 store.
//!
//! ## Modules
//!
//! - `config`: Worker configuration
//! - `sweeper`: Periodic deletion of expired login tokens

pub mod config;
pub mod sweeper;
