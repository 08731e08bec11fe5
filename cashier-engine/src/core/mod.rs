//! Core module - engine configuration
//!
//! - [`EngineConfig`] - settings loaded from the environment

pub mod config;

pub use config::EngineConfig;
