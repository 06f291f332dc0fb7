//! Common library for the Turnstile services
//!
//! This crate provides functionality shared by the services in the
//! workspace: process settings, database connectivity and error types.

pub mod database;
pub mod error;
pub mod settings;

pub use settings::{AppEnvironment, Settings};
