//! # EvHub Common Library
//!
//! Shared code for the EvHub services including:
//! - Error types
//! - Submission event types (SubmissionEvent enum) and EventBus
//! - Configuration loading and root folder resolution
//! - Database initialization

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
