//! # Shield Common Library
//!
//! Shared code for the exam-center monitoring backend:
//! - Database initialization and row models
//! - Event types (ShieldEvent enum) and the EventBus
//! - Configuration loading
//! - Operator / communication-type vocabulary normalization
//! - Timestamp helpers (all wire timestamps are GMT+1)

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;
pub mod vocab;

pub use error::{Error, Result};
