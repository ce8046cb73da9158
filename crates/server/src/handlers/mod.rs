//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for `askdb-server`.

pub mod chat;
pub mod db_handlers;
pub mod general;

pub use chat::*;
pub use db_handlers::*;
pub use general::*;

// Shared items used by multiple handler modules.
use super::{errors::AppError, state::AppState};
