//! # Prompt Templates
//!
//! `core` holds the fixed instruction text sent to the completion endpoint;
//! `context` assembles the bounded schema/discovery context from a snapshot.

pub mod context;
pub mod core;
