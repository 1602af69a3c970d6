//! State management module
//!
//! Handles shared server state and per-run client construction.

pub mod app_state;

pub use app_state::{AppState, SharedState};
