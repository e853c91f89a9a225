//! SkinRx Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod inference;
pub mod orchestrator;
pub mod services;
/// Per-user session state and change notification
pub mod session;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod websocket;
