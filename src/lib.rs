//! Squad API Library
//!
//! This library provides the core functionality for the Squad control API,
//! including the agent roster, command routing, execution backends and the
//! HTTP/WebSocket layer.

pub mod agents;
pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use agents::{SquadError, SquadResult};
