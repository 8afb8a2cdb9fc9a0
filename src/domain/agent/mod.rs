// Agent domain module
// Contains the agent entity and its value objects

#![allow(clippy::module_inception)]

pub mod agent;
pub mod value_objects;

pub use agent::{Agent, DEFAULT_EMOJI, DEFAULT_OUTPUT_CAPACITY};
pub use value_objects::AgentStatus;
