pub mod agent_registry;
pub mod queue_repository;

pub use agent_registry::AgentRegistry;
pub use queue_repository::{QueueRepository, QueueTransition};
