pub mod in_memory_agent_registry;
pub mod in_memory_queue_repository;

pub use in_memory_agent_registry::InMemoryAgentRegistry;
pub use in_memory_queue_repository::{InMemoryQueueRepository, DEFAULT_HISTORY_LIMIT};
