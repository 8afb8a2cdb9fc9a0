// Queue domain module
// Contains commands, queue items and their lifecycle status

pub mod queue_item;
pub mod value_objects;

pub use queue_item::{summarize, Command, QueueItem, RESULT_MAX_CHARS};
pub use value_objects::QueueStatus;
