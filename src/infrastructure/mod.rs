// Infrastructure layer module
// Contains in-memory stores and the execution backend adapter
// Follows Hexagonal Architecture

pub mod http_session_transport;
pub mod repositories;
