// Agent orchestration modules
//
// Routing, delegation and execution of commands across the squad roster,
// plus the event stream that observers follow.

pub mod backend;
pub mod delegation;
pub mod errors;
pub mod events;
pub mod messages;
pub mod prompts;
pub mod remote;
pub mod router;
pub mod selector;
pub mod simulator;
pub mod state;
pub mod types;
pub mod worker;

// Re-export main types
pub use backend::{ConnectPolicy, ExecutionBackend, Executor, OutputSink};
pub use delegation::{DelegationAnalyzer, PatternDelegationAnalyzer};
pub use errors::{SquadError, SquadResult};
pub use events::{EventBroadcaster, EventEnvelope};
pub use remote::{RemoteExecutionClient, SessionTransport};
pub use router::{CommandRouter, RouterConfig};
pub use simulator::{LocalSimulator, SimulatorPacing};
pub use state::ConnectionMonitor;
pub use types::{Delegation, DelegationPlan, StateSnapshot};
