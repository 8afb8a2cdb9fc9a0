// Connection state for the execution backend
//
// The monitor is the single source of truth for whether commands go to the
// remote backend or the local simulator.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::events::EventBroadcaster;
use crate::domain::events::{ConnectionState, ConnectionStatus, SquadEvent};

/// Tracks the backend connection and announces every change
#[derive(Clone)]
pub struct ConnectionMonitor {
    status: Arc<watch::Sender<ConnectionStatus>>,
    events: EventBroadcaster,
}

impl ConnectionMonitor {
    pub fn new(events: EventBroadcaster) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::new(ConnectionState::Disconnected));
        Self {
            status: Arc::new(status),
            events,
        }
    }

    pub fn current(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    pub fn set_connecting(&self) {
        self.set(ConnectionStatus::new(ConnectionState::Connecting));
    }

    pub fn set_connected(&self) {
        self.set(ConnectionStatus::new(ConnectionState::Connected));
    }

    pub fn set_disconnected(&self) {
        self.set(ConnectionStatus::new(ConnectionState::Disconnected));
    }

    pub fn mark_error(&self, error: impl Into<String>) {
        self.set(ConnectionStatus::failed(error));
    }

    fn set(&self, next: ConnectionStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });

        if changed {
            info!(state = ?next.state, error = ?next.error, "Backend connection status changed");
            self.events.publish(SquadEvent::ConnectionStatusChanged {
                state: next.state,
                error: next.error,
            });
        }
    }
}
