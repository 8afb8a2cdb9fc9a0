// Event broadcasting for UI observers
//
// Every published event gets a sequence number and lands both on a tokio
// broadcast channel (live subscribers) and in a bounded backlog (polling
// and late-joining observers).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

use crate::domain::events::{OutputKind, SquadEvent};

/// Default backlog and channel capacity
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// A published event with its position in the stream
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub seq: u64,
    pub published_at: DateTime<Utc>,
    pub event: SquadEvent,
}

struct Backlog {
    next_seq: u64,
    events: VecDeque<EventEnvelope>,
}

struct Shared {
    sender: broadcast::Sender<EventEnvelope>,
    backlog: Mutex<Backlog>,
    capacity: usize,
}

/// Fan-out of squad events to any number of observers
///
/// Publishing never waits on subscribers: slow receivers see
/// `RecvError::Lagged` and are expected to resync from a snapshot.
#[derive(Clone)]
pub struct EventBroadcaster {
    shared: Arc<Shared>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            shared: Arc::new(Shared {
                sender,
                backlog: Mutex::new(Backlog {
                    next_seq: 1,
                    events: VecDeque::with_capacity(capacity),
                }),
                capacity,
            }),
        }
    }

    /// Publish an event, returning its sequence number
    pub fn publish(&self, event: SquadEvent) -> u64 {
        let mut backlog = self
            .shared
            .backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let envelope = EventEnvelope {
            seq: backlog.next_seq,
            published_at: Utc::now(),
            event,
        };
        backlog.next_seq += 1;

        backlog.events.push_back(envelope.clone());
        while backlog.events.len() > self.shared.capacity {
            backlog.events.pop_front();
        }

        // Sent under the lock so live order matches sequence order.
        // No receivers is not an error.
        let _ = self.shared.sender.send(envelope.clone());
        envelope.seq
    }

    /// Publish a line for the live output stream
    pub fn output(
        &self,
        agent_id: Option<&str>,
        agent_name: &str,
        kind: OutputKind,
        text: impl Into<String>,
    ) -> u64 {
        self.publish(SquadEvent::OutputLine {
            text: text.into(),
            kind,
            timestamp: Utc::now(),
            agent_id: agent_id.map(str::to_string),
            agent_name: agent_name.to_string(),
        })
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.shared.sender.subscribe()
    }

    /// Buffered events with a sequence number greater than `seq`
    pub fn since(&self, seq: u64) -> Vec<EventEnvelope> {
        self.shared
            .backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .iter()
            .filter(|envelope| envelope.seq > seq)
            .cloned()
            .collect()
    }

    /// Sequence number of the most recent event, 0 if none
    pub fn last_seq(&self) -> u64 {
        self.shared
            .backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_seq
            - 1
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}
