use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::PublishState;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An event emitted while a deployment runs.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEvent {
    /// The pipeline is about to start.
    BeforeDeploy {
        /// The number of services and storages in the plan.
        total: usize,
    },

    /// The publish state of a service or storage changed.
    ServiceStateChanged {
        /// The name of the service or storage.
        name: String,

        /// The new state.
        state: PublishState,
    },

    /// An upload made progress.
    ServiceProgress {
        /// The name of the service.
        name: String,

        /// The progress, between `0.0` and `1.0`.
        progress: f32,
    },

    /// The deployment succeeded and the manifest was accepted.
    DeploySucceeded {
        /// The number of published services and storages.
        count: usize,
    },

    /// The deployment failed.
    DeployFailed {
        /// A human-readable reason.
        message: String,
    },
}

/// Fans deployment events out to every subscriber.
#[derive(Debug, Default, Clone)]
pub struct EventBus {
    subscribers: Vec<UnboundedSender<DeployEvent>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl EventBus {
    /// Adds a subscriber.
    pub fn subscribe(&mut self) -> UnboundedReceiver<DeployEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Sends an event to every subscriber. Subscribers that went away are skipped.
    pub fn emit(&self, event: DeployEvent) {
        for tx in &self.subscribers {
            let _ = tx.send(event.clone());
        }
    }

    /// Returns the number of subscribers that are still listening.
    pub fn live_subscribers(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_skips_closed_subscribers() {
        let mut bus = EventBus::default();
        let mut first = bus.subscribe();
        let second = bus.subscribe();
        drop(second);

        bus.emit(DeployEvent::BeforeDeploy { total: 2 });
        assert_eq!(bus.live_subscribers(), 1);
        assert_eq!(
            first.try_recv().unwrap(),
            DeployEvent::BeforeDeploy { total: 2 }
        );
    }
}
