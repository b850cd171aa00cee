//! Broadcast-channel streaming gateway
//!
//! Fans run events out to any number of in-process subscribers through
//! `tokio::sync::broadcast`. Channels are created lazily on first publish
//! or subscribe and torn down when the run's terminal event goes out;
//! subscribers still drain buffered events after teardown.

use arena_application::ports::stream_gateway::{RunEvent, StreamChannel, StreamGateway};
use arena_domain::RunId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 256;

/// In-process streaming gateway backed by broadcast channels
pub struct BroadcastStreamGateway {
    capacity: usize,
    senders: Mutex<HashMap<(RunId, StreamChannel), broadcast::Sender<RunEvent>>>,
}

impl Default for BroadcastStreamGateway {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl BroadcastStreamGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity is per run and channel; slow subscribers that fall more
    /// than `capacity` events behind observe a lag error.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            senders: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to one channel of a run's event stream.
    pub fn subscribe(&self, run_id: &RunId, channel: StreamChannel) -> broadcast::Receiver<RunEvent> {
        self.sender(run_id, channel).subscribe()
    }

    fn sender(&self, run_id: &RunId, channel: StreamChannel) -> broadcast::Sender<RunEvent> {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        senders
            .entry((run_id.clone(), channel))
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    fn release(&self, run_id: &RunId, channel: StreamChannel) {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        let _ = senders.remove(&(run_id.clone(), channel));
    }
}

impl StreamGateway for BroadcastStreamGateway {
    fn publish(&self, run_id: &RunId, channel: StreamChannel, event: RunEvent) {
        let terminal = event.is_terminal();
        // A send error just means nobody is listening
        let _ = self.sender(run_id, channel).send(event);
        trace!("Published event on {run_id} ({channel:?})");
        if terminal {
            self.release(run_id, channel);
        }
    }
}

/// Gateway that replays every publish onto a set of downstream gateways.
///
/// Addresses come from the first gateway, so put the one clients subscribe
/// through at the front.
pub struct FanoutGateway {
    gateways: Vec<Arc<dyn StreamGateway>>,
}

impl FanoutGateway {
    pub fn new(gateways: Vec<Arc<dyn StreamGateway>>) -> Self {
        Self { gateways }
    }
}

impl StreamGateway for FanoutGateway {
    fn publish(&self, run_id: &RunId, channel: StreamChannel, event: RunEvent) {
        for gateway in &self.gateways {
            gateway.publish(run_id, channel, event.clone());
        }
    }

    fn primary_address(&self, run_id: &RunId) -> String {
        match self.gateways.first() {
            Some(gateway) => gateway.primary_address(run_id),
            None => format!("runs/{run_id}"),
        }
    }

    fn debug_address(&self, run_id: &RunId) -> String {
        match self.gateways.first() {
            Some(gateway) => gateway.debug_address(run_id),
            None => format!("runs/{run_id}/debug"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_domain::RunStatus;

    fn delta(variant: &str, text: &str) -> RunEvent {
        RunEvent::VariantDelta {
            variant_id: variant.to_string(),
            content: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_events() {
        let gateway = BroadcastStreamGateway::new();
        let run_id = RunId::new("run-1");

        let mut rx = gateway.subscribe(&run_id, StreamChannel::Primary);
        gateway.publish(&run_id, StreamChannel::Primary, delta("v1", "hello"));

        match rx.recv().await.unwrap() {
            RunEvent::VariantDelta { content, .. } => assert_eq!(content, "hello"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let gateway = BroadcastStreamGateway::new();
        let run_id = RunId::new("run-1");

        let mut primary = gateway.subscribe(&run_id, StreamChannel::Primary);
        let mut debug = gateway.subscribe(&run_id, StreamChannel::Debug);

        gateway.publish(
            &run_id,
            StreamChannel::Debug,
            RunEvent::Diagnostic {
                message: "probe".to_string(),
            },
        );

        assert!(matches!(
            debug.recv().await.unwrap(),
            RunEvent::Diagnostic { .. }
        ));
        assert!(matches!(
            primary.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_terminal_event_closes_the_stream() {
        let gateway = BroadcastStreamGateway::new();
        let run_id = RunId::new("run-1");

        let mut rx = gateway.subscribe(&run_id, StreamChannel::Primary);
        gateway.publish(
            &run_id,
            StreamChannel::Primary,
            RunEvent::RunCompleted {
                run_id: run_id.clone(),
                status: RunStatus::Completed,
                total_cost: 0.0,
            },
        );

        // Buffered terminal event still arrives, then the channel closes
        assert!(rx.recv().await.unwrap().is_terminal());
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_panic() {
        let gateway = BroadcastStreamGateway::new();
        gateway.publish(&RunId::new("run-x"), StreamChannel::Primary, delta("v", "x"));
    }

    #[tokio::test]
    async fn test_fanout_replicates_to_all_gateways() {
        let a = Arc::new(BroadcastStreamGateway::new());
        let b = Arc::new(BroadcastStreamGateway::new());
        let fanout = FanoutGateway::new(vec![a.clone(), b.clone()]);
        let run_id = RunId::new("run-1");

        let mut rx_a = a.subscribe(&run_id, StreamChannel::Primary);
        let mut rx_b = b.subscribe(&run_id, StreamChannel::Primary);
        fanout.publish(&run_id, StreamChannel::Primary, delta("v1", "x"));

        assert!(rx_a.recv().await.is_ok());
        assert!(rx_b.recv().await.is_ok());
        assert_eq!(fanout.primary_address(&run_id), "runs/run-1");
    }
}
