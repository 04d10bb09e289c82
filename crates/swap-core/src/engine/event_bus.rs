//! Event bus for notifying the UI layer.
//!
//! A broadcast channel of [`SwapEvent`]s. Views subscribe and re-render on
//! the events they care about.

use swap_types::SwapEvent;
use tokio::sync::broadcast;

/// Event bus for broadcasting swap events to multiple subscribers.
pub struct EventBus {
	sender: broadcast::Sender<SwapEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	///
	/// Slow subscribers lose the oldest events once `capacity` are buffered.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Creates a new subscriber receiving every event published afterwards.
	pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error if there are no active subscribers.
	pub fn publish(&self, event: SwapEvent) -> Result<(), broadcast::error::SendError<SwapEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use swap_types::SwapPhase;

	#[test]
	fn test_publish_without_subscribers_fails() {
		let event_bus = EventBus::new(10);
		assert!(event_bus.publish(SwapEvent::QuoteCleared).is_err());
	}

	#[tokio::test]
	async fn test_clones_share_the_channel() {
		let event_bus = EventBus::new(10);
		let mut receiver = event_bus.subscribe();
		let clone = event_bus.clone();

		clone
			.publish(SwapEvent::PhaseChanged {
				from: SwapPhase::Idle,
				to: SwapPhase::Validating,
			})
			.unwrap();
		event_bus.publish(SwapEvent::BalancesStale).unwrap();

		assert!(matches!(
			receiver.recv().await.unwrap(),
			SwapEvent::PhaseChanged {
				to: SwapPhase::Validating,
				..
			}
		));
		assert!(matches!(
			receiver.recv().await.unwrap(),
			SwapEvent::BalancesStale
		));
	}

	#[tokio::test]
	async fn test_multiple_subscribers() {
		let event_bus = EventBus::new(10);
		let mut first = event_bus.subscribe();
		let mut second = event_bus.subscribe();

		event_bus.publish(SwapEvent::QuoteCleared).unwrap();

		assert!(matches!(first.recv().await.unwrap(), SwapEvent::QuoteCleared));
		assert!(matches!(second.recv().await.unwrap(), SwapEvent::QuoteCleared));
	}
}
