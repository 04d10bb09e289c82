//! Owned debounce timer.
//!
//! At most one timer is armed. Scheduling replaces the armed timer, and the
//! replaced one never fires. Once a timer fires, its work runs in a task of
//! its own, so later scheduling or cancelling does not interrupt it.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Debouncer {
	delay: Duration,
	pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
	pub fn new(delay: Duration) -> Self {
		Self {
			delay,
			pending: Mutex::new(None),
		}
	}

	pub fn delay(&self) -> Duration {
		self.delay
	}

	/// Runs `task` after the quiet period unless replaced or cancelled first.
	pub fn schedule<F>(&self, task: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let delay = self.delay;
		let timer = tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			tokio::spawn(task);
		});

		let previous = self
			.pending
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.replace(timer);
		if let Some(previous) = previous {
			previous.abort();
		}
	}

	/// Disarms the timer. Returns true if one was still waiting.
	pub fn cancel(&self) -> bool {
		let pending = self
			.pending
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		match pending {
			Some(timer) => {
				let waiting = !timer.is_finished();
				timer.abort();
				waiting
			},
			None => false,
		}
	}

	/// Whether a timer is armed and has not fired yet.
	pub fn is_pending(&self) -> bool {
		self.pending
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.as_ref()
			.is_some_and(|timer| !timer.is_finished())
	}
}

impl Drop for Debouncer {
	fn drop(&mut self) {
		self.cancel();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	fn counter_task(counter: &Arc<AtomicUsize>, value: usize) -> impl Future<Output = ()> {
		let counter = counter.clone();
		async move {
			counter.store(value, Ordering::SeqCst);
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_only_last_schedule_fires() {
		let debouncer = Debouncer::new(Duration::from_millis(500));
		let fired = Arc::new(AtomicUsize::new(0));

		for value in 1..=3 {
			debouncer.schedule(counter_task(&fired, value));
			tokio::time::sleep(Duration::from_millis(200)).await;
		}
		assert_eq!(fired.load(Ordering::SeqCst), 0);

		tokio::time::sleep(Duration::from_millis(400)).await;
		assert_eq!(fired.load(Ordering::SeqCst), 3);
		assert!(!debouncer.is_pending());
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancel_prevents_firing() {
		let debouncer = Debouncer::new(Duration::from_millis(500));
		let fired = Arc::new(AtomicUsize::new(0));

		debouncer.schedule(counter_task(&fired, 1));
		assert!(debouncer.is_pending());
		assert!(debouncer.cancel());
		assert!(!debouncer.cancel());

		tokio::time::sleep(Duration::from_secs(1)).await;
		assert_eq!(fired.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_fired_work_survives_replacement() {
		let debouncer = Debouncer::new(Duration::from_millis(100));
		let finished = Arc::new(AtomicUsize::new(0));

		let flag = finished.clone();
		debouncer.schedule(async move {
			tokio::time::sleep(Duration::from_secs(5)).await;
			flag.store(1, Ordering::SeqCst);
		});
		tokio::time::sleep(Duration::from_millis(150)).await;

		// Work of the first timer is already running.
		debouncer.schedule(async {});
		debouncer.cancel();
		tokio::time::sleep(Duration::from_secs(6)).await;
		assert_eq!(finished.load(Ordering::SeqCst), 1);
	}
}
