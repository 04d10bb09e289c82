//! Sliding-window rate limiter.
//!
//! Each API family gets its own limiter instance, built once by the
//! composition root and shared by every caller of that family. The limiter
//! admits at most `max_requests` operation starts per trailing window;
//! callers beyond the limit wait until the oldest start leaves the window.
//! A start whose operation fails is revoked and frees its slot again.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Limit and window length of one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
	/// Maximum operation starts per window.
	pub max_requests: usize,
	/// Window length in milliseconds.
	pub window_ms: u64,
}

impl RateLimitConfig {
	pub const fn new(max_requests: usize, window_ms: u64) -> Self {
		Self {
			max_requests,
			window_ms,
		}
	}

	/// Quote and swap-transaction requests.
	pub const fn quote() -> Self {
		Self::new(10, 60_000)
	}

	/// Price requests.
	pub const fn price() -> Self {
		Self::new(20, 60_000)
	}

	/// Everything else, such as the token list.
	pub const fn general() -> Self {
		Self::new(15, 60_000)
	}

	pub fn window(&self) -> Duration {
		Duration::from_millis(self.window_ms)
	}
}

/// Snapshot of a limiter's usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStats {
	pub name: String,
	/// Starts currently inside the window.
	pub current_requests: usize,
	pub max_requests: usize,
	pub remaining_requests: usize,
	/// Time until the oldest start leaves the window; zero when empty.
	pub reset_in: Duration,
}

#[derive(Debug, Default)]
struct Window {
	/// Admitted starts in admission order.
	records: VecDeque<(u64, Instant)>,
	next_id: u64,
}

impl Window {
	fn prune(&mut self, now: Instant, length: Duration) {
		while let Some(&(_, started)) = self.records.front() {
			if now.duration_since(started) >= length {
				self.records.pop_front();
			} else {
				break;
			}
		}
	}
}

/// Sliding-window limiter gating asynchronous operations.
#[derive(Debug)]
pub struct RateLimiter {
	name: String,
	max_requests: usize,
	window: Duration,
	state: Mutex<Window>,
}

impl RateLimiter {
	/// Creates a limiter; a limit of zero is raised to one.
	pub fn new(name: impl Into<String>, max_requests: usize, window: Duration) -> Self {
		Self {
			name: name.into(),
			max_requests: max_requests.max(1),
			window,
			state: Mutex::new(Window::default()),
		}
	}

	pub fn from_config(name: impl Into<String>, config: &RateLimitConfig) -> Self {
		Self::new(name, config.max_requests, config.window())
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn max_requests(&self) -> usize {
		self.max_requests
	}

	pub fn window(&self) -> Duration {
		self.window
	}

	/// Runs `operation` once a slot is free.
	///
	/// The error of a failed operation is returned unchanged after its start
	/// has been removed from the window. Nothing is retried.
	pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let id = self.admit().await;
		match operation().await {
			Ok(value) => Ok(value),
			Err(err) => {
				self.revoke(id).await;
				Err(err)
			},
		}
	}

	async fn admit(&self) -> u64 {
		loop {
			let wait = {
				let mut state = self.state.lock().await;
				let now = Instant::now();
				state.prune(now, self.window);

				if state.records.len() < self.max_requests {
					let id = state.next_id;
					state.next_id += 1;
					state.records.push_back((id, now));
					debug!(
						limiter = %self.name,
						in_window = state.records.len(),
						"Request admitted"
					);
					return id;
				}

				match state.records.front() {
					Some(&(_, oldest)) => self.window.saturating_sub(now.duration_since(oldest)),
					None => Duration::ZERO,
				}
			};

			warn!(
				limiter = %self.name,
				wait_ms = wait.as_millis() as u64,
				"Rate limit exceeded, waiting"
			);
			tokio::time::sleep(wait).await;
		}
	}

	async fn revoke(&self, id: u64) {
		let mut state = self.state.lock().await;
		if let Some(pos) = state.records.iter().position(|(record, _)| *record == id) {
			state.records.remove(pos);
			debug!(limiter = %self.name, "Revoked failed request");
		}
	}

	/// Current usage. Does not modify the window.
	pub async fn stats(&self) -> RateLimitStats {
		let state = self.state.lock().await;
		let now = Instant::now();
		let live: Vec<Instant> = state
			.records
			.iter()
			.map(|(_, started)| *started)
			.filter(|started| now.duration_since(*started) < self.window)
			.collect();
		let reset_in = live
			.first()
			.map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
			.unwrap_or(Duration::ZERO);

		RateLimitStats {
			name: self.name.clone(),
			current_requests: live.len(),
			max_requests: self.max_requests,
			remaining_requests: self.max_requests.saturating_sub(live.len()),
			reset_in,
		}
	}

	/// Forgets every recorded start.
	pub async fn reset(&self) {
		self.state.lock().await.records.clear();
	}
}
