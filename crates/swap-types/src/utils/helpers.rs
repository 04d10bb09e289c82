//! Small helpers shared across crates.

use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in milliseconds.
///
/// Returns 0 if the system clock is set before the Unix epoch.
pub fn current_timestamp_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or(0)
}

/// Message for a non-success HTTP response.
///
/// Prefers the `error` field of a JSON body and falls back to
/// `HTTP <status>: <reason>`.
pub fn http_error_message(status: u16, reason: Option<&str>, body: &str) -> String {
	serde_json::from_str::<Value>(body)
		.ok()
		.and_then(|value| value.get("error")?.as_str().map(str::to_string))
		.unwrap_or_else(|| format!("HTTP {status}: {}", reason.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_current_timestamp_is_monotonic_enough() {
		let first = current_timestamp_ms();
		let second = current_timestamp_ms();
		assert!(first > 0);
		assert!(second >= first);
	}

	#[test]
	fn test_http_error_message() {
		assert_eq!(
			http_error_message(400, Some("Bad Request"), r#"{"error":"Could not find any route"}"#),
			"Could not find any route"
		);
		assert_eq!(
			http_error_message(429, Some("Too Many Requests"), "rate limited"),
			"HTTP 429: Too Many Requests"
		);
		assert_eq!(http_error_message(502, None, r#"{"error":42}"#), "HTTP 502: ");
	}
}
