//! Lenient deserializers for aggregator payloads.
//!
//! Aggregator APIs are inconsistent about whether numeric fields arrive as
//! JSON numbers or strings (`"outAmount": "1234"`, `"priceImpactPct": "0.01"`).
//! These helpers accept either form and yield `None` for anything that does
//! not parse, leaving the decision about absent values to the caller.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes an optional unsigned integer given as a number or a string.
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<Value>::deserialize(deserializer)?;
	Ok(value.and_then(|v| match v {
		Value::Number(n) => n.as_u64(),
		Value::String(s) => s.trim().parse::<u64>().ok(),
		_ => None,
	}))
}

/// Deserializes an optional float given as a number or a string.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<Value>::deserialize(deserializer)?;
	Ok(value.and_then(|v| match v {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse::<f64>().ok(),
		_ => None,
	}))
	.map(|parsed| parsed.filter(|f| f.is_finite()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde::Deserialize;

	#[derive(Deserialize)]
	struct Probe {
		#[serde(default, deserialize_with = "lenient_u64")]
		amount: Option<u64>,
		#[serde(default, deserialize_with = "lenient_f64")]
		ratio: Option<f64>,
	}

	fn probe(json: serde_json::Value) -> Probe {
		serde_json::from_value(json).unwrap()
	}

	#[test]
	fn test_accepts_numbers_and_strings() {
		let p = probe(serde_json::json!({ "amount": "1500", "ratio": 0.25 }));
		assert_eq!(p.amount, Some(1500));
		assert_eq!(p.ratio, Some(0.25));

		let p = probe(serde_json::json!({ "amount": 42, "ratio": "1.5" }));
		assert_eq!(p.amount, Some(42));
		assert_eq!(p.ratio, Some(1.5));
	}

	#[test]
	fn test_unparseable_values_become_none() {
		let p = probe(serde_json::json!({ "amount": "-3", "ratio": "abc" }));
		assert_eq!(p.amount, None);
		assert_eq!(p.ratio, None);

		let p = probe(serde_json::json!({}));
		assert_eq!(p.amount, None);
		assert_eq!(p.ratio, None);
	}
}
