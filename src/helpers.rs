//! Small capability and gesture helpers used by drivers alongside the fetcher

use crate::error::{AppfetchError, AppfetchResult};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::warn;

/// Coordinate used when a gesture omits one
pub const DEFAULT_COORD: f64 = 0.5;

/// Default swipe duration in seconds
pub const DEFAULT_SWIPE_DURATION: f64 = 0.8;

/// Whether `name` looks like a package or bundle identifier (`com.example.app`)
pub fn is_package_or_bundle(name: &str) -> bool {
    static PACKAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^([a-zA-Z0-9\-_]+\.[a-zA-Z0-9\-_]+)+$").expect("Invalid regex")
    });

    PACKAGE_REGEX.is_match(name)
}

/// Gesture coordinate, or the screen center when absent
pub fn coord_or_default(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(DEFAULT_COORD)
}

/// Swipe duration in seconds from a wait gesture's `ms` option
pub fn swipe_touch_duration(ms: Option<f64>) -> f64 {
    match ms {
        Some(ms) if ms != 0.0 && !ms.is_nan() => {
            let duration = ms / 1000.0;
            if duration == 0.0 {
                0.1
            } else {
                duration
            }
        }
        _ => DEFAULT_SWIPE_DURATION,
    }
}

/// Make `first` and `second` aliases of each other at every nesting level.
///
/// Wherever an object holds one of the keys, the result holds both with the
/// same (recursively transformed) value. Where an object already holds both,
/// the value of the key that comes last wins for the alias.
pub fn duplicate_keys(input: Value, first: &str, second: &str) -> Value {
    match input {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| duplicate_keys(item, first, second))
                .collect(),
        ),
        Value::Object(map) => {
            let mut result = Map::new();
            for (key, value) in map {
                let value = duplicate_keys(value, first, second);
                if key == first {
                    result.insert(second.to_string(), value.clone());
                } else if key == second {
                    result.insert(first.to_string(), value.clone());
                }
                result.insert(key, value);
            }
            Value::Object(result)
        }
        other => other,
    }
}

/// Parse a capability that may be a JSON array, a JSON array encoded in a
/// string, or a single bare string
pub fn parse_caps_array(cap: &Value) -> AppfetchResult<Vec<Value>> {
    match cap {
        Value::Array(items) => Ok(items.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(_) => Ok(vec![cap.clone()]),
            Err(_) => {
                warn!("Failed to parse capability as JSON array");
                Ok(vec![cap.clone()])
            }
        },
        other => Err(AppfetchError::ParseFailure(other.to_string())),
    }
}
