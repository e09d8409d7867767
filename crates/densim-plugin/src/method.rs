//! Measurement methods from the host's argument payload.
//!
//! Measurement requests may carry a JSON object whose `method` key picks the
//! [`MeasurementMethod`] for each measured qubit:
//!
//! | `method` | Meaning |
//! |----------|---------|
//! | absent | `random` for every qubit |
//! | `"random"`, `"probable"` | that method for every qubit |
//! | integer `m` | bitmask; qubit `i` of `n` is forced to `(m >> (n - 1 - i)) & 1` |
//! | list | one entry per qubit: `"random"`, `"probable"`, `0` or `1` |

use densim_core::MeasurementMethod;
use serde_json::Value;

use crate::error::{PluginError, PluginResult};

/// Key of the method selector in the argument object.
pub const METHOD_KEY: &str = "method";

/// Parse the methods for measuring `count` qubits from `arb`.
pub fn parse_methods(arb: &Value, count: usize) -> PluginResult<Vec<MeasurementMethod>> {
    let Some(method) = arb.get(METHOD_KEY) else {
        return Ok(vec![MeasurementMethod::Random; count]);
    };

    match method {
        Value::String(name) => Ok(vec![parse_name(name)?; count]),
        Value::Number(n) => {
            let mask = n.as_u64().ok_or_else(|| {
                PluginError::InvalidMethod(format!(
                    "bitmask must be a non-negative integer, got {n}"
                ))
            })?;
            Ok(from_bitmask(mask, count))
        }
        Value::Array(entries) => {
            if entries.len() != count {
                return Err(PluginError::InvalidMethod(format!(
                    "method list has {} entries for {} qubits",
                    entries.len(),
                    count
                )));
            }
            entries.iter().map(parse_entry).collect()
        }
        other => Err(PluginError::InvalidMethod(format!(
            "failed to parse method key: {other}"
        ))),
    }
}

/// Forced methods for `count` qubits from a bitmask, first qubit in the
/// most significant position.
pub fn from_bitmask(mask: u64, count: usize) -> Vec<MeasurementMethod> {
    (0..count)
        .map(|i| {
            let shift = (count - 1 - i) as u32;
            let bit = mask.checked_shr(shift).unwrap_or(0) & 1;
            MeasurementMethod::forced(bit == 1)
        })
        .collect()
}

fn parse_name(name: &str) -> PluginResult<MeasurementMethod> {
    match name {
        "random" => Ok(MeasurementMethod::Random),
        "probable" => Ok(MeasurementMethod::Probable),
        other => Err(PluginError::InvalidMethod(format!(
            "unknown measurement method {other:?}"
        ))),
    }
}

fn parse_entry(entry: &Value) -> PluginResult<MeasurementMethod> {
    match entry {
        Value::String(name) => parse_name(name),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(MeasurementMethod::ForceZero),
            Some(1) => Ok(MeasurementMethod::ForceOne),
            _ => Err(PluginError::InvalidMethod(format!(
                "forced outcome must be 0 or 1, got {n}"
            ))),
        },
        other => Err(PluginError::InvalidMethod(format!(
            "unknown measurement method {other}"
        ))),
    }
}
