//! Register coercion and normalization into physical units.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::frame::RawFrame;

/// Typed scalar decoded from a raw register string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) => Some(v.trunc() as i64),
            Value::Text(_) => None,
        }
    }
}

/// Coerce a raw register string into a typed scalar.
///
/// Integer parse first, then float, then the text unchanged. Total: a value
/// is always produced, so alarm states like "ON"/"OFF" stay textual.
pub fn coerce(raw: &str) -> Value {
    if let Ok(v) = raw.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return Value::Float(v);
    }
    Value::Text(raw.to_string())
}

/// How a raw register value maps onto its output field.
#[derive(Debug, Clone, Copy)]
enum Transform {
    /// Divide by `divisor` and round to `decimals` places.
    Scale { divisor: f64, decimals: i32 },
    /// Whole-number passthrough (floats truncate toward zero).
    Integer,
    /// Seconds to whole minutes, floor division.
    SecondsToMinutes,
    /// Pass the coerced value through unchanged.
    Identity,
}

impl Transform {
    /// Apply the transform; a value the transform cannot interpret
    /// (e.g. text where a number is required) drops the field.
    fn apply(&self, value: Value) -> Option<Value> {
        match self {
            Transform::Scale { divisor, decimals } => {
                let v = value.as_f64()?;
                Some(Value::Float(round_to(v / divisor, *decimals)))
            }
            Transform::Integer => Some(Value::Int(value.as_i64()?)),
            Transform::SecondsToMinutes => {
                let minutes = match value {
                    Value::Int(v) => v.div_euclid(60),
                    Value::Float(v) => (v / 60.0).floor() as i64,
                    Value::Text(_) => return None,
                };
                Some(Value::Int(minutes))
            }
            Transform::Identity => Some(value),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

struct Rule {
    source: &'static str,
    field: &'static str,
    transform: Transform,
}

/// SmartShunt register table. Registers not listed here are dropped.
const RULES: &[Rule] = &[
    Rule { source: "V", field: "v", transform: Transform::Scale { divisor: 1000.0, decimals: 2 } }, // mV -> V
    Rule { source: "I", field: "a", transform: Transform::Scale { divisor: 1000.0, decimals: 2 } }, // mA -> A
    Rule { source: "P", field: "w", transform: Transform::Integer },                                // W
    Rule { source: "CE", field: "ce", transform: Transform::Scale { divisor: 1000.0, decimals: 2 } }, // mAh -> Ah
    Rule { source: "SOC", field: "soc", transform: Transform::Scale { divisor: 10.0, decimals: 1 } }, // 0.1% -> %
    Rule { source: "TTG", field: "time", transform: Transform::Integer },                           // minutes
    Rule { source: "Alarm", field: "alarm", transform: Transform::Identity },                       // ON/OFF
    Rule { source: "AR", field: "ar", transform: Transform::Integer },                              // alarm reason
    Rule { source: "H1", field: "h_ddist", transform: Transform::Scale { divisor: 1000.0, decimals: 2 } },
    Rule { source: "H2", field: "h_ldist", transform: Transform::Scale { divisor: 1000.0, decimals: 2 } },
    Rule { source: "H3", field: "h_adist", transform: Transform::Scale { divisor: 1000.0, decimals: 2 } },
    Rule { source: "H4", field: "h_chgcyc", transform: Transform::Integer },
    Rule { source: "H5", field: "h_fulldist", transform: Transform::Integer },
    Rule { source: "H6", field: "h_totalmah", transform: Transform::Scale { divisor: 1000.0, decimals: 2 } },
    Rule { source: "H7", field: "h_bminv", transform: Transform::Scale { divisor: 1000.0, decimals: 2 } },
    Rule { source: "H8", field: "h_bmaxv", transform: Transform::Scale { divisor: 1000.0, decimals: 2 } },
    Rule { source: "H9", field: "h_lastchg", transform: Transform::SecondsToMinutes },
    Rule { source: "H17", field: "h_totaldis", transform: Transform::Scale { divisor: 100.0, decimals: 2 } },
    Rule { source: "H18", field: "h_totalchg", transform: Transform::Scale { divisor: 100.0, decimals: 2 } },
];

/// Normalized telemetry for one poll cycle. Serializes to a flat JSON
/// object containing only the fields whose source registers were present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TelemetryFrame {
    fields: BTreeMap<&'static str, Value>,
}

impl TelemetryFrame {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode as the MQTT payload.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Map a raw frame onto physical units using the register table.
///
/// Pure and deterministic: identical raw frames always yield identical
/// telemetry frames.
pub fn normalize(raw: &RawFrame) -> TelemetryFrame {
    let mut fields = BTreeMap::new();

    for rule in RULES {
        let Some(raw_value) = raw.get(rule.source) else {
            continue;
        };
        if let Some(value) = rule.transform.apply(coerce(raw_value)) {
            fields.insert(rule.field, value);
        }
    }

    TelemetryFrame { fields }
}
