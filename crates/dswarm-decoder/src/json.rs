//! JSON decoder
//!
//! A top-level array yields one record per element, a top-level object one
//! record. Inside a record, objects become entities, array elements repeat
//! their key and `null` is dropped.

use crate::Decoder;
use dswarm_core::{DecodeError, PipelineResult, StreamReceiver};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const FORMAT: &str = "json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonOptions {
    /// Top-level field holding the record id
    pub id_field: Option<String>,
    /// Dot-delimited path to the record array inside the document
    pub record_path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    options: JsonOptions,
}

impl JsonDecoder {
    pub fn new(options: JsonOptions) -> Self {
        Self { options }
    }

    fn record_id(&self, ordinal: usize, record: &Value) -> String {
        self.options
            .id_field
            .as_deref()
            .and_then(|field| record.get(field))
            .and_then(scalar)
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| ordinal.to_string())
    }
}

impl Decoder for JsonDecoder {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn can_handle(&self, input: &str) -> bool {
        matches!(input.trim_start().chars().next(), Some('{' | '['))
    }

    fn decode(&self, input: &str, receiver: &mut dyn StreamReceiver) -> PipelineResult<usize> {
        let document: Value =
            serde_json::from_str(input).map_err(|e| DecodeError::malformed(FORMAT, e))?;

        let root = match &self.options.record_path {
            Some(path) => path
                .split('.')
                .try_fold(&document, |value, key| value.get(key))
                .ok_or_else(|| DecodeError::malformed(FORMAT, format!("no value at '{path}'")))?,
            None => &document,
        };

        let records: Vec<&Value> = match root {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![root],
            _ => {
                return Err(DecodeError::malformed(FORMAT, "expected an object or array of objects").into())
            }
        };

        let mut count = 0;
        for record in records {
            count += 1;
            let Value::Object(fields) = record else {
                return Err(DecodeError::malformed(FORMAT, format!("record {count} is not an object")).into());
            };
            receiver.start_record(&self.record_id(count, record))?;
            for (key, value) in fields {
                emit(key, value, receiver)?;
            }
            receiver.end_record()?;
        }

        debug!(records = count, "decoded JSON document");
        Ok(count)
    }

    fn priority(&self) -> u8 {
        55
    }
}

fn emit(name: &str, value: &Value, receiver: &mut dyn StreamReceiver) -> PipelineResult<()> {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                emit(name, item, receiver)?;
            }
        }
        Value::Object(fields) => {
            receiver.start_entity(name)?;
            for (key, value) in fields {
                emit(key, value, receiver)?;
            }
            receiver.end_entity()?;
        }
        scalar_value => {
            if let Some(text) = scalar(scalar_value) {
                receiver.literal(name, &text)?;
            }
        }
    }
    Ok(())
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
