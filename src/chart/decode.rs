//! Decoding of loosely-typed chart requests.
//!
//! Tool-call arguments are duck-typed: `labels` and `datasets` may arrive as
//! proper JSON arrays or as JSON-encoded strings, depending on how the model
//! filled the schema. Every access goes through a type check; nothing here
//! assumes shape.

use super::ChartType;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("chart request field `{field}` is missing or empty")]
    MissingField { field: &'static str },

    #[error("chart request field `{field}` could not be decoded: {detail}")]
    MalformedField { field: &'static str, detail: String },
}

/// A chart request with its shape pinned down but values still untrusted.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub chart_type: ChartType,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<DatasetDraft>,
}

/// One requested series before validation; `data` stays loosely typed until
/// the synthesizer decides whether the values are used at all.
#[derive(Debug, Clone)]
pub struct DatasetDraft {
    pub label: String,
    pub data: Vec<Value>,
}

pub fn decode(request: &Value) -> Result<NormalizedRequest, DecodeError> {
    let chart_type = ChartType::clamp(request.get("chartType").and_then(Value::as_str));

    let title = request
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();

    let labels = decode_array(request, "labels")?
        .iter()
        .map(label_text)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>();
    if labels.is_empty() {
        return Err(DecodeError::MissingField { field: "labels" });
    }

    let datasets = decode_array(request, "datasets")?
        .iter()
        .map(dataset_draft)
        .collect::<Result<Vec<_>, _>>()?;
    if datasets.is_empty() {
        return Err(DecodeError::MissingField { field: "datasets" });
    }

    Ok(NormalizedRequest {
        chart_type,
        title,
        labels,
        datasets,
    })
}

/// Reads a field that must end up as a JSON array, decoding one level of
/// string encoding if the model serialized the array itself.
fn decode_array(request: &Value, field: &'static str) -> Result<Vec<Value>, DecodeError> {
    let raw = request
        .get(field)
        .ok_or(DecodeError::MissingField { field })?;

    let decoded = match raw {
        Value::Array(items) => items.clone(),
        Value::String(encoded) => {
            let inner: Value = serde_json::from_str(encoded).map_err(|e| {
                DecodeError::MalformedField {
                    field,
                    detail: e.to_string(),
                }
            })?;
            match inner {
                Value::Array(items) => items,
                other => {
                    return Err(DecodeError::MalformedField {
                        field,
                        detail: format!("expected an array, got {other}"),
                    })
                }
            }
        }
        other => {
            return Err(DecodeError::MalformedField {
                field,
                detail: format!("expected an array or encoded array, got {other}"),
            })
        }
    };

    Ok(decoded)
}

fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn dataset_draft(value: &Value) -> Result<DatasetDraft, DecodeError> {
    let object = value.as_object().ok_or_else(|| DecodeError::MalformedField {
        field: "datasets",
        detail: format!("expected an object entry, got {value}"),
    })?;

    let label = object
        .get("label")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();

    let data = match object.get("data") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    Ok(DatasetDraft { label, data })
}
