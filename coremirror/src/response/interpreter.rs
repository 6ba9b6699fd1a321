// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Classification of raw Prometheus payloads.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;

use crate::utils::error::ResponseError;

const STATUS_ERROR: &str = "error";

/// A single `[timestamp, "value"]` sample of a range query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
  /// Seconds from epoch, possibly fractional.
  pub timestamp_seconds: f64,

  /// Value as reported by Prometheus, e.g. "1.5" or "NaN".
  pub value: String,
}

impl Sample {
  pub fn new(timestamp_seconds: f64, value: &str) -> Self {
    Sample {
      timestamp_seconds,
      value: value.to_owned(),
    }
  }
}

/// One series of a range query result.
#[derive(Debug, Deserialize)]
struct Series {
  #[serde(default)]
  metric: BTreeMap<String, Value>,

  #[serde(default)]
  values: Vec<(f64, String)>,
}

/// Whether the payload reports a failed query, e.g. `{"status": "error", "errorType": "bad_data"}`.
pub fn is_error_status(payload: &Value) -> bool {
  payload.get("status").and_then(Value::as_str) == Some(STATUS_ERROR)
}

/// Classify a range query payload and return the samples of its single series.
///
/// `query` is the compiled query text, reported back when nothing matched.
pub fn interpret_range_payload(query: &str, payload: &Value) -> Result<Vec<Sample>, ResponseError> {
  if is_error_status(payload) {
    return Err(ResponseError::BackendError(payload.to_string()));
  }

  let result = payload
    .get("data")
    .and_then(|data| data.get("result"))
    .and_then(Value::as_array)
    .ok_or_else(|| ResponseError::InvalidResponsePayload(payload.to_string()))?;

  let series = result
    .iter()
    .map(Series::deserialize)
    .collect::<Result<Vec<Series>, _>>()
    .map_err(|err| ResponseError::InvalidResponsePayload(format!("{}: {}", err, payload)))?;

  match series.as_slice() {
    [] => Err(ResponseError::MetricNotFound(query.to_owned())),
    [single] => Ok(
      single
        .values
        .iter()
        .map(|(timestamp_seconds, value)| Sample::new(*timestamp_seconds, value))
        .collect(),
    ),
    _ => Err(ResponseError::AmbiguousMetric(differentiating_fields(
      &series,
    ))),
  }
}

/// Label keys whose values differ between the given series, sorted by key.
fn differentiating_fields(series: &[Series]) -> Vec<String> {
  let mut values_for_key: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
  for serie in series {
    for (key, value) in &serie.metric {
      let value = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
      };
      values_for_key.entry(key.as_str()).or_default().insert(value);
    }
  }

  values_for_key
    .into_iter()
    .filter(|(_, values)| values.len() > 1)
    .map(|(key, _)| key.to_owned())
    .collect()
}

/// Extract the list of strings of a labels or label values payload.
pub fn interpret_list_payload(payload: &Value) -> Result<Vec<String>, ResponseError> {
  if is_error_status(payload) {
    return Err(ResponseError::BackendError(payload.to_string()));
  }

  payload
    .get("data")
    .and_then(Value::as_array)
    .and_then(|items| {
      items
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect::<Option<Vec<String>>>()
    })
    .ok_or_else(|| ResponseError::InvalidResponsePayload(payload.to_string()))
}
