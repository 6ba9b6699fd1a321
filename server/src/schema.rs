// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! JSON responses of the mirror API, including the error payloads.

use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hyper::StatusCode;
use log::error;
use serde::Serialize;
use serde_json::{json, Value};

use coremirror::model::query::{FieldDescriptor, Query};
use coremirror::response::points::{BucketPoint, RawPoint, Telemetry};
use coremirror::utils::error::{CoreMirrorError, QueryError, ResponseError};

const STATUS_OK: &str = "OK";
const STATUS_FAILURE: &str = "FAILURE";

#[derive(Debug, Serialize)]
pub struct TestConnectionError {
  #[serde(rename = "_type")]
  type_descriptor: &'static str,
  details: String,
}

#[derive(Debug, Serialize)]
/// Result of a connection probe.
pub struct TestConnectionResponse {
  #[serde(rename = "_type")]
  type_descriptor: &'static str,
  status: &'static str,
  error: Option<TestConnectionError>,
}

impl TestConnectionResponse {
  pub fn ok() -> Self {
    TestConnectionResponse {
      type_descriptor: "TestConnectionResponse",
      status: STATUS_OK,
      error: None,
    }
  }

  pub fn failure(details: String) -> Self {
    TestConnectionResponse {
      type_descriptor: "TestConnectionResponse",
      status: STATUS_FAILURE,
      error: Some(TestConnectionError {
        type_descriptor: "MetricStoreConnectionError",
        details,
      }),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct TelemetryPoints<P: Serialize> {
  #[serde(rename = "_type")]
  type_descriptor: &'static str,
  points: Vec<P>,
  #[serde(rename = "dataFormat")]
  data_format: Vec<&'static str>,
  #[serde(rename = "isPartial")]
  is_partial: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MetricTelemetryResponse {
  Raw(TelemetryPoints<RawPoint>),
  Aggregated(TelemetryPoints<BucketPoint>),
}

#[derive(Debug, Serialize)]
/// Points of a fetched metric.
pub struct MetricsResponse {
  #[serde(rename = "_type")]
  type_descriptor: &'static str,
  telemetry: MetricTelemetryResponse,
}

impl From<Telemetry> for MetricsResponse {
  fn from(telemetry: Telemetry) -> Self {
    let telemetry = match telemetry {
      Telemetry::Raw(points) => MetricTelemetryResponse::Raw(TelemetryPoints {
        type_descriptor: "RawMetricTelemetry",
        points,
        data_format: vec!["value", "timestamp"],
        is_partial: false,
      }),
      Telemetry::Aggregated(points) => MetricTelemetryResponse::Aggregated(TelemetryPoints {
        type_descriptor: "AggregatedMetricTelemetry",
        points,
        data_format: vec!["value", "startTimestamp", "endTimestamp"],
        is_partial: false,
      }),
    };

    MetricsResponse {
      type_descriptor: "MetricsResponse",
      telemetry,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct FieldNamesResponse {
  #[serde(rename = "_type")]
  type_descriptor: &'static str,
  fields: Vec<FieldDescriptor>,
  #[serde(rename = "isPartial")]
  is_partial: bool,
}

impl FieldNamesResponse {
  pub fn new(is_partial: bool, names: Vec<String>) -> Self {
    FieldNamesResponse {
      type_descriptor: "FieldNamesResponse",
      fields: names.iter().map(|name| FieldDescriptor::new(name)).collect(),
      is_partial,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ValueDescriptor {
  #[serde(rename = "_type")]
  type_descriptor: &'static str,
  value: String,
}

#[derive(Debug, Serialize)]
pub struct FieldValuesResponse {
  #[serde(rename = "_type")]
  type_descriptor: &'static str,
  values: Vec<ValueDescriptor>,
  #[serde(rename = "isPartial")]
  is_partial: bool,
}

impl FieldValuesResponse {
  pub fn new(is_partial: bool, values: Vec<String>) -> Self {
    FieldValuesResponse {
      type_descriptor: "FieldValuesResponse",
      values: values
        .into_iter()
        .map(|value| ValueDescriptor {
          type_descriptor: "CompleteValue",
          value,
        })
        .collect(),
      is_partial,
    }
  }
}

#[derive(Debug, Serialize)]
struct RemoteMirrorError {
  #[serde(rename = "_type")]
  type_descriptor: &'static str,
  summary: &'static str,
  details: Value,
}

#[derive(Debug, Serialize)]
struct MetricNotFoundError {
  #[serde(rename = "_type")]
  type_descriptor: &'static str,
  metric: String,
  details: Option<String>,
}

/// An error payload along with its status code.
#[derive(Debug)]
pub struct ErrorResponse {
  status: StatusCode,
  body: Value,
}

impl ErrorResponse {
  fn remote_mirror_error(summary: &'static str, details: Value) -> Self {
    let error = RemoteMirrorError {
      type_descriptor: "RemoteMirrorError",
      summary,
      details,
    };
    ErrorResponse {
      status: StatusCode::INTERNAL_SERVER_ERROR,
      body: json!(error),
    }
  }

  fn metric_not_found_error(metric: String, details: Option<String>) -> Self {
    let error = MetricNotFoundError {
      type_descriptor: "MetricNotFoundError",
      metric,
      details,
    };
    ErrorResponse {
      status: StatusCode::INTERNAL_SERVER_ERROR,
      body: json!(error),
    }
  }

  /// The request body could not be read as the expected JSON.
  pub fn validation(rejection: &JsonRejection) -> Self {
    error!("Request validation error: {}", rejection.body_text());
    Self::remote_mirror_error(
      "Request validation errors.",
      json!({"detail": rejection.body_text()}),
    )
  }

  /// Any failure of the connection and field endpoints.
  pub fn internal(message: &str) -> Self {
    error!("Internal server error: {}", message);
    Self::remote_mirror_error("Internal server error.", json!({"message": message}))
  }

  /// A failure of a metric fetch for `query`.
  pub fn for_metric(err: &CoreMirrorError, query: &Query) -> Self {
    error!("Request error: {}", err);
    match err {
      CoreMirrorError::QueryError(QueryError::RequiredSelector(message)) => {
        let metric = serde_json::to_string(query).unwrap_or_default();
        Self::metric_not_found_error(metric, Some(message.clone()))
      }
      CoreMirrorError::ResponseError(ResponseError::MetricNotFound(compiled)) => {
        Self::metric_not_found_error(compiled.clone(), None)
      }
      CoreMirrorError::ResponseError(ResponseError::InvalidResponsePayload(details)) => {
        Self::remote_mirror_error("Invalid prometheus response.", json!(details))
      }
      CoreMirrorError::ResponseError(ResponseError::AmbiguousMetric(fields)) => {
        Self::remote_mirror_error("Too many metrics.", json!(fields))
      }
      CoreMirrorError::ResponseError(ResponseError::BackendError(details)) => {
        Self::remote_mirror_error("Prometheus error.", json!(details))
      }
      CoreMirrorError::QueryError(QueryError::UnsupportedAggregation(method)) => {
        Self::remote_mirror_error("Unsupported aggregation.", json!(method))
      }
      other => Self::remote_mirror_error("Unexpected error.", json!(other.to_string())),
    }
  }

  #[cfg(test)]
  pub fn get_status(&self) -> StatusCode {
    self.status
  }

  #[cfg(test)]
  pub fn get_body(&self) -> &Value {
    &self.body
  }
}

impl IntoResponse for ErrorResponse {
  fn into_response(self) -> Response {
    (self.status, Json(self.body)).into_response()
  }
}
