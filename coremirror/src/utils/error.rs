// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
/// Enum for various errors in coremirror.
pub enum CoreMirrorError {
  #[error("Query error: {0}")]
  QueryError(QueryError),

  #[error("Response error: {0}")]
  ResponseError(ResponseError),

  #[error("Transport error: {0}")]
  TransportError(String),

  #[error("Credential error: {0}")]
  CredentialError(String),

  #[error("Signing error: {0}")]
  SigningError(String),

  #[error("Invalid configuration. {0}")]
  InvalidConfiguration(String),
}

#[derive(Debug, Error, Eq, PartialEq)]
/// Errors raised while compiling a structured query into PromQL.
pub enum QueryError {
  #[error("{0}")]
  RequiredSelector(String),

  #[error("Unsupported aggregation: {0}")]
  UnsupportedAggregation(String),
}

#[derive(Debug, Error, Eq, PartialEq)]
/// Errors raised while interpreting a backend payload.
pub enum ResponseError {
  #[error("Too many metrics. Differentiating fields: {0:?}")]
  AmbiguousMetric(Vec<String>),

  #[error("Metric not found for query {0}")]
  MetricNotFound(String),

  #[error("Invalid response payload: {0}")]
  InvalidResponsePayload(String),

  #[error("Backend error: {0}")]
  BackendError(String),
}

impl From<QueryError> for CoreMirrorError {
  fn from(error: QueryError) -> Self {
    CoreMirrorError::QueryError(error)
  }
}

impl From<ResponseError> for CoreMirrorError {
  fn from(error: ResponseError) -> Self {
    CoreMirrorError::ResponseError(error)
  }
}

impl From<reqwest::Error> for CoreMirrorError {
  fn from(error: reqwest::Error) -> Self {
    CoreMirrorError::TransportError(error.to_string())
  }
}

impl From<serde_json::Error> for CoreMirrorError {
  fn from(error: serde_json::Error) -> Self {
    CoreMirrorError::ResponseError(ResponseError::InvalidResponsePayload(error.to_string()))
  }
}
