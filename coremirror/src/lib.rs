// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

pub mod auth;
pub mod client;
pub mod model;
pub mod pagination;
pub mod query;
pub mod response;
pub mod utils;

use std::sync::Arc;

use ::log::debug;

use crate::client::prometheus::PrometheusClient;
use crate::client::registry::ClientRegistry;
use crate::model::condition::{COUNTER_KEY, GAUGE_KEY, RESERVED_KEYS};
use crate::model::connection::ConnectionDetails;
use crate::model::query::{Aggregation, Query};
use crate::response::points::{make_bucket_points, make_raw_points, Telemetry};
use crate::utils::error::CoreMirrorError;

/// Label holding the metric name in Prometheus.
const METRIC_NAME_LABEL: &str = "__name__";

/// Gateway translating store agnostic queries to Prometheus backends.
#[derive(Debug, Default)]
pub struct CoreMirror {
  registry: ClientRegistry,
}

impl CoreMirror {
  pub fn new() -> Self {
    CoreMirror {
      registry: ClientRegistry::new(),
    }
  }

  pub fn get_registry(&self) -> &ClientRegistry {
    &self.registry
  }

  async fn get_client(
    &self,
    details: &ConnectionDetails,
  ) -> Result<Arc<PrometheusClient>, CoreMirrorError> {
    self.registry.get_instance(details).await
  }

  /// Probe the backend and return its status code and body.
  pub async fn test_connection(
    &self,
    details: &ConnectionDetails,
  ) -> Result<(u16, String), CoreMirrorError> {
    let client = self.get_client(details).await?;
    Ok(client.test_connection().await)
  }

  /// Fetch the points of the metric selected by `query`.
  ///
  /// Aggregated queries give one bucket per window, others give raw points.
  pub async fn fetch_metric(
    &self,
    details: &ConnectionDetails,
    query: &Query,
  ) -> Result<Telemetry, CoreMirrorError> {
    let client = self.get_client(details).await?;

    let aggregation = query
      .get_aggregation()
      .map(Aggregation::get_method)
      .transpose()?;
    let window_millis = query.get_window_millis();
    let end_millis = query.get_end_time();

    debug!(
      "Fetching metric from {} to {} with aggregation {:?}",
      query.get_start_time(),
      end_millis,
      aggregation
    );

    let samples = client
      .get_series_values_in_range(
        query.get_conditions(),
        query.get_start_time() / 1000,
        end_millis / 1000,
        aggregation,
        Some(window_millis / 1000),
        Some(query.get_limit()),
      )
      .await?;

    let nan_interpretation = client.get_nan_interpretation();
    let telemetry = match aggregation {
      Some(_) => Telemetry::Aggregated(make_bucket_points(
        &samples,
        end_millis,
        window_millis,
        nan_interpretation,
      )?),
      None => Telemetry::Raw(make_raw_points(
        &samples,
        end_millis,
        nan_interpretation,
      )?),
    };
    Ok(telemetry)
  }

  /// List field names: the selector keys first, then the labels of the backend.
  ///
  /// The partial flag and `limit` only apply to the backend labels.
  pub async fn field_names(
    &self,
    details: &ConnectionDetails,
    limit: usize,
  ) -> Result<(bool, Vec<String>), CoreMirrorError> {
    let client = self.get_client(details).await?;
    let (is_partial, labels) = client.list_labels(limit).await?;

    let names = RESERVED_KEYS
      .iter()
      .map(|key| key.to_string())
      .chain(labels)
      .collect();
    Ok((is_partial, names))
  }

  /// List a page of values of a field. The counter and gauge keys list metric names.
  pub async fn field_values(
    &self,
    details: &ConnectionDetails,
    field_name: &str,
    prefix: Option<&str>,
    offset: usize,
    limit: usize,
  ) -> Result<(bool, Vec<String>), CoreMirrorError> {
    let label = if field_name == COUNTER_KEY || field_name == GAUGE_KEY {
      METRIC_NAME_LABEL
    } else {
      field_name
    };

    let client = self.get_client(details).await?;
    client
      .list_label_values(label, prefix, offset, limit)
      .await
  }
}

#[cfg(test)]
mod tests {
  use serde_json::{json, Value};
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::model::condition::{Condition, ConditionValue};
  use crate::model::connection::NanInterpretation;
  use crate::model::query::FieldDescriptor;
  use crate::response::points::{BucketPoint, RawPoint};
  use crate::utils::config::config_test_logger;
  use crate::utils::error::{QueryError, ResponseError};

  fn matrix(values: Value) -> Value {
    json!({
      "status": "success",
      "data": {
        "resultType": "matrix",
        "result": [{"metric": {"__name__": "requests"}, "values": values}]
      }
    })
  }

  fn counter_query() -> Query {
    let conditions = vec![Condition::new(
      "__counter__",
      ConditionValue::String("requests".to_owned()),
    )];
    Query::new(conditions, 1_000_000, 1_100_000)
  }

  #[tokio::test]
  async fn test_fetch_raw_metric() {
    config_test_logger();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/query_range"))
      .and(query_param("query", "increase(requests{}[60s])"))
      .and(query_param("start", "1000"))
      .and(query_param("end", "1100"))
      .and(query_param("step", "30"))
      .respond_with(ResponseTemplate::new(200).set_body_json(matrix(json!([
        [1000, "1"],
        [1030, "NaN"],
        [1060, "3"],
        [1101, "4"]
      ]))))
      .mount(&server)
      .await;

    let coremirror = CoreMirror::new();
    let details = ConnectionDetails::new(&server.uri());
    let telemetry = coremirror
      .fetch_metric(&details, &counter_query())
      .await
      .unwrap();
    assert_eq!(
      telemetry,
      Telemetry::Raw(vec![
        RawPoint::new(1.0, 1_000_000),
        RawPoint::new(0.0, 1_030_000),
        RawPoint::new(3.0, 1_060_000),
      ])
    );
  }

  #[tokio::test]
  async fn test_fetch_aggregated_metric() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/query_range"))
      .and(query_param(
        "query",
        "avg_over_time(increase(requests{}[60s])[60s:60s])",
      ))
      .and(query_param("step", "60"))
      .respond_with(ResponseTemplate::new(200).set_body_json(matrix(json!([
        [1000, "1"],
        [1020, "NaN"],
        [1040, "3"],
        [1060, "4"]
      ]))))
      .mount(&server)
      .await;

    let coremirror = CoreMirror::new();
    let details =
      ConnectionDetails::new(&server.uri()).with_nan_interpretation(NanInterpretation::Skip);
    let query = counter_query().with_aggregation(Aggregation::new("MEAN", 60000));
    let telemetry = coremirror.fetch_metric(&details, &query).await.unwrap();

    // The NaN sample is dropped and the last bucket ends after the range.
    assert_eq!(
      telemetry,
      Telemetry::Aggregated(vec![
        BucketPoint::new(1.0, 1_000_000, 1_060_000),
        BucketPoint::new(3.0, 1_040_000, 1_100_000),
      ])
    );
  }

  #[tokio::test]
  async fn test_fetch_metric_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/query_range"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "status": "success",
        "data": {"result": [
          {"metric": {"__name__": "requests", "job": "a"}, "values": []},
          {"metric": {"__name__": "requests", "job": "b"}, "values": []}
        ]}
      })))
      .mount(&server)
      .await;

    let coremirror = CoreMirror::new();
    let details = ConnectionDetails::new(&server.uri());

    assert_eq!(
      coremirror.fetch_metric(&details, &counter_query()).await,
      Err(CoreMirrorError::ResponseError(
        ResponseError::AmbiguousMetric(vec!["job".to_owned()])
      ))
    );

    let query = counter_query().with_aggregation(Aggregation::new("median", 30000));
    assert!(matches!(
      coremirror.fetch_metric(&details, &query).await,
      Err(CoreMirrorError::QueryError(
        QueryError::UnsupportedAggregation(_)
      ))
    ));
  }

  #[tokio::test]
  async fn test_field_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/labels"))
      .respond_with(ResponseTemplate::new(200).set_body_json(
        json!({"status": "success", "data": ["__name__", "instance", "job"]}),
      ))
      .mount(&server)
      .await;

    let coremirror = CoreMirror::new();
    let details = ConnectionDetails::new(&server.uri());
    let (is_partial, names) = coremirror.field_names(&details, 1).await.unwrap();
    assert!(is_partial);
    assert_eq!(names, vec!["__counter__", "__gauge__", "~", "__name__"]);
    assert_eq!(coremirror.get_registry().len(), 1);
  }

  #[tokio::test]
  async fn test_field_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/label/__name__/values"))
      .respond_with(ResponseTemplate::new(200).set_body_json(
        json!({"status": "success", "data": ["http_errors", "http_requests", "up"]}),
      ))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/v1/label/job/values"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": ["api"]})),
      )
      .mount(&server)
      .await;

    let coremirror = CoreMirror::new();
    let details = ConnectionDetails::new(&server.uri());

    for field_name in ["__counter__", "__gauge__"] {
      let query = Query::new(vec![], 0, 0)
        .with_field(FieldDescriptor::new(field_name))
        .with_prefix(Some("http"));
      let result = field_values_of(&coremirror, &details, &query).await;
      assert_eq!(
        result,
        (
          false,
          vec!["http_errors".to_owned(), "http_requests".to_owned()]
        )
      );
    }

    // Paging applies after the prefix filter.
    let query = Query::new(vec![], 0, 0)
      .with_field(FieldDescriptor::new("__name__"))
      .with_prefix(Some("http"))
      .with_page(1, 1);
    let result = field_values_of(&coremirror, &details, &query).await;
    assert_eq!(result, (false, vec!["http_requests".to_owned()]));

    let query = Query::new(vec![], 0, 0)
      .with_field(FieldDescriptor::new("job"))
      .with_prefix(None);
    let result = field_values_of(&coremirror, &details, &query).await;
    assert_eq!(result, (false, vec!["api".to_owned()]));
  }

  async fn field_values_of(
    coremirror: &CoreMirror,
    details: &ConnectionDetails,
    query: &Query,
  ) -> (bool, Vec<String>) {
    coremirror
      .field_values(
        details,
        &query.get_field().unwrap().field_name,
        query.get_prefix(),
        query.get_offset(),
        query.get_limit(),
      )
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn test_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/-/healthy"))
      .respond_with(ResponseTemplate::new(200).set_body_string("Prometheus is Healthy."))
      .mount(&server)
      .await;

    let coremirror = CoreMirror::new();
    let details = ConnectionDetails::new(&server.uri());
    let (status, _) = coremirror.test_connection(&details).await.unwrap();
    assert_eq!(status, 200);
  }
}
