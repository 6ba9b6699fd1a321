// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use log::{debug, error};
use reqwest::Url;
use serde_json::Value;

use crate::auth::credentials::resolve_credentials;
use crate::auth::signer::RequestSigner;
use crate::model::condition::Condition;
use crate::model::connection::{ConnectionDetails, NanInterpretation};
use crate::pagination::{paginate_label_values, paginate_labels};
use crate::query::aggregation::AggregationMethod;
use crate::query::promql::PromQuery;
use crate::response::interpreter::{
  interpret_list_payload, interpret_range_payload, is_error_status, Sample,
};
use crate::utils::config::DEFAULT_WINDOW_SECONDS;
use crate::utils::error::{CoreMirrorError, ResponseError};

const HEALTH_URI: &str = "-/healthy";
const LABELS_URI: &str = "api/v1/labels";
const QUERY_RANGE_URI: &str = "api/v1/query_range";

/// Status reported by the connection probe when the backend could not be reached.
pub const UNREACHABLE_STATUS: u16 = 502;

/// Client of a single Prometheus compatible backend.
#[derive(Debug)]
pub struct PrometheusClient {
  base_url: String,
  http_client: reqwest::Client,
  signer: Option<RequestSigner>,
  nan_interpretation: NanInterpretation,
}

impl PrometheusClient {
  /// Create a client for the given connection. AWS credentials, if configured, are resolved here.
  pub async fn new(details: &ConnectionDetails) -> Result<Self, CoreMirrorError> {
    let signer = match details.get_aws() {
      Some(aws) => {
        let credentials = resolve_credentials(aws).await?;
        Some(RequestSigner::new(credentials, &aws.region_name))
      }
      None => None,
    };

    let http_client = reqwest::Client::builder()
      .timeout(details.get_request_timeout())
      .build()?;

    debug!(
      "Created client for {}, signed: {}",
      details.get_base_url(),
      signer.is_some()
    );

    Ok(PrometheusClient {
      base_url: details.get_base_url().to_owned(),
      http_client,
      signer,
      nan_interpretation: details.get_nan_interpretation(),
    })
  }

  pub fn get_base_url(&self) -> &str {
    &self.base_url
  }

  pub fn get_nan_interpretation(&self) -> NanInterpretation {
    self.nan_interpretation
  }

  pub fn is_signed(&self) -> bool {
    self.signer.is_some()
  }

  /// Probe the backend. Returns the status code and body of the probe, never an error.
  ///
  /// Managed workspaces have no health endpoint, so signed clients probe the labels endpoint instead.
  pub async fn test_connection(&self) -> (u16, String) {
    let uri = if self.is_signed() {
      LABELS_URI
    } else {
      HEALTH_URI
    };

    let response = match self.do_get(uri, &[]).await {
      Ok(response) => response,
      Err(err) => return (UNREACHABLE_STATUS, err.to_string()),
    };

    let status = response.status().as_u16();
    match response.text().await {
      Ok(body) => (status, body),
      Err(err) => (UNREACHABLE_STATUS, err.to_string()),
    }
  }

  /// List label names. Returns at most `limit` names and whether more were available.
  pub async fn list_labels(&self, limit: usize) -> Result<(bool, Vec<String>), CoreMirrorError> {
    let payload = self.get_json(LABELS_URI, &[]).await?;
    let labels = interpret_list_payload(&payload)?;
    Ok(paginate_labels(labels, limit))
  }

  /// List a page of values of `label`, keeping only values starting with `prefix` when given.
  pub async fn list_label_values(
    &self,
    label: &str,
    prefix: Option<&str>,
    offset: usize,
    limit: usize,
  ) -> Result<(bool, Vec<String>), CoreMirrorError> {
    let uri = format!("api/v1/label/{}/values", label);
    let payload = self.get_json(&uri, &[]).await?;
    let values = interpret_list_payload(&payload)?;
    Ok(paginate_label_values(values, prefix, offset, limit))
  }

  /// Fetch the samples of the single series matching `conditions` between `start` and `end` (epoch seconds).
  ///
  /// `window` is both the aggregation window and the step, in seconds. When `limit` is given only the first
  /// `limit` samples are returned.
  pub async fn get_series_values_in_range(
    &self,
    conditions: &[Condition],
    start: u64,
    end: u64,
    aggregation: Option<AggregationMethod>,
    window: Option<u64>,
    limit: Option<usize>,
  ) -> Result<Vec<Sample>, CoreMirrorError> {
    let window = window.unwrap_or(DEFAULT_WINDOW_SECONDS);
    let query = PromQuery::new(conditions, aggregation, window).to_promql()?;
    debug!("Querying {} with {}", self.base_url, query);

    let start = start.to_string();
    let end = end.to_string();
    let step = window.to_string();
    let params = [
      ("query", query.as_str()),
      ("start", start.as_str()),
      ("end", end.as_str()),
      ("step", step.as_str()),
    ];
    let payload = self.get_json(QUERY_RANGE_URI, &params).await?;

    let mut samples = interpret_range_payload(&query, &payload)?;
    if let Some(limit) = limit {
      samples.truncate(limit);
    }
    Ok(samples)
  }

  async fn get_json(&self, uri: &str, params: &[(&str, &str)]) -> Result<Value, CoreMirrorError> {
    let response = self.do_get(uri, params).await?;
    let body = Self::handle_failed_call(response).await?;
    Ok(serde_json::from_str(&body)?)
  }

  fn build_url(&self, uri: &str, params: &[(&str, &str)]) -> Result<Url, CoreMirrorError> {
    let mut url = Url::parse(&format!("{}/{}", self.base_url, uri))
      .map_err(|err| CoreMirrorError::InvalidConfiguration(format!("{}: {}", self.base_url, err)))?;
    if !params.is_empty() {
      url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
  }

  async fn do_get(
    &self,
    uri: &str,
    params: &[(&str, &str)],
  ) -> Result<reqwest::Response, CoreMirrorError> {
    let url = self.build_url(uri, params)?;

    let mut request = self.http_client.get(url.clone());
    if let Some(signer) = &self.signer {
      for (name, value) in signer.sign("GET", url.as_str())? {
        request = request.header(name.as_str(), value.as_str());
      }
    }

    Ok(request.send().await?)
  }

  /// Return the body of a successful response. A failed call whose body is a Prometheus error payload
  /// gives a backend error, any other failed call a transport error.
  async fn handle_failed_call(response: reqwest::Response) -> Result<String, CoreMirrorError> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().await?;

    if !status.is_success() {
      if let Ok(payload) = serde_json::from_str::<Value>(&body) {
        if is_error_status(&payload) {
          error!(
            "Query failed on [{}] with status code {}: {}",
            url,
            status.as_u16(),
            payload
          );
          return Err(ResponseError::BackendError(payload.to_string()).into());
        }
      }

      let message = format!(
        "Failed to call [{}] . Status code {}",
        url,
        status.as_u16()
      );
      error!("{}", message);
      error!("Response: {}", body);
      return Err(CoreMirrorError::TransportError(format!(
        "{}. {}",
        message, body
      )));
    }

    Ok(body)
  }
}
