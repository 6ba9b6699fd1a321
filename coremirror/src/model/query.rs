// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use serde::{Deserialize, Serialize};

use crate::model::condition::Condition;
use crate::model::connection::ConnectionDetails;
use crate::query::aggregation::AggregationMethod;
use crate::utils::config::MIN_BUCKET_SIZE_MILLIS;
use crate::utils::error::QueryError;

fn default_bucket_size_millis() -> u64 {
  10000
}

fn default_limit() -> usize {
  1000
}

fn default_prefix() -> Option<String> {
  Some(String::new())
}

fn default_field_type() -> String {
  "STRING".to_owned()
}

fn default_field_descriptor_type() -> String {
  "FieldDescriptor".to_owned()
}

/// Describes a field (label) of the metric store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldDescriptor {
  #[serde(rename = "_type", default = "default_field_descriptor_type")]
  pub type_descriptor: String,

  #[serde(default)]
  pub classified: bool,

  #[serde(rename = "fieldType", default = "default_field_type")]
  pub field_type: String,

  #[serde(rename = "fieldName")]
  pub field_name: String,
}

impl FieldDescriptor {
  pub fn new(field_name: &str) -> Self {
    FieldDescriptor {
      type_descriptor: default_field_descriptor_type(),
      classified: false,
      field_type: default_field_type(),
      field_name: field_name.to_owned(),
    }
  }
}

/// Aggregation requested for a metric query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Aggregation {
  method: String,

  #[serde(rename = "bucketSizeMillis", default = "default_bucket_size_millis")]
  bucket_size_millis: u64,
}

impl Aggregation {
  pub fn new(method: &str, bucket_size_millis: u64) -> Self {
    Aggregation {
      method: method.to_owned(),
      bucket_size_millis,
    }
  }

  /// Parse the method name, case insensitive.
  pub fn get_method(&self) -> Result<AggregationMethod, QueryError> {
    self.method.parse()
  }

  /// Bucket size, never smaller than the minimal bucket size.
  pub fn get_bucket_size_millis(&self) -> u64 {
    self.bucket_size_millis.max(MIN_BUCKET_SIZE_MILLIS)
  }
}

/// Store agnostic description of a telemetry query.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Query {
  #[serde(default)]
  conditions: Vec<Condition>,

  #[serde(default)]
  field: Option<FieldDescriptor>,

  #[serde(default)]
  aggregation: Option<Aggregation>,

  #[serde(rename = "metricField", default)]
  metric_field: Option<String>,

  #[serde(rename = "startTime", default)]
  start_time: u64,

  #[serde(rename = "endTime", default)]
  end_time: u64,

  #[serde(rename = "lastFirst", default)]
  last_first: bool,

  #[serde(rename = "fieldValuePrefix", default = "default_prefix")]
  prefix: Option<String>,

  #[serde(default = "default_limit")]
  limit: usize,

  #[serde(default)]
  offset: Option<usize>,
}

impl Query {
  pub fn new(conditions: Vec<Condition>, start_time: u64, end_time: u64) -> Self {
    Query {
      conditions,
      field: None,
      aggregation: None,
      metric_field: None,
      start_time,
      end_time,
      last_first: false,
      prefix: default_prefix(),
      limit: default_limit(),
      offset: Some(0),
    }
  }

  pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
    self.aggregation = Some(aggregation);
    self
  }

  pub fn with_field(mut self, field: FieldDescriptor) -> Self {
    self.field = Some(field);
    self
  }

  pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
    self.prefix = prefix.map(str::to_owned);
    self
  }

  pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
    self.offset = Some(offset);
    self.limit = limit;
    self
  }

  pub fn get_conditions(&self) -> &[Condition] {
    &self.conditions
  }

  pub fn get_field(&self) -> Option<&FieldDescriptor> {
    self.field.as_ref()
  }

  pub fn get_aggregation(&self) -> Option<&Aggregation> {
    self.aggregation.as_ref()
  }

  /// Start of the time range, epoch milliseconds.
  pub fn get_start_time(&self) -> u64 {
    self.start_time
  }

  /// End of the time range, epoch milliseconds.
  pub fn get_end_time(&self) -> u64 {
    self.end_time
  }

  pub fn get_prefix(&self) -> Option<&str> {
    self.prefix.as_deref()
  }

  pub fn get_limit(&self) -> usize {
    self.limit
  }

  pub fn get_offset(&self) -> usize {
    self.offset.unwrap_or(0)
  }

  /// Width of one bucket (and the query step) in milliseconds.
  pub fn get_window_millis(&self) -> u64 {
    self
      .aggregation
      .as_ref()
      .map(Aggregation::get_bucket_size_millis)
      .unwrap_or(MIN_BUCKET_SIZE_MILLIS)
  }
}

/// Request sent to the mirror for metrics and field listings.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorRequest {
  #[serde(rename = "connectionDetails")]
  pub connection_details: ConnectionDetails,

  pub query: Query,
}

/// Request sent to the mirror to check connectivity to the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct TestConnectionRequest {
  #[serde(rename = "connectionDetails")]
  pub connection_details: ConnectionDetails,
}
