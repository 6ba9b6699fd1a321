// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use log::error;
use serde::ser::{Serialize, SerializeTuple, Serializer};

use crate::model::connection::NanInterpretation;
use crate::response::interpreter::Sample;
use crate::utils::error::ResponseError;

const NAN: &str = "nan";

/// A point of a raw (non aggregated) metric, serialized as `[value, timestamp]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPoint {
  value: f64,
  timestamp: u64,
}

impl RawPoint {
  pub fn new(value: f64, timestamp: u64) -> Self {
    RawPoint { value, timestamp }
  }

  pub fn get_value(&self) -> f64 {
    self.value
  }

  /// Epoch milliseconds.
  pub fn get_timestamp(&self) -> u64 {
    self.timestamp
  }
}

impl Serialize for RawPoint {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut tuple = serializer.serialize_tuple(2)?;
    tuple.serialize_element(&self.value)?;
    tuple.serialize_element(&self.timestamp)?;
    tuple.end()
  }
}

/// A point of an aggregated metric, serialized as `[value, start, end]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPoint {
  value: f64,
  start: u64,
  end: u64,
}

impl BucketPoint {
  pub fn new(value: f64, start: u64, end: u64) -> Self {
    BucketPoint { value, start, end }
  }

  pub fn get_value(&self) -> f64 {
    self.value
  }

  pub fn get_start(&self) -> u64 {
    self.start
  }

  pub fn get_end(&self) -> u64 {
    self.end
  }
}

impl Serialize for BucketPoint {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut tuple = serializer.serialize_tuple(3)?;
    tuple.serialize_element(&self.value)?;
    tuple.serialize_element(&self.start)?;
    tuple.serialize_element(&self.end)?;
    tuple.end()
  }
}

/// Points of a fetched metric.
#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
  Raw(Vec<RawPoint>),
  Aggregated(Vec<BucketPoint>),
}

impl Telemetry {
  pub fn len(&self) -> usize {
    match self {
      Telemetry::Raw(points) => points.len(),
      Telemetry::Aggregated(points) => points.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

fn to_millis(timestamp_seconds: f64) -> u64 {
  (timestamp_seconds * 1000.0).round() as u64
}

/// Value of a sample after applying the NaN policy. `None` means the sample is dropped.
fn sample_value(
  sample: &Sample,
  nan_interpretation: NanInterpretation,
) -> Result<Option<f64>, ResponseError> {
  if sample.value.eq_ignore_ascii_case(NAN) {
    return match nan_interpretation {
      NanInterpretation::Zero => Ok(Some(0.0)),
      NanInterpretation::Skip => {
        error!(
          "Dropping NaN sample at {} seconds",
          sample.timestamp_seconds
        );
        Ok(None)
      }
    };
  }

  sample.value.parse::<f64>().map(Some).map_err(|err| {
    ResponseError::InvalidResponsePayload(format!(
      "Sample value {} is not a number: {}",
      sample.value, err
    ))
  })
}

/// Build raw points, keeping samples no later than `end_millis`.
pub fn make_raw_points(
  samples: &[Sample],
  end_millis: u64,
  nan_interpretation: NanInterpretation,
) -> Result<Vec<RawPoint>, ResponseError> {
  let mut points = Vec::with_capacity(samples.len());
  for sample in samples {
    let timestamp = to_millis(sample.timestamp_seconds);
    if timestamp > end_millis {
      continue;
    }
    if let Some(value) = sample_value(sample, nan_interpretation)? {
      points.push(RawPoint::new(value, timestamp));
    }
  }
  Ok(points)
}

/// Build bucket points of width `window_millis`. Buckets ending after `end_millis` are dropped.
pub fn make_bucket_points(
  samples: &[Sample],
  end_millis: u64,
  window_millis: u64,
  nan_interpretation: NanInterpretation,
) -> Result<Vec<BucketPoint>, ResponseError> {
  let mut points = Vec::with_capacity(samples.len());
  for sample in samples {
    let start = to_millis(sample.timestamp_seconds);
    let end = start.saturating_add(window_millis);
    if end > end_millis {
      continue;
    }
    if let Some(value) = sample_value(sample, nan_interpretation)? {
      points.push(BucketPoint::new(value, start, end));
    }
  }
  Ok(points)
}
