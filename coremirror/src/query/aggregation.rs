// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::fmt;
use std::str::FromStr;

use crate::utils::config::DISCRETION_INTERVAL_SECONDS;
use crate::utils::error::QueryError;

/// Aggregation methods the mirror can translate to PromQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationMethod {
  Mean,
  Percentile25,
  Percentile50,
  Percentile75,
  Percentile90,
  Percentile95,
  Percentile98,
  Percentile99,
  Max,
  Min,
  Sum,
  EventCount,
}

impl AggregationMethod {
  pub fn name(&self) -> &'static str {
    match self {
      AggregationMethod::Mean => "mean",
      AggregationMethod::Percentile25 => "percentile_25",
      AggregationMethod::Percentile50 => "percentile_50",
      AggregationMethod::Percentile75 => "percentile_75",
      AggregationMethod::Percentile90 => "percentile_90",
      AggregationMethod::Percentile95 => "percentile_95",
      AggregationMethod::Percentile98 => "percentile_98",
      AggregationMethod::Percentile99 => "percentile_99",
      AggregationMethod::Max => "max",
      AggregationMethod::Min => "min",
      AggregationMethod::Sum => "sum",
      AggregationMethod::EventCount => "event_count",
    }
  }

  /// Wrap an instant vector selector of a gauge.
  pub fn wrap_gauge(&self, expression: &str, window_seconds: u64) -> String {
    let quantile = |q: &str| format!("quantile({},{})", q, expression);
    match self {
      AggregationMethod::Mean => format!("avg({})", expression),
      AggregationMethod::Percentile25 => quantile("0.25"),
      AggregationMethod::Percentile50 => quantile("0.50"),
      AggregationMethod::Percentile75 => quantile("0.75"),
      AggregationMethod::Percentile90 => quantile("0.90"),
      AggregationMethod::Percentile95 => quantile("0.95"),
      AggregationMethod::Percentile98 => quantile("0.98"),
      AggregationMethod::Percentile99 => quantile("0.99"),
      AggregationMethod::Max => format!("max({})", expression),
      AggregationMethod::Min => format!("min({})", expression),
      AggregationMethod::Sum => format!("sum({})", expression),
      AggregationMethod::EventCount => {
        format!("count_over_time({}[{}s])", expression, window_seconds)
      }
    }
  }

  /// Wrap a counter selector: the increase over the window, sampled as a subquery at the discretion
  /// interval, then aggregated over time.
  pub fn wrap_counter(&self, expression: &str, window_seconds: u64) -> String {
    let increase = format!(
      "increase({}[{}s])[{}s:{}s]",
      expression, window_seconds, window_seconds, DISCRETION_INTERVAL_SECONDS
    );
    let quantile = |q: &str| format!("quantile_over_time({},{})", q, increase);
    match self {
      AggregationMethod::Mean => format!("avg_over_time({})", increase),
      AggregationMethod::Percentile25 => quantile("0.25"),
      AggregationMethod::Percentile50 => quantile("0.50"),
      AggregationMethod::Percentile75 => quantile("0.75"),
      AggregationMethod::Percentile90 => quantile("0.90"),
      AggregationMethod::Percentile95 => quantile("0.95"),
      AggregationMethod::Percentile98 => quantile("0.98"),
      AggregationMethod::Percentile99 => quantile("0.99"),
      AggregationMethod::Max => format!("max_over_time({})", increase),
      AggregationMethod::Min => format!("min_over_time({})", increase),
      AggregationMethod::Sum => format!("sum_over_time({})", increase),
      AggregationMethod::EventCount => format!("count_over_time({})", increase),
    }
  }
}

impl FromStr for AggregationMethod {
  type Err = QueryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "mean" => Ok(AggregationMethod::Mean),
      "percentile_25" => Ok(AggregationMethod::Percentile25),
      "percentile_50" => Ok(AggregationMethod::Percentile50),
      "percentile_75" => Ok(AggregationMethod::Percentile75),
      "percentile_90" => Ok(AggregationMethod::Percentile90),
      "percentile_95" => Ok(AggregationMethod::Percentile95),
      "percentile_98" => Ok(AggregationMethod::Percentile98),
      "percentile_99" => Ok(AggregationMethod::Percentile99),
      "max" => Ok(AggregationMethod::Max),
      "min" => Ok(AggregationMethod::Min),
      "sum" => Ok(AggregationMethod::Sum),
      "event_count" => Ok(AggregationMethod::EventCount),
      _ => Err(QueryError::UnsupportedAggregation(s.to_owned())),
    }
  }
}

impl fmt::Display for AggregationMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}
