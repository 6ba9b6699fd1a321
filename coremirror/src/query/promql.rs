// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Translation of structured conditions and aggregations into PromQL.
//!
//! Exactly one selector condition (`__gauge__`, `__counter__` or `~`) picks the metric and how it is read:
//!  - a gauge is read as an instant vector and aggregated with instant aggregation operators,
//!  - a counter is always read through `increase` and aggregated over time with a subquery,
//!  - `~` carries a raw PromQL query that is used as is.
//!
//! All other conditions become label matchers, rendered in the order they were given.

use log::debug;

use crate::model::condition::{Condition, COUNTER_KEY, GAUGE_KEY, RESERVED_KEYS};
use crate::query::aggregation::AggregationMethod;
use crate::utils::config::DISCRETION_INTERVAL_SECONDS;
use crate::utils::error::QueryError;

/// What the selector condition asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
  Gauge(String),
  Counter(String),
  Raw(String),
}

/// A PromQL query built from structured conditions.
#[derive(Debug)]
pub struct PromQuery<'a> {
  conditions: &'a [Condition],
  aggregation: Option<AggregationMethod>,
  window_seconds: u64,
}

impl<'a> PromQuery<'a> {
  pub fn new(
    conditions: &'a [Condition],
    aggregation: Option<AggregationMethod>,
    window_seconds: u64,
  ) -> Self {
    PromQuery {
      conditions,
      aggregation,
      window_seconds,
    }
  }

  /// Compile to a PromQL string.
  pub fn to_promql(&self) -> Result<String, QueryError> {
    let (selector, label_conditions) = Self::extract_selector(self.conditions)?;

    let query = match selector {
      Selector::Gauge(name) => {
        let query = format!("{}{}", name, Self::label_clause(&label_conditions));
        match self.aggregation {
          Some(method) => method.wrap_gauge(&query, self.window_seconds),
          None => query,
        }
      }
      Selector::Counter(name) => {
        let query = format!("{}{}", name, Self::label_clause(&label_conditions));
        match self.aggregation {
          Some(method) => method.wrap_counter(&query, self.window_seconds),
          None => format!("increase({}[{}s])", query, DISCRETION_INTERVAL_SECONDS),
        }
      }
      Selector::Raw(query) => query,
    };

    debug!("Compiled conditions {:?} to {}", self.conditions, query);
    Ok(query)
  }

  /// Split off the single selector condition from the label conditions.
  fn extract_selector(
    conditions: &[Condition],
  ) -> Result<(Selector, Vec<&Condition>), QueryError> {
    let (selectors, label_conditions): (Vec<&Condition>, Vec<&Condition>) =
      conditions.iter().partition(|condition| condition.is_selector());

    let selector = match selectors.as_slice() {
      [selector] => *selector,
      [] => {
        return Err(QueryError::RequiredSelector(format!(
          "One of {:?} is required",
          RESERVED_KEYS
        )))
      }
      _ => {
        return Err(QueryError::RequiredSelector(format!(
          "Multiple values for {:?}",
          RESERVED_KEYS
        )))
      }
    };

    let name = selector.get_value().as_text().ok_or_else(|| {
      QueryError::RequiredSelector(format!(
        "Selector {} requires a single value",
        selector.get_key()
      ))
    })?;

    let selector = match selector.get_key() {
      GAUGE_KEY => Selector::Gauge(name),
      COUNTER_KEY => Selector::Counter(name),
      _ => Selector::Raw(name),
    };

    Ok((selector, label_conditions))
  }

  /// Render label conditions as `{k1="v1", k2=~"(a)|(b)"}`.
  fn label_clause(conditions: &[&Condition]) -> String {
    let matchers: Vec<String> = conditions
      .iter()
      .map(|condition| condition.to_promql())
      .collect();
    format!("{{{}}}", matchers.join(", "))
  }
}
