// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::collections::BTreeSet;
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Selector key for a gauge metric.
pub const GAUGE_KEY: &str = "__gauge__";

/// Selector key for a counter metric.
pub const COUNTER_KEY: &str = "__counter__";

/// Selector key for a raw PromQL query.
pub const RAW_QUERY_KEY: &str = "~";

/// Keys that select the metric instead of matching a label.
pub const RESERVED_KEYS: [&str; 3] = [COUNTER_KEY, GAUGE_KEY, RAW_QUERY_KEY];

const STRING_VALUE: &str = "StringValue";
const BOOLEAN_VALUE: &str = "BooleanValue";
const DOUBLE_VALUE: &str = "DoubleValue";
const IN_SET_VALUE: &str = "InSetValue";

fn default_value_type() -> String {
  STRING_VALUE.to_owned()
}

/// Wire shape of a condition value: `{"value": ..., "_type": "StringValue"}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct RawConditionValue {
  value: Value,

  #[serde(rename = "_type", default = "default_value_type")]
  type_descriptor: String,
}

/// Literal value of a condition. The variant decides how it is rendered in PromQL.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawConditionValue", into = "RawConditionValue")]
pub enum ConditionValue {
  String(String),
  Boolean(bool),
  /// Numeric text as received, e.g. `2` or `2.5`. Label matching compares strings, so `2` and `2.0` differ.
  Double(String),
  /// Members are kept sorted so that rendering is deterministic.
  InSet(BTreeSet<String>),
}

impl ConditionValue {
  /// Create an InSet value from any collection of strings.
  pub fn in_set<I, S>(values: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    ConditionValue::InSet(values.into_iter().map(Into::into).collect())
  }

  /// Create a Double value from a float, rendered with a fractional part, e.g. `2.0`.
  pub fn double(value: f64) -> Self {
    ConditionValue::Double(format_float(value))
  }

  /// Render this value as the right hand side of a PromQL label matcher, including the operator suffix
  /// after `=`. Equality values render as `"value"`, sets render as `~"(a)|(b)"`.
  pub fn to_promql_literal(&self) -> String {
    match self {
      ConditionValue::String(value) => format!("\"{}\"", value),
      ConditionValue::Boolean(value) => format!("\"{}\"", value),
      ConditionValue::Double(value) => format!("\"{}\"", value),
      ConditionValue::InSet(values) => {
        let alternatives: Vec<String> = values
          .iter()
          .map(|value| format!("({})", escape_regex_token(value)))
          .collect();
        format!("~\"{}\"", alternatives.join("|"))
      }
    }
  }

  /// Text of a scalar value, used when the value names a metric or carries a raw query.
  /// Sets have no single text form.
  pub fn as_text(&self) -> Option<String> {
    match self {
      ConditionValue::String(value) => Some(value.clone()),
      ConditionValue::Boolean(value) => Some(value.to_string()),
      ConditionValue::Double(value) => Some(value.clone()),
      ConditionValue::InSet(_) => None,
    }
  }
}

/// Format a float with the shortest text that reads back the same. Integral values keep a fractional
/// part (`2.0`), and exponents below -4 or from 16 on are written with a sign and two digits (`1e+16`).
fn format_float(value: f64) -> String {
  let scientific = format!("{:e}", value);
  let exponent = scientific
    .split_once('e')
    .and_then(|(_, exponent)| exponent.parse::<i32>().ok())
    .unwrap_or(0);

  if value == 0.0 || !value.is_finite() || (-4..16).contains(&exponent) {
    return format!("{:?}", value);
  }

  let mantissa = scientific.split('e').next().unwrap_or_default();
  let sign = if exponent < 0 { '-' } else { '+' };
  format!("{}e{}{:02}", mantissa, sign, exponent.abs())
}

fn number_text(number: &serde_json::Number) -> Result<String, String> {
  if number.is_f64() {
    number
      .as_f64()
      .map(format_float)
      .ok_or_else(|| format!("Invalid double value {}", number))
  } else {
    Ok(number.to_string())
  }
}

/// Escape regex metacharacters for use inside a PromQL double-quoted regex. The backslash itself has to be
/// escaped for the string literal, hence two of them.
pub fn escape_regex_token(token: &str) -> String {
  let mut escaped = String::with_capacity(token.len());
  for c in token.chars() {
    if matches!(c, '*' | '+' | '?' | '(' | ')' | '|') {
      escaped.push_str("\\\\");
    }
    escaped.push(c);
  }
  escaped
}

fn value_to_plain_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

impl TryFrom<RawConditionValue> for ConditionValue {
  type Error = String;

  fn try_from(raw: RawConditionValue) -> Result<Self, Self::Error> {
    let value = raw.value;
    match raw.type_descriptor.as_str() {
      STRING_VALUE => Ok(ConditionValue::String(value_to_plain_string(&value))),
      BOOLEAN_VALUE => match &value {
        Value::Bool(b) => Ok(ConditionValue::Boolean(*b)),
        Value::String(s) => match s.to_lowercase().as_str() {
          "true" => Ok(ConditionValue::Boolean(true)),
          "false" => Ok(ConditionValue::Boolean(false)),
          _ => Err(format!("Invalid boolean value {}", s)),
        },
        other => Err(format!("Invalid boolean value {}", other)),
      },
      DOUBLE_VALUE => match &value {
        Value::Number(n) => number_text(n).map(ConditionValue::Double),
        Value::String(s) => s
          .trim()
          .parse::<f64>()
          .map(|_| ConditionValue::Double(s.clone()))
          .map_err(|_| format!("Invalid double value {}", s)),
        other => Err(format!("Invalid double value {}", other)),
      },
      IN_SET_VALUE => match &value {
        Value::Array(items) => Ok(ConditionValue::InSet(
          items.iter().map(value_to_plain_string).collect(),
        )),
        other => Err(format!("Invalid set value {}", other)),
      },
      other => Err(format!("Unknown condition value type {}", other)),
    }
  }
}

impl From<ConditionValue> for RawConditionValue {
  fn from(value: ConditionValue) -> Self {
    let (value, type_descriptor) = match value {
      ConditionValue::String(s) => (Value::String(s), STRING_VALUE),
      ConditionValue::Boolean(b) => (Value::Bool(b), BOOLEAN_VALUE),
      ConditionValue::Double(text) => (
        serde_json::from_str::<serde_json::Number>(&text)
          .map(Value::Number)
          .unwrap_or(Value::String(text)),
        DOUBLE_VALUE,
      ),
      ConditionValue::InSet(set) => (
        Value::Array(set.into_iter().map(Value::String).collect()),
        IN_SET_VALUE,
      ),
    };
    RawConditionValue {
      value,
      type_descriptor: type_descriptor.to_owned(),
    }
  }
}

/// A `key = value` condition of a query. Reserved keys select the metric, all other keys match labels.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Condition {
  key: String,
  value: ConditionValue,

  #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
  type_descriptor: Option<String>,
}

impl Condition {
  pub fn new(key: &str, value: ConditionValue) -> Self {
    Condition {
      key: key.to_owned(),
      value,
      type_descriptor: None,
    }
  }

  pub fn get_key(&self) -> &str {
    &self.key
  }

  pub fn get_value(&self) -> &ConditionValue {
    &self.value
  }

  /// Whether this condition is a selector rather than a label match.
  pub fn is_selector(&self) -> bool {
    RESERVED_KEYS.contains(&self.key.as_str())
  }

  /// Render as a PromQL label matcher.
  pub fn to_promql(&self) -> String {
    format!("{}={}", self.key, self.value.to_promql_literal())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use test_case::test_case;

  use super::*;

  #[test_case(ConditionValue::String("stringValue2".to_owned()), "\"stringValue2\""; "string")]
  #[test_case(ConditionValue::Boolean(true), "\"true\""; "boolean true")]
  #[test_case(ConditionValue::Boolean(false), "\"false\""; "boolean false")]
  #[test_case(ConditionValue::double(2.0), "\"2.0\""; "integral double")]
  #[test_case(ConditionValue::double(0.25), "\"0.25\""; "fractional double")]
  #[test_case(ConditionValue::double(1e16), "\"1e+16\""; "large double")]
  #[test_case(ConditionValue::double(1.5e-7), "\"1.5e-07\""; "small double")]
  #[test_case(ConditionValue::double(1e15), "\"1000000000000000.0\""; "below exponent threshold")]
  #[test_case(ConditionValue::in_set(["b", "a"]), "~\"(a)|(b)\""; "sorted set")]
  fn test_promql_literal(value: ConditionValue, expected: &str) {
    assert_eq!(value.to_promql_literal(), expected);
  }

  #[test_case(json!(2), "\"2\""; "integer number")]
  #[test_case(json!(2.0), "\"2.0\""; "float number")]
  #[test_case(json!(2.5), "\"2.5\""; "fractional number")]
  #[test_case(json!(1e16), "\"1e+16\""; "large number")]
  #[test_case(json!("2"), "\"2\""; "integer string")]
  #[test_case(json!("2.50"), "\"2.50\""; "string kept as given")]
  fn test_double_literal_keeps_text(value: Value, expected: &str) {
    let value: ConditionValue =
      serde_json::from_value(json!({"value": value, "_type": "DoubleValue"})).unwrap();
    assert_eq!(value.to_promql_literal(), expected);
  }

  #[test]
  fn test_escape_regex_token() {
    assert_eq!(escape_regex_token("plain"), "plain");
    assert_eq!(escape_regex_token("a*b"), "a\\\\*b");
    assert_eq!(
      escape_regex_token(".*+?()|\\$^"),
      ".\\\\*\\\\+\\\\?\\\\(\\\\)\\\\|\\$^"
    );
  }

  #[test]
  fn test_deserialize_condition_values() {
    let value: ConditionValue =
      serde_json::from_value(json!({"value": "name", "_type": "StringValue"})).unwrap();
    assert_eq!(value, ConditionValue::String("name".to_owned()));

    // Type defaults to a string value.
    let value: ConditionValue = serde_json::from_value(json!({"value": "name"})).unwrap();
    assert_eq!(value, ConditionValue::String("name".to_owned()));

    let value: ConditionValue =
      serde_json::from_value(json!({"value": "true", "_type": "BooleanValue"})).unwrap();
    assert_eq!(value, ConditionValue::Boolean(true));

    let value: ConditionValue =
      serde_json::from_value(json!({"value": false, "_type": "BooleanValue"})).unwrap();
    assert_eq!(value, ConditionValue::Boolean(false));

    let result: Result<ConditionValue, _> =
      serde_json::from_value(json!({"value": "two", "_type": "DoubleValue"}));
    assert!(result.is_err());

    let value: ConditionValue =
      serde_json::from_value(json!({"value": ["B", "A", 1], "_type": "InSetValue"})).unwrap();
    assert_eq!(value, ConditionValue::in_set(["1", "A", "B"]));

    let result: Result<ConditionValue, _> =
      serde_json::from_value(json!({"value": "x", "_type": "RegexValue"}));
    assert!(result.is_err());

    let result: Result<ConditionValue, _> =
      serde_json::from_value(json!({"value": "maybe", "_type": "BooleanValue"}));
    assert!(result.is_err());
  }

  #[test]
  fn test_condition() {
    let condition: Condition = serde_json::from_value(json!({
      "key": "__gauge__",
      "value": {"value": "name", "_type": "StringValue"},
      "_type": "EqualityCondition"
    }))
    .unwrap();
    assert!(condition.is_selector());
    assert_eq!(condition.get_key(), GAUGE_KEY);
    assert_eq!(condition.get_value().as_text(), Some("name".to_owned()));

    let condition = Condition::new("job", ConditionValue::String("api".to_owned()));
    assert!(!condition.is_selector());
    assert_eq!(condition.to_promql(), "job=\"api\"");
    assert_eq!(ConditionValue::in_set(["x"]).as_text(), None);
  }
}
