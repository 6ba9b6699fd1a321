// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::config::{
  DEFAULT_AWS_REGION, DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_ROLE_SESSION_NAME,
};

const NAN_AS_ZERO: &str = "ZERO";
const NAN_AS_NONE: &str = "NONE";

/// How NaN samples returned by the backend are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(from = "String", into = "String")]
pub enum NanInterpretation {
  /// Report NaN as 0.0.
  #[default]
  Zero,

  /// Drop NaN samples from the output.
  Skip,
}

impl From<String> for NanInterpretation {
  fn from(value: String) -> Self {
    if value == NAN_AS_ZERO {
      NanInterpretation::Zero
    } else {
      NanInterpretation::Skip
    }
  }
}

impl From<NanInterpretation> for String {
  fn from(value: NanInterpretation) -> Self {
    match value {
      NanInterpretation::Zero => NAN_AS_ZERO.to_owned(),
      NanInterpretation::Skip => NAN_AS_NONE.to_owned(),
    }
  }
}

fn default_region_name() -> String {
  DEFAULT_AWS_REGION.to_owned()
}

fn default_role_session_name() -> String {
  DEFAULT_ROLE_SESSION_NAME.to_owned()
}

fn default_request_timeout_seconds() -> u64 {
  DEFAULT_REQUEST_TIMEOUT_SECONDS
}

/// AWS settings for reaching a managed Prometheus workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct AwsAuthConfig {
  #[serde(default)]
  pub role_arn: Option<String>,

  #[serde(default)]
  pub external_id: Option<String>,

  #[serde(default)]
  pub aws_access_key_id: Option<String>,

  #[serde(default)]
  pub aws_secret_access_key: Option<String>,

  #[serde(default)]
  pub aws_session_token: Option<String>,

  #[serde(default = "default_region_name")]
  pub region_name: String,

  #[serde(default = "default_role_session_name")]
  pub role_session_name: String,
}

/// Describes the backend a request should be mirrored to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionDetails {
  url: String,

  #[serde(default = "default_request_timeout_seconds")]
  request_timeout_seconds: u64,

  #[serde(default)]
  nan_interpretation: NanInterpretation,

  #[serde(default)]
  aws: Option<AwsAuthConfig>,
}

impl ConnectionDetails {
  pub fn new(url: &str) -> Self {
    ConnectionDetails {
      url: url.to_owned(),
      request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
      nan_interpretation: NanInterpretation::Zero,
      aws: None,
    }
  }

  pub fn with_nan_interpretation(mut self, nan_interpretation: NanInterpretation) -> Self {
    self.nan_interpretation = nan_interpretation;
    self
  }

  pub fn with_aws(mut self, aws: AwsAuthConfig) -> Self {
    self.aws = Some(aws);
    self
  }

  /// Base URL without trailing slashes. This is also the identity of the memoized client.
  pub fn get_base_url(&self) -> &str {
    self.url.trim_end_matches('/')
  }

  pub fn get_request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_seconds)
  }

  pub fn get_nan_interpretation(&self) -> NanInterpretation {
    self.nan_interpretation
  }

  pub fn get_aws(&self) -> Option<&AwsAuthConfig> {
    self.aws.as_ref()
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_connection_details_defaults() {
    let details: ConnectionDetails =
      serde_json::from_value(json!({"url": "http://localhost:9000/"})).unwrap();
    assert_eq!(details.get_base_url(), "http://localhost:9000");
    assert_eq!(details.get_request_timeout(), Duration::from_secs(30));
    assert_eq!(details.get_nan_interpretation(), NanInterpretation::Zero);
    assert!(details.get_aws().is_none());
  }

  #[test]
  fn test_connection_details_with_aws() {
    let details: ConnectionDetails = serde_json::from_value(json!({
      "url": "https://aps-workspaces.eu-west-1.amazonaws.com/workspaces/ws-1/",
      "request_timeout_seconds": 15,
      "nan_interpretation": "NONE",
      "aws": {
        "aws_access_key_id": "AKID",
        "aws_secret_access_key": "SECRET"
      }
    }))
    .unwrap();
    assert_eq!(
      details.get_base_url(),
      "https://aps-workspaces.eu-west-1.amazonaws.com/workspaces/ws-1"
    );
    assert_eq!(details.get_request_timeout(), Duration::from_secs(15));
    assert_eq!(details.get_nan_interpretation(), NanInterpretation::Skip);

    let aws = details.get_aws().unwrap();
    assert_eq!(aws.aws_access_key_id.as_deref(), Some("AKID"));
    assert_eq!(aws.aws_session_token, None);
    assert_eq!(aws.region_name, DEFAULT_AWS_REGION);
    assert_eq!(aws.role_session_name, DEFAULT_ROLE_SESSION_NAME);
  }

  #[test]
  fn test_nan_interpretation() {
    assert_eq!(
      NanInterpretation::from("ZERO".to_owned()),
      NanInterpretation::Zero
    );
    assert_eq!(
      NanInterpretation::from("zero".to_owned()),
      NanInterpretation::Skip
    );
    assert_eq!(
      NanInterpretation::from("NONE".to_owned()),
      NanInterpretation::Skip
    );
  }
}
