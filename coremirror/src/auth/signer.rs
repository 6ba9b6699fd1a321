// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningParams, SigningSettings};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;

use crate::utils::error::CoreMirrorError;

/// Signing name of Amazon Managed Service for Prometheus.
pub const SERVICE_NAME: &str = "aps";

/// Signs outbound requests with SigV4 for the managed Prometheus service.
#[derive(Debug, Clone)]
pub struct RequestSigner {
  identity: Identity,
  region: String,
}

impl RequestSigner {
  pub fn new(credentials: Credentials, region: &str) -> Self {
    RequestSigner {
      identity: credentials.into(),
      region: region.to_owned(),
    }
  }

  pub fn get_region(&self) -> &str {
    &self.region
  }

  /// Sign a body-less request to the given (fully encoded) URL. Returns the headers to add to the request.
  pub fn sign(&self, method: &str, url: &str) -> Result<Vec<(String, String)>, CoreMirrorError> {
    self.sign_at(method, url, SystemTime::now())
  }

  fn sign_at(
    &self,
    method: &str,
    url: &str,
    time: SystemTime,
  ) -> Result<Vec<(String, String)>, CoreMirrorError> {
    let signing_params: SigningParams = v4::SigningParams::builder()
      .identity(&self.identity)
      .region(&self.region)
      .name(SERVICE_NAME)
      .time(time)
      .settings(SigningSettings::default())
      .build()
      .map_err(|err| CoreMirrorError::SigningError(err.to_string()))?
      .into();

    let signable_request = SignableRequest::new(
      method,
      url,
      std::iter::empty::<(&str, &str)>(),
      SignableBody::Bytes(&[]),
    )
    .map_err(|err| CoreMirrorError::SigningError(err.to_string()))?;

    let (instructions, _signature) = sign(signable_request, &signing_params)
      .map_err(|err| CoreMirrorError::SigningError(err.to_string()))?
      .into_parts();

    Ok(
      instructions
        .headers()
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect(),
    )
  }
}
