// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
/// Errors of the mirror server, outside of the ones reported by the core.
pub enum MirrorError {
  #[error("Invalid input {0}.")]
  InvalidInput(String),
}
