// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

/// Region used for signing when the connection does not name one.
pub const DEFAULT_AWS_REGION: &str = "eu-west-1";

/// Session name passed to AssumeRole when the connection does not name one.
pub const DEFAULT_ROLE_SESSION_NAME: &str = "Prometheus-Mirror";

/// Request timeout used when the connection does not name one.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Max attempts for the token service client when called with static keys.
pub const DEFAULT_STS_MAX_ATTEMPTS: u32 = 50;

/// Smallest bucket (and query step) the mirror issues queries with.
pub const MIN_BUCKET_SIZE_MILLIS: u64 = 30000;

/// Query window used when the caller does not provide one.
pub const DEFAULT_WINDOW_SECONDS: u64 = 30;

/// Fixed inner interval for counter increases.
pub const DISCRETION_INTERVAL_SECONDS: u64 = 60;

/// Set up a logger for tests. Safe to call more than once.
pub fn config_test_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}
