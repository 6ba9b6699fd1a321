// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use log::debug;

/// Files read, in order, for environment variables. Variables already set are not overridden.
const ENV_FILE_NAMES: [&str; 2] = [".env", ".env-creds"];

/// Load environment variables - esp. AWS credentials used by the default credential chain.
pub fn load_env() {
  for file_name in ENV_FILE_NAMES {
    match dotenv::from_filename(file_name) {
      Ok(path) => debug!("Loaded environment variables from {}", path.display()),
      Err(_) => debug!("No {} file found, skipping", file_name),
    }
  }
}
