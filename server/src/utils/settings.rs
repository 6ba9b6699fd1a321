// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

const DEFAULT_CONFIG_FILE_NAME: &str = "default.toml";

#[derive(Debug, Deserialize)]
/// Settings for the mirror server.
pub struct ServerSettings {
  port: u16,
  host: String,
  api_key: String,
  workers: usize,
}

impl ServerSettings {
  /// Get the port.
  pub fn get_port(&self) -> u16 {
    self.port
  }

  /// Get the host.
  pub fn get_host(&self) -> &str {
    &self.host
  }

  /// Get the key returned in the api key header of every response.
  pub fn get_api_key(&self) -> &str {
    &self.api_key
  }

  /// Get the number of worker threads. A configured 0 means one less than the number of CPUs, and at
  /// least 1.
  pub fn get_workers(&self) -> usize {
    if self.workers == 0 {
      std::cmp::max(1, num_cpus::get().saturating_sub(1))
    } else {
      self.workers
    }
  }
}

#[derive(Debug, Deserialize)]
/// Settings for the mirror, read from config file.
pub struct Settings {
  server: ServerSettings,
}

impl Settings {
  /// Create Settings from given configuration directory path.
  pub fn new(config_dir_path: &str) -> Result<Self, ConfigError> {
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
    let config_default_file_name = format!("{}/{}", config_dir_path, DEFAULT_CONFIG_FILE_NAME);
    let config_environment_file_name = format!("{}/{}.toml", config_dir_path, run_mode);

    let config = Config::builder()
      .add_source(File::with_name(&config_default_file_name))
      // Optional per run mode overrides, 'development' by default.
      .add_source(File::with_name(&config_environment_file_name).required(false))
      // Environment overrides such as MIRROR__SERVER__PORT.
      .add_source(Environment::with_prefix("MIRROR").separator("__"))
      .build()?;

    config.try_deserialize()
  }

  /// Get server settings.
  pub fn get_server_settings(&self) -> &ServerSettings {
    &self.server
  }

  #[cfg(test)]
  /// Get the default config file name.
  pub fn get_default_config_file_name() -> &'static str {
    DEFAULT_CONFIG_FILE_NAME
  }
}

#[cfg(test)]
mod tests {
  use std::fs::File;
  use std::io::Write;

  use tempdir::TempDir;

  use super::*;
  use crate::utils::test_with_env_vars::with_env_vars;

  fn write_config(config_dir_path: &str, workers: usize) {
    let path = format!(
      "{}/{}",
      config_dir_path,
      Settings::get_default_config_file_name()
    );
    let mut file = File::create(path).unwrap();
    file.write_all(b"[server]\n").unwrap();
    file.write_all(b"port = 9191\n").unwrap();
    file.write_all(b"host = \"127.0.0.1\"\n").unwrap();
    file.write_all(b"api_key = \"secret\"\n").unwrap();
    file
      .write_all(format!("workers = {}\n", workers).as_bytes())
      .unwrap();
  }

  fn without_overrides() -> Vec<(&'static str, Option<&'static str>)> {
    vec![("RUN_MODE", None), ("MIRROR__SERVER__HOST", None)]
  }

  #[test]
  fn test_default_settings() {
    with_env_vars(without_overrides(), || {
      let config_dir_path = "../config";
      let settings = Settings::new(config_dir_path).expect("Could not parse config");

      let server_settings = settings.get_server_settings();
      assert_eq!(server_settings.get_port(), 9090);
      assert_eq!(server_settings.get_host(), "0.0.0.0");
      assert_eq!(server_settings.get_api_key(), "unsecure");
      assert_eq!(server_settings.get_workers(), 6);
    });
  }

  #[test]
  fn test_settings_from_dir() {
    let config_dir = TempDir::new("config_test").unwrap();
    let config_dir_path = config_dir.path().to_str().unwrap();
    write_config(config_dir_path, 0);

    with_env_vars(without_overrides(), || {
      let settings = Settings::new(config_dir_path).unwrap();
      let server_settings = settings.get_server_settings();
      assert_eq!(server_settings.get_port(), 9191);
      assert_eq!(server_settings.get_host(), "127.0.0.1");
      assert_eq!(server_settings.get_api_key(), "secret");
      assert!(server_settings.get_workers() >= 1);
    });
  }

  #[test]
  fn test_settings_overrides() {
    let config_dir = TempDir::new("config_test").unwrap();
    let config_dir_path = config_dir.path().to_str().unwrap().to_owned();
    write_config(&config_dir_path, 2);

    // The run mode file overrides the default file.
    let mut file = File::create(format!("{}/staging.toml", config_dir_path)).unwrap();
    file.write_all(b"[server]\nport = 9292\n").unwrap();

    with_env_vars(
      vec![("RUN_MODE", Some("staging")), ("MIRROR__SERVER__HOST", None)],
      || {
        let settings = Settings::new(&config_dir_path).unwrap();
        assert_eq!(settings.get_server_settings().get_port(), 9292);
        assert_eq!(settings.get_server_settings().get_host(), "127.0.0.1");
      },
    );

    // The environment overrides both files.
    with_env_vars(
      vec![
        ("RUN_MODE", Some("staging")),
        ("MIRROR__SERVER__HOST", Some("10.0.0.1")),
      ],
      || {
        let settings = Settings::new(&config_dir_path).unwrap();
        assert_eq!(settings.get_server_settings().get_port(), 9292);
        assert_eq!(settings.get_server_settings().get_host(), "10.0.0.1");
        assert_eq!(settings.get_server_settings().get_workers(), 2);
      },
    );
  }
}
