// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::sync::Arc;

use dashmap::DashMap;
use log::info;

use crate::client::prometheus::PrometheusClient;
use crate::model::connection::ConnectionDetails;
use crate::utils::error::CoreMirrorError;

/// Clients keyed by backend base URL. Entries are never evicted.
///
/// No lock is held while a client is built, so concurrent first calls for the same URL may each build a
/// client. The first one inserted is kept and the others are dropped.
#[derive(Debug, Default)]
pub struct ClientRegistry {
  clients: DashMap<String, Arc<PrometheusClient>>,
}

impl ClientRegistry {
  pub fn new() -> Self {
    ClientRegistry {
      clients: DashMap::new(),
    }
  }

  /// Get the client for the base URL of `details`, creating it on first use.
  ///
  /// The other settings of `details` only matter when the client is created.
  pub async fn get_instance(
    &self,
    details: &ConnectionDetails,
  ) -> Result<Arc<PrometheusClient>, CoreMirrorError> {
    let key = details.get_base_url();
    if let Some(client) = self.clients.get(key) {
      return Ok(client.value().clone());
    }

    let client = Arc::new(PrometheusClient::new(details).await?);
    info!("Registering client for {}", key);
    let entry = self.clients.entry(key.to_owned()).or_insert(client);
    Ok(entry.value().clone())
  }

  pub fn len(&self) -> usize {
    self.clients.len()
  }

  pub fn is_empty(&self) -> bool {
    self.clients.is_empty()
  }
}
