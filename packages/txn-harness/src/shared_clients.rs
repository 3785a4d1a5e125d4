//! Reference-counted registry of shared client handles.
//!
//! Delegates running in one process share a single connected client per
//! (client implementation, connection URL) pair. The first acquire creates
//! and connects it; the last release disconnects it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::client::{ClientFactory, TransactionalClient};
use crate::config::HarnessOptions;
use crate::error::HarnessError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    client: String,
    url_hash: u64,
}

impl ClientKey {
    pub fn new(client: &str, url: Option<&str>) -> Self {
        Self {
            client: client.to_string(),
            url_hash: url.map(|u| xxh3_64(u.as_bytes())).unwrap_or(0),
        }
    }

    /// Key for `options`, falling back to the factory's name when no
    /// client implementation is named explicitly.
    pub fn for_options(options: &HarnessOptions, default_client: &str) -> Self {
        let client = options
            .client_module_path
            .as_deref()
            .unwrap_or(default_client);
        Self::new(client, options.connection_url.as_deref())
    }

    fn log_key(&self) -> String {
        format!("{}:{:x}", self.client, self.url_hash)
    }
}

struct Slot<C> {
    client: Option<Arc<C>>,
    owners: usize,
}

/// Explicitly passed context holding the shared client handles.
pub struct SharedClients<C> {
    slots: DashMap<ClientKey, Arc<Mutex<Slot<C>>>>,
}

impl<C> Default for SharedClients<C> {
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }
}

impl<C: TransactionalClient> SharedClients<C> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &ClientKey) -> Arc<Mutex<Slot<C>>> {
        Arc::clone(
            self.slots
                .entry(key.clone())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(Slot {
                        client: None,
                        owners: 0,
                    }))
                })
                .value(),
        )
    }

    /// Acquire the shared client for `options`, creating and connecting it
    /// when this is the first owner.
    pub async fn acquire<F>(
        &self,
        options: &HarnessOptions,
        factory: &F,
    ) -> Result<(ClientKey, Arc<C>), HarnessError>
    where
        F: ClientFactory<Client = C>,
    {
        let key = ClientKey::for_options(options, factory.name());
        let slot = self.slot(&key);
        let mut slot = slot.lock().await;

        if let Some(client) = slot.client.clone() {
            slot.owners += 1;
            debug!(
                shared_client = "reuse",
                key = %key.log_key(),
                owners = slot.owners,
                "Reusing shared database client"
            );
            return Ok((key, client));
        }

        info!("shared_client=create key={} factory={}", key.log_key(), factory.name());
        let client = factory.create(options).await?;
        client.connect().await?;

        let client = Arc::new(client);
        slot.client = Some(Arc::clone(&client));
        slot.owners = 1;
        Ok((key, client))
    }

    /// Give up one ownership of `key`. The last owner disconnects the client
    /// and any disconnect error is returned.
    pub async fn release(&self, key: &ClientKey) -> Result<(), HarnessError> {
        let Some(slot) = self.slots.get(key).map(|e| Arc::clone(e.value())) else {
            warn!("shared_client=release_unknown key={}", key.log_key());
            return Ok(());
        };
        let mut slot = slot.lock().await;

        if slot.owners == 0 {
            warn!("shared_client=release_without_owner key={}", key.log_key());
            return Ok(());
        }

        slot.owners -= 1;
        if slot.owners > 0 {
            debug!(
                shared_client = "release",
                key = %key.log_key(),
                owners = slot.owners,
                "Shared database client still in use"
            );
            return Ok(());
        }

        match slot.client.take() {
            Some(client) => {
                info!("shared_client=disconnect key={}", key.log_key());
                client.disconnect().await?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Current number of owners of `key`.
    pub async fn owners(&self, key: &ClientKey) -> usize {
        match self.slots.get(key).map(|e| Arc::clone(e.value())) {
            Some(slot) => slot.lock().await.owners,
            None => 0,
        }
    }
}
