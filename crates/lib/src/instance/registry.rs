use std::sync::Arc;

use async_trait::async_trait;
use handle_trait::Handle;
use tokio::sync::RwLock;

use super::{Instance, InstanceConfig, InstanceError, InstanceServices};
use crate::Result;
use crate::backend::Backend;
use crate::constants::CURRENT_INSTANCE;

/// Resolves the currently active tracker instance.
///
/// Callers resolve on every use instead of caching an [`Instance`], so a
/// configuration change takes effect on the next request.
#[async_trait]
pub trait InstanceRegistry: Send + Sync + std::fmt::Debug {
    /// Returns the active instance, or [`InstanceError::NotConfigured`].
    async fn current(&self) -> Result<Instance>;
}

/// Registry holding an explicitly configured instance.
///
/// The selection is persisted in the backend so it survives restarts.
/// This is a cheap-to-clone handle; clones share the selection.
#[derive(Clone, Debug, Handle)]
pub struct ConfiguredRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    backend: Arc<dyn Backend>,
    services: InstanceServices,
    current: RwLock<Option<InstanceConfig>>,
}

impl ConfiguredRegistry {
    /// Opens the registry.
    ///
    /// A `seed` replaces whatever selection was persisted before; without
    /// one the persisted selection, if any, is used.
    pub async fn open(
        backend: Arc<dyn Backend>,
        services: InstanceServices,
        seed: Option<InstanceConfig>,
    ) -> Result<Self> {
        let registry = Self {
            inner: Arc::new(RegistryInner {
                backend,
                services,
                current: RwLock::new(None),
            }),
        };

        match seed {
            Some(config) => registry.set_current(config).await?,
            None => {
                let persisted = registry.load_persisted().await?;
                if let Some(config) = &persisted {
                    tracing::info!(
                        instance = config.storage_key(),
                        instance_type = %config.instance_type(),
                        "Restored tracker instance selection"
                    );
                }
                *registry.inner.current.write().await = persisted;
            }
        }

        Ok(registry)
    }

    /// Makes `config` the active instance.
    pub async fn set_current(&self, config: InstanceConfig) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string(&config)?;
        self.inner.backend.set(CURRENT_INSTANCE, json, None).await?;

        tracing::info!(
            instance = config.storage_key(),
            instance_type = %config.instance_type(),
            "Tracker instance selected"
        );
        *self.inner.current.write().await = Some(config);
        Ok(())
    }

    /// Removes the active instance.
    pub async fn clear(&self) -> Result<()> {
        self.inner.backend.delete(CURRENT_INSTANCE).await?;
        *self.inner.current.write().await = None;
        tracing::info!("Tracker instance selection cleared");
        Ok(())
    }

    /// The active configuration, if any.
    pub async fn current_config(&self) -> Option<InstanceConfig> {
        self.inner.current.read().await.clone()
    }

    async fn load_persisted(&self) -> Result<Option<InstanceConfig>> {
        let Some(json) = self.inner.backend.get(CURRENT_INSTANCE).await? else {
            return Ok(None);
        };
        let config = serde_json::from_str(&json).map_err(|e| InstanceError::InvalidConfiguration {
            reason: format!("stored instance selection is unreadable: {e}"),
        })?;
        Ok(Some(config))
    }
}

#[async_trait]
impl InstanceRegistry for ConfiguredRegistry {
    async fn current(&self) -> Result<Instance> {
        let guard = self.inner.current.read().await;
        let config = guard.as_ref().ok_or(InstanceError::NotConfigured)?;
        Instance::from_config(config, self.inner.services.handle())
    }
}
