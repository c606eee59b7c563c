//! Connection resolver.
//!
//! Resolves the active configuration (explicit beats ambient) and memoizes
//! execution-handle construction on it. The memo key is the configuration's
//! *value*: equal-by-value configs built from fresh allocations reuse the
//! cached handle, and only an actual change of configuration triggers a
//! rebuild. A superseded handle is simply dropped; nothing else holds it.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use safe_sync_client::{HandleFactory, PublicHandle, SignerHandle};
use safe_sync_types::{SafeConfig, SignerCredentials};
use tracing::debug;

const NO_CONFIG: &str = "no Safe configuration provided and no ambient configuration is set";

/// Resolves explicit or ambient configuration.
#[derive(Default)]
pub struct ConnectionResolver {
    ambient: Arc<RwLock<Option<SafeConfig>>>,
}

impl ConnectionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ambient(config: SafeConfig) -> Self {
        Self {
            ambient: Arc::new(RwLock::new(Some(config))),
        }
    }

    /// Resolve the active configuration. An explicit config wins and pairs
    /// with an inert setter; otherwise the ambient config and its live
    /// setter. Fails when neither exists.
    pub fn resolve(&self, explicit: Option<SafeConfig>) -> Result<(SafeConfig, ConfigSetter)> {
        if let Some(config) = explicit {
            return Ok((config, ConfigSetter { target: None }));
        }
        let ambient = self
            .ambient
            .read()
            .clone()
            .ok_or_else(|| anyhow!(NO_CONFIG))?;
        Ok((
            ambient,
            ConfigSetter {
                target: Some(Arc::clone(&self.ambient)),
            },
        ))
    }

    pub fn ambient(&self) -> Option<SafeConfig> {
        self.ambient.read().clone()
    }

    pub fn set_ambient(&self, config: SafeConfig) {
        *self.ambient.write() = Some(config);
    }

    /// Attach a signer to the ambient configuration.
    pub fn connect(&self, signer: SignerCredentials) -> Result<()> {
        let mut ambient = self.ambient.write();
        let current = ambient.as_ref().ok_or_else(|| anyhow!(NO_CONFIG))?;
        debug!("signer attached to ambient configuration");
        *ambient = Some(current.with_signer(signer));
        Ok(())
    }

    /// Detach the signer from the ambient configuration.
    pub fn disconnect(&self) -> Result<()> {
        let mut ambient = self.ambient.write();
        let current = ambient.as_ref().ok_or_else(|| anyhow!(NO_CONFIG))?;
        debug!("signer detached from ambient configuration");
        *ambient = Some(current.without_signer());
        Ok(())
    }
}

/// Setter paired with a resolved configuration. Inert when the configuration
/// was explicit.
#[derive(Debug)]
pub struct ConfigSetter {
    target: Option<Arc<RwLock<Option<SafeConfig>>>>,
}

impl ConfigSetter {
    pub fn is_inert(&self) -> bool {
        self.target.is_none()
    }

    /// Replace the ambient configuration. Returns false (and does nothing)
    /// on an inert setter.
    pub fn set(&self, config: SafeConfig) -> bool {
        match &self.target {
            Some(target) => {
                *target.write() = Some(config);
                true
            }
            None => false,
        }
    }
}

struct Slot<H> {
    config: Option<SafeConfig>,
    handle: Option<H>,
}

impl<H> Default for Slot<H> {
    fn default() -> Self {
        Self {
            config: None,
            handle: None,
        }
    }
}

/// Value-keyed memo over handle construction.
///
/// The slots are held behind async mutexes so a rebuild serializes with
/// concurrent lookups; whichever configuration is seen last wins the slot.
pub struct HandleCache {
    factory: Arc<dyn HandleFactory>,
    public: tokio::sync::Mutex<Slot<PublicHandle>>,
    signer: tokio::sync::Mutex<Slot<SignerHandle>>,
}

impl HandleCache {
    pub fn new(factory: Arc<dyn HandleFactory>) -> Self {
        Self {
            factory,
            public: tokio::sync::Mutex::new(Slot::default()),
            signer: tokio::sync::Mutex::new(Slot::default()),
        }
    }

    /// The public handle for `config`, rebuilt only when the configuration
    /// value changed since the last construction.
    pub async fn public_handle(&self, config: &SafeConfig) -> Result<PublicHandle> {
        let mut slot = self.public.lock().await;
        if slot.config.as_ref() == Some(config) {
            if let Some(handle) = &slot.handle {
                return Ok(handle.clone());
            }
        }
        debug!(chain = %config.chain_id, "building public handle");
        let handle = self.factory.build_public(config).await?;
        slot.config = Some(config.clone());
        slot.handle = Some(handle.clone());
        Ok(handle)
    }

    /// The signer handle for `config`, or `None` when the configuration
    /// carries no signer. Same value-keyed rebuild rule as the public side.
    pub async fn signer_handle(&self, config: &SafeConfig) -> Result<Option<SignerHandle>> {
        let mut slot = self.signer.lock().await;
        if slot.config.as_ref() == Some(config) {
            return Ok(slot.handle.clone());
        }
        if config.signer.is_none() {
            slot.config = Some(config.clone());
            slot.handle = None;
            return Ok(None);
        }
        debug!(chain = %config.chain_id, "building signer handle");
        let handle = self.factory.build_signer(config).await?;
        slot.config = Some(config.clone());
        slot.handle = Some(handle.clone());
        Ok(Some(handle))
    }
}
