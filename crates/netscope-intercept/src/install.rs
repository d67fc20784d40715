//! Installation of the interceptors.
//!
//! [`Interceptors`] is the explicit installation step: it owns the log store
//! and the real transports, and hands out intercepted handles that callers
//! use in place of the raw primitives. Each instance is independent, which
//! keeps tests isolated.
//!
//! Applications that want one process-wide console call [`install`] once at
//! startup and reach it later through [`installed`].

use std::sync::OnceLock;

use reqwest::Client;
use tracing::info;

use netscope_core::{Error, LogStore, Result};

use crate::config::InterceptConfig;
use crate::fetch::InterceptedFetch;
use crate::transport::ReqwestTransport;
use crate::xhr::{InterceptedXhr, ReqwestXhr};

static GLOBAL: OnceLock<Interceptors> = OnceLock::new();

/// A log store together with the transports it observes.
#[derive(Debug, Clone)]
pub struct Interceptors {
    store: LogStore,
    client: Client,
    config: InterceptConfig,
}

impl Interceptors {
    /// Build a store and a reqwest client from `config`.
    pub fn new(config: InterceptConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;
        let store = LogStore::new(config.capacity);
        store.set_paused(config.start_paused);
        Ok(Self::with_store(store, client, config))
    }

    /// Wire an existing store and client together.
    pub fn with_store(store: LogStore, client: Client, config: InterceptConfig) -> Self {
        info!(
            subsystem = "intercept",
            component = "install",
            capacity = store.capacity(),
            paused = store.is_paused(),
            "Interceptors installed"
        );
        Self {
            store,
            client,
            config,
        }
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn config(&self) -> &InterceptConfig {
        &self.config
    }

    /// A fetch-style handle recording into this store.
    pub fn fetch(&self) -> InterceptedFetch<ReqwestTransport> {
        InterceptedFetch::new(ReqwestTransport::new(self.client.clone()), self.store.clone())
    }

    /// A fresh XHR-style request object recording into this store.
    pub fn xhr(&self) -> InterceptedXhr<ReqwestXhr> {
        InterceptedXhr::new(
            ReqwestXhr::new(self.client.clone()).with_timeout(self.config.timeout()),
            self.store.clone(),
        )
    }
}

/// Install the process-wide interceptors. Succeeds exactly once.
pub fn install(config: InterceptConfig) -> Result<&'static Interceptors> {
    if GLOBAL.get().is_some() {
        return Err(Error::AlreadyInstalled);
    }
    let interceptors = Interceptors::new(config)?;
    GLOBAL
        .set(interceptors)
        .map_err(|_| Error::AlreadyInstalled)?;
    GLOBAL.get().ok_or(Error::AlreadyInstalled)
}

/// The process-wide interceptors, if [`install`] has run.
pub fn installed() -> Option<&'static Interceptors> {
    GLOBAL.get()
}
