//! Host-facing SMA interface

use std::path::Path;

use crate::config::BridgeConfig;
use crate::errors::Result;
use crate::interop::{DynamicLibrary, ForeignInvoker, InteropStats, LibraryHandle};
use crate::loader::SmaLoader;

/// Request/response channel to a signature module
pub trait SmaInterface {
    fn invoke(&self, payload: &str) -> Result<String>;
}

impl<L: LibraryHandle> SmaInterface for ForeignInvoker<L> {
    fn invoke(&self, payload: &str) -> Result<String> {
        ForeignInvoker::invoke(self, payload)
    }
}

/// SMA backed by the platform's dynamically loaded binary
#[derive(Debug)]
pub struct GeneralSma {
    invoker: ForeignInvoker<DynamicLibrary>,
}

impl GeneralSma {
    /// Load using the discovered configuration and environment overrides
    pub fn new() -> Result<Self> {
        Self::with_config(&BridgeConfig::discover()?.with_env_overrides())
    }

    pub fn with_config(config: &BridgeConfig) -> Result<Self> {
        Self::with_loader(&SmaLoader::new(config.library.clone()))
    }

    pub fn with_loader(loader: &SmaLoader) -> Result<Self> {
        Ok(Self {
            invoker: ForeignInvoker::from_loader(loader)?,
        })
    }

    /// Path of the loaded binary
    pub fn library_path(&self) -> &Path {
        self.invoker.library().path()
    }

    pub fn stats(&self) -> InteropStats {
        self.invoker.stats()
    }
}

impl SmaInterface for GeneralSma {
    fn invoke(&self, payload: &str) -> Result<String> {
        self.invoker.invoke(payload)
    }
}
