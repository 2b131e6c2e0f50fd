//! SMA bridge - pass a payload to a native signature module and get its
//! response back as an owned string.
//!
//! The native library allocates every response; the bridge copies it and hands
//! the allocation back to the library's own `Free` exactly once per call.

pub mod config;
pub mod errors;
pub mod interop;
pub mod loader;
pub mod logging;
pub mod sma;

// Re-export commonly used items
pub use config::{BridgeConfig, LibrarySettings, LoggingSettings};
pub use errors::{CallError, ConfigError, DecodeError, LoadError, Result, SmaError};
pub use interop::{DynamicLibrary, ForeignBuffer, ForeignInvoker, InteropStats, LibraryHandle, SymbolNames};
pub use loader::{Loader, Platform, SmaLoader};
pub use logging::{init_dev_logging, init_logging, init_prod_logging, LogConfig, LogFormat, LogOutput};
pub use sma::{GeneralSma, SmaInterface};
