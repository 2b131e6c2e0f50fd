//! Interoperability - call into the native SMA library
//!
//! Architecture:
//! - `library.rs` - `LibraryHandle` seam and the libloading-backed `DynamicLibrary`
//! - `buffer.rs` - `ForeignBuffer`, released through the library's own `Free`
//! - `invoker.rs` - `ForeignInvoker`, the invoke/decode/release cycle

mod buffer;
mod invoker;
mod library;

pub use buffer::ForeignBuffer;
pub use invoker::ForeignInvoker;
pub use library::{
    DynamicLibrary, LibraryHandle, SymbolNames, DEFAULT_FREE_SYMBOL, DEFAULT_INVOKE_SYMBOL,
};

/// Per-invoker call statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteropStats {
    /// Native `Invoke` calls issued
    pub calls_made: u64,
    /// Buffers handed back to the native `Free`
    pub buffers_released: u64,
    /// Calls that produced no buffer (rejected payload or null return)
    pub call_failures: u64,
    pub decode_failures: u64,
}
