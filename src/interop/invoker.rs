//! Foreign invoker - one payload in, one owned response out

use std::ffi::CString;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use super::buffer::ForeignBuffer;
use super::library::LibraryHandle;
use super::InteropStats;
use crate::errors::{CallError, Result};
use crate::loader::Loader;

#[derive(Debug, Default)]
struct CallCounters {
    calls_made: AtomicU64,
    buffers_released: AtomicU64,
    call_failures: AtomicU64,
    decode_failures: AtomicU64,
}

impl CallCounters {
    #[inline]
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Calls a native entry point and hands back owned responses
///
/// Holds no per-call state: every buffer obtained from the library is local
/// to the `invoke` call that produced it.
pub struct ForeignInvoker<L: LibraryHandle> {
    library: L,
    counters: CallCounters,
}

impl<L: LibraryHandle> ForeignInvoker<L> {
    pub fn new(library: L) -> Self {
        Self {
            library,
            counters: CallCounters::default(),
        }
    }

    /// Load the library through `loader` and bind an invoker to it
    pub fn from_loader<T>(loader: &T) -> Result<Self>
    where
        T: Loader<Handle = L> + ?Sized,
    {
        let library = loader.load()?;
        Ok(Self::new(library))
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Send `payload` to the native library and return its decoded response
    ///
    /// The native buffer is released before this returns, whether or not it
    /// decoded as UTF-8. A null return from the library is reported as a
    /// foreign-call failure and nothing is released.
    #[tracing::instrument(level = "debug", skip_all, fields(payload_len = payload.len()))]
    pub fn invoke(&self, payload: &str) -> Result<String> {
        let payload = CString::new(payload).map_err(|e| {
            CallCounters::bump(&self.counters.call_failures);
            let err = CallError::InvalidPayload {
                position: e.nul_position(),
            };
            warn!(error = %err, "rejected payload");
            err
        })?;

        CallCounters::bump(&self.counters.calls_made);
        let raw = unsafe { self.library.invoke(payload.as_ptr()) };

        let Some(ptr) = NonNull::new(raw) else {
            CallCounters::bump(&self.counters.call_failures);
            warn!("native call returned a null buffer");
            return Err(CallError::NullBuffer.into());
        };

        trace!(target: "interop", ptr = ?ptr, "acquired foreign buffer");
        let buffer = unsafe { ForeignBuffer::from_raw(ptr, &self.library) };
        let decoded = buffer.into_string();
        CallCounters::bump(&self.counters.buffers_released);

        match decoded {
            Ok(response) => {
                debug!(response_len = response.len(), "native call complete");
                Ok(response)
            }
            Err(err) => {
                CallCounters::bump(&self.counters.decode_failures);
                warn!(error = %err, "native response could not be decoded");
                Err(err.into())
            }
        }
    }

    /// Snapshot of the call counters
    pub fn stats(&self) -> InteropStats {
        InteropStats {
            calls_made: self.counters.calls_made.load(Ordering::Relaxed),
            buffers_released: self.counters.buffers_released.load(Ordering::Relaxed),
            call_failures: self.counters.call_failures.load(Ordering::Relaxed),
            decode_failures: self.counters.decode_failures.load(Ordering::Relaxed),
        }
    }
}

impl<L: LibraryHandle + std::fmt::Debug> std::fmt::Debug for ForeignInvoker<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignInvoker")
            .field("library", &self.library)
            .field("stats", &self.stats())
            .finish()
    }
}
