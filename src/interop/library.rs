//! Native library handle and symbol resolution
//!
//! `LibraryHandle` is the seam between the invoker and native code. The
//! dynamic implementation resolves both exports once at load time and keeps
//! the `libloading::Library` alive for as long as the function pointers are.

use std::ffi::c_char;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use tracing::debug;

use crate::errors::LoadError;

/// Default name of the native entry point
pub const DEFAULT_INVOKE_SYMBOL: &str = "Invoke";
/// Default name of the native release function
pub const DEFAULT_FREE_SYMBOL: &str = "Free";

type InvokeFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type FreeFn = unsafe extern "C" fn(*mut c_char);

/// The two foreign operations exposed by a loaded library
pub trait LibraryHandle: Send + Sync {
    /// Call the native entry point.
    ///
    /// # Safety
    /// `payload` must point to a NUL-terminated string that stays valid for the
    /// duration of the call. A non-null return value must point to a
    /// NUL-terminated buffer owned by the library until passed to `free`.
    unsafe fn invoke(&self, payload: *const c_char) -> *mut c_char;

    /// Release a buffer previously returned by `invoke`.
    ///
    /// # Safety
    /// `buffer` must come from `invoke` on this same handle and must not have
    /// been released already.
    unsafe fn free(&self, buffer: *mut c_char);
}

impl<L: LibraryHandle + ?Sized> LibraryHandle for Arc<L> {
    unsafe fn invoke(&self, payload: *const c_char) -> *mut c_char {
        (**self).invoke(payload)
    }

    unsafe fn free(&self, buffer: *mut c_char) {
        (**self).free(buffer)
    }
}

/// Export names to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolNames {
    pub invoke: String,
    pub free: String,
}

impl SymbolNames {
    pub fn new(invoke: impl Into<String>, free: impl Into<String>) -> Self {
        Self {
            invoke: invoke.into(),
            free: free.into(),
        }
    }
}

impl Default for SymbolNames {
    fn default() -> Self {
        Self::new(DEFAULT_INVOKE_SYMBOL, DEFAULT_FREE_SYMBOL)
    }
}

/// Dynamically loaded native library (dlopen/LoadLibrary via libloading)
pub struct DynamicLibrary {
    path: PathBuf,
    invoke_fn: InvokeFn,
    free_fn: FreeFn,
    // Must outlive the function pointers above
    _lib: Library,
}

impl DynamicLibrary {
    /// Load library and resolve both exports
    ///
    /// `path` may be a bare file name, in which case the platform loader
    /// searches its standard locations.
    pub fn open(path: impl AsRef<Path>, symbols: &SymbolNames) -> Result<Self, LoadError> {
        let path = path.as_ref();

        let lib = unsafe { Library::new(path) }.map_err(|e| LoadError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let invoke_fn = unsafe { Self::resolve::<InvokeFn>(&lib, &symbols.invoke)? };
        let free_fn = unsafe { Self::resolve::<FreeFn>(&lib, &symbols.free)? };

        debug!(
            path = %path.display(),
            invoke = %symbols.invoke,
            free = %symbols.free,
            "resolved native exports"
        );

        Ok(Self {
            path: path.to_path_buf(),
            invoke_fn,
            free_fn,
            _lib: lib,
        })
    }

    /// # Safety
    /// `T` must match the actual signature of the exported symbol.
    unsafe fn resolve<T: Copy>(lib: &Library, name: &str) -> Result<T, LoadError> {
        lib.get::<T>(name.as_bytes())
            .map(|symbol| *symbol)
            .map_err(|e| LoadError::MissingSymbol {
                symbol: name.to_string(),
                message: e.to_string(),
            })
    }

    /// Path the library was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LibraryHandle for DynamicLibrary {
    unsafe fn invoke(&self, payload: *const c_char) -> *mut c_char {
        (self.invoke_fn)(payload)
    }

    unsafe fn free(&self, buffer: *mut c_char) {
        (self.free_fn)(buffer)
    }
}

impl std::fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
