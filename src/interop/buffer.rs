//! Foreign-owned response buffer
//!
//! Wraps the pointer returned by a native `Invoke` call. The buffer is
//! released through the owning library's `Free` when dropped, so every path
//! out of a call (including a failed decode) releases it exactly once.

use std::ffi::{c_char, CStr};
use std::ptr::NonNull;

use tracing::trace;

use super::library::LibraryHandle;
use crate::errors::DecodeError;

/// NUL-terminated string allocated by native code
pub struct ForeignBuffer<'lib, L: LibraryHandle + ?Sized> {
    ptr: NonNull<c_char>,
    lib: &'lib L,
}

impl<'lib, L: LibraryHandle + ?Sized> ForeignBuffer<'lib, L> {
    /// Take ownership of a buffer returned by `lib.invoke`
    ///
    /// # Safety
    /// `ptr` must have been returned by `lib.invoke`, point to a NUL-terminated
    /// byte string, and not be owned by any other `ForeignBuffer`.
    pub unsafe fn from_raw(ptr: NonNull<c_char>, lib: &'lib L) -> Self {
        Self { ptr, lib }
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.ptr.as_ptr()
    }

    /// Bytes up to (not including) the terminating NUL
    pub fn to_bytes(&self) -> &[u8] {
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }.to_bytes()
    }

    /// Copy the contents into an owned string and release the buffer
    pub fn into_string(self) -> Result<String, DecodeError> {
        let decoded = std::str::from_utf8(self.to_bytes())
            .map(str::to_owned)
            .map_err(|e| DecodeError::InvalidUtf8 {
                valid_up_to: e.valid_up_to(),
            });

        drop(self);
        decoded
    }
}

impl<L: LibraryHandle + ?Sized> Drop for ForeignBuffer<'_, L> {
    fn drop(&mut self) {
        trace!(target: "interop", ptr = ?self.ptr, "releasing foreign buffer");
        unsafe { self.lib.free(self.ptr.as_ptr()) }
    }
}
