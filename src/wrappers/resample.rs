//! Audio resampler wrapper.
//!
//! The resampler context is fully opaque across every supported generation;
//! no shape descriptor exists or is needed, so the wrapper holds the raw
//! pointer and its release entry point directly.

#![expect(
    unsafe_code,
    reason = "resampler allocation, init, and conversion are native calls"
)]

use std::ffi::{c_int, c_void};

use crate::decode::NativeStatus;
use crate::error::NativeCallError;
use crate::session::LibraryFamily;
use crate::tables::ResampleTable;

/// An owned resampler context.
pub struct Resampler {
    ctx: *mut c_void,
    table: ResampleTable,
    initialized: bool,
}

impl Resampler {
    /// Allocate an unconfigured resampler context.
    pub fn new(family: &LibraryFamily) -> Result<Self, NativeCallError> {
        Self::from_table(*family.resample_table())
    }

    /// Allocate from an explicit bound table.
    pub fn from_table(table: ResampleTable) -> Result<Self, NativeCallError> {
        let ctx = unsafe { (table.alloc)() };
        if ctx.is_null() {
            return Err(NativeCallError::Failed {
                op: "swr_alloc",
                status: NativeStatus::OUT_OF_MEMORY,
            });
        }
        Ok(Self {
            ctx,
            table,
            initialized: false,
        })
    }

    /// Initialize the configured context. Must be called before conversion.
    pub fn init(&mut self) -> Result<(), NativeCallError> {
        let status = NativeStatus(unsafe { (self.table.init)(self.ctx) });
        if !status.is_ok() {
            return Err(NativeCallError::Failed {
                op: "swr_init",
                status,
            });
        }
        self.initialized = true;
        Ok(())
    }

    /// Whether `init` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Convert sample buffers; returns the number of output samples.
    ///
    /// # Safety
    ///
    /// `out` and `input` must be valid plane-pointer arrays for the
    /// configured layouts, with at least `out_count` and `in_count` samples
    /// of capacity respectively.
    pub unsafe fn convert(
        &self,
        out: *mut *mut u8,
        out_count: i32,
        input: *const *const u8,
        in_count: i32,
    ) -> Result<i32, NativeCallError> {
        if !self.initialized {
            return Err(NativeCallError::Invalid {
                what: "uninitialized resampler",
            });
        }
        let produced: c_int = (self.table.convert)(self.ctx, out, out_count, input, in_count);
        let status = NativeStatus(produced);
        if status.is_ok() {
            Ok(produced)
        } else {
            Err(NativeCallError::Failed {
                op: "swr_convert",
                status,
            })
        }
    }
}

impl Drop for Resampler {
    fn drop(&mut self) {
        let mut p = self.ctx;
        unsafe { (self.table.free)(&mut p) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "C" fn alloc() -> *mut c_void {
        Box::into_raw(Box::new(0u64)).cast()
    }

    unsafe extern "C" fn free(p: *mut *mut c_void) {
        if !(*p).is_null() {
            drop(Box::from_raw((*p).cast::<u64>()));
            *p = std::ptr::null_mut();
        }
    }

    unsafe extern "C" fn init_ok(_ctx: *mut c_void) -> c_int {
        0
    }

    unsafe extern "C" fn convert_identity(
        _ctx: *mut c_void,
        _out: *mut *mut u8,
        _out_count: c_int,
        _input: *const *const u8,
        in_count: c_int,
    ) -> c_int {
        in_count
    }

    fn table() -> ResampleTable {
        ResampleTable {
            alloc,
            free,
            init: init_ok,
            convert: convert_identity,
        }
    }

    #[test]
    fn test_convert_requires_init() {
        let mut r = Resampler::from_table(table()).unwrap();
        let err = unsafe { r.convert(std::ptr::null_mut(), 0, std::ptr::null(), 0) };
        assert!(matches!(err, Err(NativeCallError::Invalid { .. })));

        r.init().unwrap();
        let n = unsafe { r.convert(std::ptr::null_mut(), 1024, std::ptr::null(), 512) };
        assert_eq!(n.unwrap(), 512);
    }
}
