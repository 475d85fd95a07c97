//! Tagged handles to native structures.
//!
//! Every pointer that crosses the dynamic-library boundary is wrapped in a
//! handle carrying the structure kind and the major generation it was
//! created under, so field access can always pick the matching layout.
//! Ownership is expressed in the type: an [`OwnedHandle`] knows how to
//! release its allocation on drop, a [`BorrowedHandle`] never frees anything
//! and is `Copy`.

#![expect(
    unsafe_code,
    reason = "handles own raw native allocations and release them on drop"
)]

use std::alloc::{self, Layout};
use std::ffi::c_void;

use crate::shape::StructKind;

/// Common view of a handle: base address plus the layout key.
pub trait StructHandle {
    /// Base address of the native structure.
    fn addr(&self) -> *mut u8;
    /// Structure kind.
    fn kind(&self) -> StructKind;
    /// Major generation of the module that produced the structure.
    fn major(&self) -> u32;
}

/// How an [`OwnedHandle`] releases its allocation.
pub enum Release {
    /// Native free taking a pointer to the pointer and nulling it
    /// (the `*_free` family).
    NativeIndirect(unsafe extern "C" fn(*mut *mut c_void)),
    /// Native free taking the pointer directly
    /// (`avformat_free_context`, `swr_free` absent).
    NativeDirect(unsafe extern "C" fn(*mut c_void)),
    /// Allocation made by this crate with [`std::alloc`]; freed the same way.
    Heap {
        /// Allocation size in bytes, 8-aligned.
        size: usize,
    },
    /// Crate-side allocation that needs a native cleanup call before the
    /// memory itself is returned (old-generation packet shells whose data
    /// buffer belongs to the native side).
    HeapWithCleanup {
        /// Allocation size in bytes, 8-aligned.
        size: usize,
        /// Native cleanup to run before deallocating.
        cleanup: unsafe extern "C" fn(*mut c_void),
    },
}

/// A native structure this crate is responsible for releasing.
pub struct OwnedHandle {
    addr: *mut u8,
    kind: StructKind,
    major: u32,
    release: Release,
}

// The handle is just an address plus a release recipe; nothing in it is
// tied to the creating thread.
unsafe impl Send for OwnedHandle {}

impl OwnedHandle {
    /// Wrap a native allocation whose release strategy is `release`.
    ///
    /// # Safety
    ///
    /// `addr` must point to a live structure of `kind` laid out per `major`,
    /// and `release` must be the correct way to free it exactly once.
    pub unsafe fn from_native(
        addr: *mut u8,
        kind: StructKind,
        major: u32,
        release: Release,
    ) -> Self {
        debug_assert!(!addr.is_null());
        Self {
            addr,
            kind,
            major,
            release,
        }
    }

    /// Allocate a zeroed structure of `size` bytes on this crate's heap.
    ///
    /// Used for generations whose packet shells are caller-allocated.
    pub fn alloc_zeroed(kind: StructKind, major: u32, size: usize) -> Self {
        let layout = heap_layout(size);
        // A zero-size shape never reaches here; the descriptors all carry
        // nonzero sizes.
        let addr = unsafe { alloc::alloc_zeroed(layout) };
        if addr.is_null() {
            alloc::handle_alloc_error(layout);
        }
        Self {
            addr,
            kind,
            major,
            release: Release::Heap { size },
        }
    }

    /// Attach a native cleanup to run before a heap shell is deallocated.
    pub fn with_cleanup(mut self, cleanup: unsafe extern "C" fn(*mut c_void)) -> Self {
        if let Release::Heap { size } = self.release {
            self.release = Release::HeapWithCleanup { size, cleanup };
        }
        self
    }

    /// A non-owning view of the same structure.
    pub fn borrow(&self) -> BorrowedHandle {
        BorrowedHandle {
            addr: self.addr,
            kind: self.kind,
            major: self.major,
        }
    }

    /// Give up ownership without releasing; returns the raw address.
    ///
    /// Used when a native call takes over the allocation (close functions
    /// that free their argument).
    pub fn into_raw(self) -> *mut u8 {
        let addr = self.addr;
        std::mem::forget(self);
        addr
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            match self.release {
                Release::NativeIndirect(free) => {
                    let mut p = self.addr.cast::<c_void>();
                    free(&mut p);
                }
                Release::NativeDirect(free) => free(self.addr.cast()),
                Release::Heap { size } => alloc::dealloc(self.addr, heap_layout(size)),
                Release::HeapWithCleanup { size, cleanup } => {
                    cleanup(self.addr.cast());
                    alloc::dealloc(self.addr, heap_layout(size));
                }
            }
        }
    }
}

impl StructHandle for OwnedHandle {
    fn addr(&self) -> *mut u8 {
        self.addr
    }

    fn kind(&self) -> StructKind {
        self.kind
    }

    fn major(&self) -> u32 {
        self.major
    }
}

/// A view of a structure owned elsewhere (a stream inside a format context,
/// parameters inside a stream). Never freed.
#[derive(Debug, Clone, Copy)]
pub struct BorrowedHandle {
    addr: *mut u8,
    kind: StructKind,
    major: u32,
}

impl BorrowedHandle {
    /// Wrap a pointer owned by the native side.
    ///
    /// # Safety
    ///
    /// `addr` must point to a live structure of `kind` laid out per `major`
    /// for as long as the handle is used.
    pub unsafe fn new(addr: *mut u8, kind: StructKind, major: u32) -> Self {
        debug_assert!(!addr.is_null());
        Self { addr, kind, major }
    }
}

impl StructHandle for BorrowedHandle {
    fn addr(&self) -> *mut u8 {
        self.addr
    }

    fn kind(&self) -> StructKind {
        self.kind
    }

    fn major(&self) -> u32 {
        self.major
    }
}

fn heap_layout(size: usize) -> Layout {
    // All shape sizes are 8-aligned; Layout construction cannot fail for
    // them, but avoid unwinding through Drop regardless.
    Layout::from_size_align(size.max(8), 8).unwrap_or(Layout::new::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_shell_is_zeroed_and_tagged() {
        let h = OwnedHandle::alloc_zeroed(StructKind::Packet, 56, 96);
        assert_eq!(h.kind(), StructKind::Packet);
        assert_eq!(h.major(), 56);
        let bytes = unsafe { std::slice::from_raw_parts(h.addr(), 96) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_borrow_shares_address_and_tags() {
        let h = OwnedHandle::alloc_zeroed(StructKind::Frame, 59, 272);
        let b = h.borrow();
        assert_eq!(b.addr(), h.addr());
        assert_eq!(b.kind(), StructKind::Frame);
        assert_eq!(b.major(), 59);
    }

    #[test]
    fn test_cleanup_runs_before_dealloc() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CLEANED: AtomicUsize = AtomicUsize::new(0);
        unsafe extern "C" fn cleanup(_p: *mut c_void) {
            CLEANED.fetch_add(1, Ordering::SeqCst);
        }
        let h = OwnedHandle::alloc_zeroed(StructKind::Packet, 55, 96).with_cleanup(cleanup);
        drop(h);
        assert_eq!(CLEANED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_raw_skips_release() {
        let h = OwnedHandle::alloc_zeroed(StructKind::Packet, 57, 88);
        let raw = h.into_raw();
        // Reclaim manually so the test does not leak.
        unsafe { alloc::dealloc(raw, heap_layout(88)) };
    }
}
