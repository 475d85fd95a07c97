#![expect(
    unsafe_code,
    reason = "extern \"C\" trampolines invoked by native library code"
)]

//! Bounded registry for native log callbacks.
//!
//! Every loaded module routes its diagnostics through one process-wide
//! callback whose signature carries no session identifier, so distinct
//! callback identities can only come from distinct trampoline functions.
//! The trampoline count is fixed; the registry hands out slots and returns
//! [`RegistryFull`] when none is free. The capacity limit is a documented
//! contract of the native signature, not an accident to work around.

use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::RegistryFull;

/// Severity of one native log line after mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal progress.
    Info,
    /// Recoverable anomaly.
    Warning,
    /// Failure.
    Error,
}

// Native numeric levels: panic 0, fatal 8, error 16, warning 24, info 32,
// verbose 40, debug 48, trace 56.
const NATIVE_ERROR: c_int = 16;
const NATIVE_WARNING: c_int = 24;
const NATIVE_INFO: c_int = 32;

/// Map a native numeric level into the fixed four-level enumeration.
pub fn level_from_native(level: c_int) -> LogLevel {
    if level <= NATIVE_ERROR {
        LogLevel::Error
    } else if level <= NATIVE_WARNING {
        LogLevel::Warning
    } else if level <= NATIVE_INFO {
        LogLevel::Info
    } else {
        LogLevel::Debug
    }
}

/// Signature the native `log_set_callback` entry point accepts.
///
/// The final parameter is the native varargs cursor; it is opaque here and
/// the unformatted message text is forwarded as-is.
pub type NativeLogCallback =
    unsafe extern "C" fn(*mut c_void, c_int, *const c_char, *mut c_void);

/// A registered sink: receives `(severity, message)` from native code.
pub type LogSink = Box<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Number of distinct trampoline identities available process-wide.
pub const SLOT_COUNT: usize = 4;

static SLOTS: [RwLock<Option<LogSink>>; SLOT_COUNT] = [
    RwLock::new(None),
    RwLock::new(None),
    RwLock::new(None),
    RwLock::new(None),
];

unsafe extern "C" fn trampoline_0(_: *mut c_void, level: c_int, msg: *const c_char, _: *mut c_void) {
    dispatch(0, level, msg);
}
unsafe extern "C" fn trampoline_1(_: *mut c_void, level: c_int, msg: *const c_char, _: *mut c_void) {
    dispatch(1, level, msg);
}
unsafe extern "C" fn trampoline_2(_: *mut c_void, level: c_int, msg: *const c_char, _: *mut c_void) {
    dispatch(2, level, msg);
}
unsafe extern "C" fn trampoline_3(_: *mut c_void, level: c_int, msg: *const c_char, _: *mut c_void) {
    dispatch(3, level, msg);
}

const TRAMPOLINES: [NativeLogCallback; SLOT_COUNT] =
    [trampoline_0, trampoline_1, trampoline_2, trampoline_3];

fn dispatch(slot: usize, level: c_int, msg: *const c_char) {
    if msg.is_null() {
        return;
    }
    // Safety: native code hands a NUL-terminated message string.
    let text = unsafe { CStr::from_ptr(msg) }.to_string_lossy();
    let text = text.trim_end_matches('\n');
    if let Some(sink) = SLOTS[slot].read().as_ref() {
        sink(level_from_native(level), text);
    }
}

/// Exclusive lease on one trampoline slot. Releasing is dropping.
pub struct SinkSlot {
    index: usize,
}

impl SinkSlot {
    /// The trampoline to hand to the module's `log_set_callback`.
    pub fn native_callback(&self) -> NativeLogCallback {
        TRAMPOLINES[self.index]
    }
}

impl Drop for SinkSlot {
    fn drop(&mut self) {
        *SLOTS[self.index].write() = None;
        debug!(slot = self.index, "log sink released");
    }
}

/// The bounded callback registry, injected into a session rather than used
/// as ambient global state.
///
/// The trampoline identities are necessarily `static`, so every
/// `SinkRegistry` value is a handle onto the same process-wide slot table;
/// constructing a second registry does not add capacity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SinkRegistry;

impl SinkRegistry {
    /// Claim a free trampoline slot for `sink`.
    pub fn register(&self, sink: LogSink) -> Result<SinkSlot, RegistryFull> {
        for (index, slot) in SLOTS.iter().enumerate() {
            let mut guard = slot.write();
            if guard.is_none() {
                *guard = Some(sink);
                debug!(slot = index, "log sink registered");
                return Ok(SinkSlot { index });
            }
        }
        Err(RegistryFull {
            capacity: SLOT_COUNT,
        })
    }

    /// A sink that forwards native lines into this crate's own tracing.
    pub fn tracing_sink() -> LogSink {
        Box::new(|level, msg| match level {
            LogLevel::Debug => debug!(target: "avcompat::native", "{msg}"),
            LogLevel::Info => info!(target: "avcompat::native", "{msg}"),
            LogLevel::Warning => warn!(target: "avcompat::native", "{msg}"),
            LogLevel::Error => error!(target: "avcompat::native", "{msg}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_from_native(0), LogLevel::Error); // panic
        assert_eq!(level_from_native(16), LogLevel::Error);
        assert_eq!(level_from_native(24), LogLevel::Warning);
        assert_eq!(level_from_native(32), LogLevel::Info);
        assert_eq!(level_from_native(40), LogLevel::Debug);
        assert_eq!(level_from_native(48), LogLevel::Debug);
    }

    #[test]
    fn test_registry_is_bounded_and_slots_release_on_drop() {
        let registry = SinkRegistry;
        let mut held = Vec::new();
        // The suite shares the process-wide table; claim whatever is free.
        loop {
            match registry.register(Box::new(|_, _| {})) {
                Ok(slot) => held.push(slot),
                Err(err) => {
                    assert_eq!(err.capacity, SLOT_COUNT);
                    break;
                }
            }
        }
        assert!(!held.is_empty());
        let n = held.len();
        drop(held);
        // Every released slot is claimable again.
        let mut reclaimed = Vec::new();
        for _ in 0..n {
            reclaimed.push(registry.register(Box::new(|_, _| {})).unwrap());
        }
    }

    #[test]
    fn test_trampoline_routes_to_registered_sink() {
        let registry = SinkRegistry;
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let slot = registry
            .register(Box::new(move |level, msg| {
                assert_eq!(level, LogLevel::Warning);
                assert_eq!(msg, "deprecated pixel format");
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        let msg = std::ffi::CString::new("deprecated pixel format\n").unwrap();
        let cb = slot.native_callback();
        // Safety: calling our own trampoline the way native code would.
        unsafe {
            cb(
                std::ptr::null_mut(),
                NATIVE_WARNING,
                msg.as_ptr(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
