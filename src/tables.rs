#![expect(
    unsafe_code,
    reason = "copying raw symbol addresses into typed function pointers"
)]

//! Per-module mandatory function tables.
//!
//! Each module binds a fixed baseline symbol set; the codec module
//! additionally binds exactly one of two mutually exclusive protocol
//! extension sets, selected by a major-version threshold. Binding never
//! partially commits: if any mandatory symbol is missing the whole module is
//! reported unbound, with every missing name listed. Symbols belonging to
//! the other historical protocol are allowed to be absent.
//!
//! All structure parameters are `*mut c_void` — this crate never declares
//! the native structures; field access goes through
//! [`crate::accessor`] and the shape tables.

use std::ffi::c_void;
use std::mem;
use std::os::raw::{c_char, c_int, c_uint};

use tracing::debug;

use crate::error::BindError;
use crate::loader::{RawSymbol, SymbolSource};
use crate::logsink::NativeLogCallback;
use crate::version::{ModuleKind, SPLIT_PROTOCOL_CODEC_MAJOR};

/// The `<module>_version()` entry point.
pub type VersionFn = unsafe extern "C" fn() -> c_uint;

// ----------------------------------------------------------------------------
// Mandatory symbol name sets
// ----------------------------------------------------------------------------

/// Baseline symbols of the container-format module.
pub const FORMAT_SYMBOLS: &[&str] = &[
    "avformat_alloc_context",
    "avformat_free_context",
    "avformat_open_input",
    "avformat_close_input",
    "avformat_find_stream_info",
    "av_read_frame",
];

/// Baseline symbols of the codec module, common to both protocols.
pub const CODEC_BASELINE_SYMBOLS: &[&str] = &[
    "avcodec_find_decoder",
    "avcodec_alloc_context3",
    "avcodec_free_context",
    "avcodec_open2",
];

/// Extension set for the submit/receive protocol (codec major >= 58).
pub const CODEC_SPLIT_SYMBOLS: &[&str] = &[
    "avcodec_send_packet",
    "avcodec_receive_frame",
    "avcodec_parameters_to_context",
    "av_packet_alloc",
    "av_packet_free",
];

/// Extension set for the combined-decode protocol (codec major < 58).
pub const CODEC_COMBINED_SYMBOLS: &[&str] = &[
    "avcodec_decode_video2",
    "av_init_packet",
    "av_free_packet",
    "av_copy_packet",
];

/// Baseline symbols of the shared-utility module.
pub const UTIL_SYMBOLS: &[&str] = &[
    "av_frame_alloc",
    "av_frame_free",
    "av_frame_unref",
    "av_log_set_callback",
    "av_strerror",
];

/// Baseline symbols of the resampler module.
pub const RESAMPLE_SYMBOLS: &[&str] =
    &["swr_alloc", "swr_free", "swr_init", "swr_convert"];

/// Mandatory symbol names for one module at one major version.
pub fn mandatory_symbols(kind: ModuleKind, major: u32) -> Vec<&'static str> {
    match kind {
        ModuleKind::Format => FORMAT_SYMBOLS.to_vec(),
        ModuleKind::Util => UTIL_SYMBOLS.to_vec(),
        ModuleKind::Resample => RESAMPLE_SYMBOLS.to_vec(),
        ModuleKind::Codec => {
            let mut v = CODEC_BASELINE_SYMBOLS.to_vec();
            if major >= SPLIT_PROTOCOL_CODEC_MAJOR {
                v.extend_from_slice(CODEC_SPLIT_SYMBOLS);
            } else {
                v.extend_from_slice(CODEC_COMBINED_SYMBOLS);
            }
            v
        }
    }
}

// ----------------------------------------------------------------------------
// Binder
// ----------------------------------------------------------------------------

/// Resolves symbols out of a [`SymbolSource`] after an up-front presence
/// check of the whole mandatory set, so the bind error names every missing
/// symbol at once instead of stopping at the first.
struct Binder<'a> {
    src: &'a dyn SymbolSource,
    module: ModuleKind,
    major: u32,
}

impl<'a> Binder<'a> {
    /// Check every mandatory symbol for (`module`, `major`); any miss
    /// rejects the module wholesale.
    fn verified(
        src: &'a dyn SymbolSource,
        module: ModuleKind,
        major: u32,
    ) -> Result<Self, BindError> {
        let missing: Vec<&'static str> = mandatory_symbols(module, major)
            .into_iter()
            .filter(|name| !matches!(src.symbol(name), Some(p) if !p.is_null()))
            .collect();
        if !missing.is_empty() {
            debug!(module = %module, major, missing = ?missing, "module unbound");
            return Err(BindError::MissingSymbols {
                module,
                major,
                symbols: missing,
            });
        }
        Ok(Self { src, module, major })
    }

    /// Resolve one symbol into a typed function pointer.
    fn sym<F: Copy>(&self, name: &'static str) -> Result<F, BindError> {
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<RawSymbol>());
        match self.src.symbol(name) {
            Some(raw) if !raw.is_null() => {
                // Safety: a resolved symbol address is copied bitwise into a
                // function-pointer type of the same size. The signature is
                // the caller's assertion about the native entry point, which
                // is the entire premise of name-resolved binding.
                Ok(unsafe { mem::transmute_copy::<RawSymbol, F>(&raw) })
            }
            _ => Err(BindError::MissingSymbols {
                module: self.module,
                major: self.major,
                symbols: vec![name],
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Container-format module
// ----------------------------------------------------------------------------

/// Bound entry points of the container-format module.
#[derive(Clone, Copy)]
pub struct FormatTable {
    /// Allocate an empty format context.
    pub alloc_context: unsafe extern "C" fn() -> *mut c_void,
    /// Free a format context that was never opened.
    pub free_context: unsafe extern "C" fn(*mut c_void),
    /// Open an input and allocate its context.
    pub open_input: unsafe extern "C" fn(
        *mut *mut c_void,
        *const c_char,
        *mut c_void,
        *mut *mut c_void,
    ) -> c_int,
    /// Close an opened input and release its context.
    pub close_input: unsafe extern "C" fn(*mut *mut c_void),
    /// Probe stream parameters.
    pub find_stream_info: unsafe extern "C" fn(*mut c_void, *mut *mut c_void) -> c_int,
    /// Read the next packet of the input.
    pub read_frame: unsafe extern "C" fn(*mut c_void, *mut c_void) -> c_int,
}

impl FormatTable {
    /// Bind the mandatory set, all or nothing.
    pub fn bind(src: &dyn SymbolSource, major: u32) -> Result<Self, BindError> {
        let b = Binder::verified(src, ModuleKind::Format, major)?;
        Ok(Self {
            alloc_context: b.sym("avformat_alloc_context")?,
            free_context: b.sym("avformat_free_context")?,
            open_input: b.sym("avformat_open_input")?,
            close_input: b.sym("avformat_close_input")?,
            find_stream_info: b.sym("avformat_find_stream_info")?,
            read_frame: b.sym("av_read_frame")?,
        })
    }
}

// ----------------------------------------------------------------------------
// Codec module
// ----------------------------------------------------------------------------

/// Submit/receive protocol entry points (codec major >= 58).
#[derive(Clone, Copy)]
pub struct SplitFns {
    /// Submit one compressed packet.
    pub send_packet: unsafe extern "C" fn(*mut c_void, *const c_void) -> c_int,
    /// Retrieve one decoded frame.
    pub receive_frame: unsafe extern "C" fn(*mut c_void, *mut c_void) -> c_int,
    /// Fill a codec context from stream parameters.
    pub parameters_to_context: unsafe extern "C" fn(*mut c_void, *const c_void) -> c_int,
    /// Allocate a packet shell.
    pub packet_alloc: unsafe extern "C" fn() -> *mut c_void,
    /// Free a packet shell and its payload.
    pub packet_free: unsafe extern "C" fn(*mut *mut c_void),
}

/// Combined-decode protocol entry points (codec major < 58).
#[derive(Clone, Copy)]
pub struct CombinedFns {
    /// Decode a packet, possibly producing a frame in the same call.
    pub decode_video:
        unsafe extern "C" fn(*mut c_void, *mut c_void, *mut c_int, *const c_void) -> c_int,
    /// Initialize a caller-allocated packet shell to defaults.
    pub init_packet: unsafe extern "C" fn(*mut c_void),
    /// Release a packet's payload (the shell stays caller-owned).
    pub free_packet: unsafe extern "C" fn(*mut c_void),
    /// Duplicate a packet's payload.
    pub copy_packet: unsafe extern "C" fn(*mut c_void, *const c_void) -> c_int,
}

/// Exactly one protocol extension set, selected at bind time.
#[derive(Clone, Copy)]
pub enum CodecApi {
    /// Old combined-decode protocol.
    Combined(CombinedFns),
    /// New submit/receive protocol.
    Split(SplitFns),
}

impl CodecApi {
    /// True when the split protocol is in effect.
    pub fn is_split(&self) -> bool {
        matches!(self, CodecApi::Split(_))
    }
}

/// Bound entry points of the codec module.
#[derive(Clone, Copy)]
pub struct CodecTable {
    /// Look up a decoder by codec id.
    pub find_decoder: unsafe extern "C" fn(c_int) -> *const c_void,
    /// Allocate a codec context for a decoder.
    pub alloc_context: unsafe extern "C" fn(*const c_void) -> *mut c_void,
    /// Free a codec context.
    pub free_context: unsafe extern "C" fn(*mut *mut c_void),
    /// Open a codec context.
    pub open2: unsafe extern "C" fn(*mut c_void, *const c_void, *mut *mut c_void) -> c_int,
    /// The protocol extension set in effect for this major.
    pub api: CodecApi,
}

impl CodecTable {
    /// Bind baseline plus the protocol set selected by `major`.
    pub fn bind(src: &dyn SymbolSource, major: u32) -> Result<Self, BindError> {
        let b = Binder::verified(src, ModuleKind::Codec, major)?;

        let api = if major >= SPLIT_PROTOCOL_CODEC_MAJOR {
            CodecApi::Split(SplitFns {
                send_packet: b.sym("avcodec_send_packet")?,
                receive_frame: b.sym("avcodec_receive_frame")?,
                parameters_to_context: b.sym("avcodec_parameters_to_context")?,
                packet_alloc: b.sym("av_packet_alloc")?,
                packet_free: b.sym("av_packet_free")?,
            })
        } else {
            CodecApi::Combined(CombinedFns {
                decode_video: b.sym("avcodec_decode_video2")?,
                init_packet: b.sym("av_init_packet")?,
                free_packet: b.sym("av_free_packet")?,
                copy_packet: b.sym("av_copy_packet")?,
            })
        };

        Ok(Self {
            find_decoder: b.sym("avcodec_find_decoder")?,
            alloc_context: b.sym("avcodec_alloc_context3")?,
            free_context: b.sym("avcodec_free_context")?,
            open2: b.sym("avcodec_open2")?,
            api,
        })
    }
}

// ----------------------------------------------------------------------------
// Shared-utility module
// ----------------------------------------------------------------------------

/// Bound entry points of the shared-utility module.
#[derive(Clone, Copy)]
pub struct UtilTable {
    /// Allocate a frame shell.
    pub frame_alloc: unsafe extern "C" fn() -> *mut c_void,
    /// Free a frame shell and its buffers.
    pub frame_free: unsafe extern "C" fn(*mut *mut c_void),
    /// Release a frame's buffers, keeping the shell.
    pub frame_unref: unsafe extern "C" fn(*mut c_void),
    /// Install the process-wide native log callback.
    pub log_set_callback: unsafe extern "C" fn(Option<NativeLogCallback>),
    /// Describe a native status code into a caller buffer.
    pub strerror: unsafe extern "C" fn(c_int, *mut c_char, usize) -> c_int,
}

impl UtilTable {
    /// Bind the mandatory set, all or nothing.
    pub fn bind(src: &dyn SymbolSource, major: u32) -> Result<Self, BindError> {
        let b = Binder::verified(src, ModuleKind::Util, major)?;
        Ok(Self {
            frame_alloc: b.sym("av_frame_alloc")?,
            frame_free: b.sym("av_frame_free")?,
            frame_unref: b.sym("av_frame_unref")?,
            log_set_callback: b.sym("av_log_set_callback")?,
            strerror: b.sym("av_strerror")?,
        })
    }

    /// Human-readable description of a native status code.
    pub fn describe_status(&self, status: c_int) -> String {
        let mut buf = [0u8; 128];
        // Safety: strerror writes a NUL-terminated string into the buffer.
        let rc = unsafe { (self.strerror)(status, buf.as_mut_ptr().cast(), buf.len()) };
        if rc < 0 {
            return format!("native status {status}");
        }
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        String::from_utf8_lossy(&buf[..end]).into_owned()
    }
}

// ----------------------------------------------------------------------------
// Resampler module
// ----------------------------------------------------------------------------

/// Bound entry points of the resampler module.
#[derive(Clone, Copy)]
pub struct ResampleTable {
    /// Allocate a resampler context.
    pub alloc: unsafe extern "C" fn() -> *mut c_void,
    /// Free a resampler context.
    pub free: unsafe extern "C" fn(*mut *mut c_void),
    /// Initialize a configured resampler context.
    pub init: unsafe extern "C" fn(*mut c_void) -> c_int,
    /// Convert sample buffers.
    pub convert: unsafe extern "C" fn(
        *mut c_void,
        *mut *mut u8,
        c_int,
        *const *const u8,
        c_int,
    ) -> c_int,
}

impl ResampleTable {
    /// Bind the mandatory set, all or nothing.
    pub fn bind(src: &dyn SymbolSource, major: u32) -> Result<Self, BindError> {
        let b = Binder::verified(src, ModuleKind::Resample, major)?;
        Ok(Self {
            alloc: b.sym("swr_alloc")?,
            free: b.sym("swr_free")?,
            init: b.sym("swr_init")?,
            convert: b.sym("swr_convert")?,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashSet;
    use std::ffi::c_void;

    use crate::loader::{RawSymbol, SymbolSource};

    unsafe extern "C" fn placeholder() {}

    /// A symbol source backed by a name set; every known name resolves to
    /// the same placeholder address (the tables are never called through).
    pub struct FakeSource {
        names: HashSet<String>,
    }

    impl FakeSource {
        pub fn with_symbols<I: IntoIterator<Item = &'static str>>(names: I) -> Self {
            Self {
                names: names.into_iter().map(String::from).collect(),
            }
        }

        pub fn remove(mut self, name: &str) -> Self {
            self.names.remove(name);
            self
        }
    }

    impl SymbolSource for FakeSource {
        fn symbol(&self, name: &str) -> Option<RawSymbol> {
            if self.names.contains(name) {
                Some(placeholder as *const c_void)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeSource;
    use super::*;

    fn codec_source(major: u32) -> FakeSource {
        FakeSource::with_symbols(
            mandatory_symbols(ModuleKind::Codec, major).into_iter(),
        )
    }

    #[test]
    fn test_codec_major_59_selects_split_protocol() {
        let table = CodecTable::bind(&codec_source(59), 59).unwrap();
        assert!(table.api.is_split());
    }

    #[test]
    fn test_codec_major_56_selects_combined_protocol() {
        let table = CodecTable::bind(&codec_source(56), 56).unwrap();
        assert!(!table.api.is_split());
    }

    #[test]
    fn test_other_protocol_symbols_may_be_absent() {
        // A major-59 library legitimately lacks the combined-protocol set.
        let src = codec_source(59);
        assert!(CodecTable::bind(&src, 59).is_ok());
    }

    #[test]
    fn test_removing_any_mandatory_symbol_fails_and_names_it() {
        for kind in ModuleKind::ALL {
            for major in [56u32, 59] {
                let all = mandatory_symbols(kind, major);
                for victim in &all {
                    let src = FakeSource::with_symbols(all.iter().copied()).remove(victim);
                    let err = match kind {
                        ModuleKind::Format => FormatTable::bind(&src, major).err(),
                        ModuleKind::Codec => CodecTable::bind(&src, major).err(),
                        ModuleKind::Util => UtilTable::bind(&src, major).err(),
                        ModuleKind::Resample => ResampleTable::bind(&src, major).err(),
                    };
                    match err {
                        Some(BindError::MissingSymbols { symbols, .. }) => {
                            assert_eq!(symbols, vec![*victim]);
                        }
                        other => panic!("{kind} without {victim}: {other:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn test_full_set_binds_for_every_combo() {
        for combo in crate::version::VERSION_COMBOS {
            for kind in ModuleKind::ALL {
                let major = combo.major_of(kind);
                let src =
                    FakeSource::with_symbols(mandatory_symbols(kind, major).into_iter());
                let ok = match kind {
                    ModuleKind::Format => FormatTable::bind(&src, major).is_ok(),
                    ModuleKind::Codec => CodecTable::bind(&src, major).is_ok(),
                    ModuleKind::Util => UtilTable::bind(&src, major).is_ok(),
                    ModuleKind::Resample => ResampleTable::bind(&src, major).is_ok(),
                };
                assert!(ok, "{combo} / {kind} failed to bind");
            }
        }
    }
}
