//! Error types for every layer of the compatibility stack.
//!
//! Each component gets its own error enum; nothing here wraps a raw native
//! return code without first decoding it (see [`crate::decode::NativeStatus`]).

use std::path::PathBuf;

use thiserror::Error;

use crate::shape::StructKind;
use crate::version::{ModuleKind, Version};

/// Errors from opening a shared library and resolving symbols.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No candidate filename for the module could be opened.
    #[error("{module} not found (tried {attempts} candidate paths)")]
    LibraryNotFound {
        /// Module that failed to load.
        module: ModuleKind,
        /// Number of candidate paths tried.
        attempts: usize,
    },

    /// The library opened but its version entry point is absent, which means
    /// it cannot be identified at all.
    #[error("{module} at {path}: version entry point `{symbol}` missing")]
    ProbeSymbolMissing {
        /// Module that was probed.
        module: ModuleKind,
        /// Path of the opened file.
        path: PathBuf,
        /// The `<module>_version` symbol name.
        symbol: &'static str,
    },
}

/// Errors from binding a module's mandatory function table.
#[derive(Debug, Error)]
pub enum BindError {
    /// One or more mandatory symbols did not resolve. The module is rejected
    /// wholesale; there is no partially bound table.
    #[error("{module} v{major}: missing mandatory symbols: {}", symbols.join(", "))]
    MissingSymbols {
        /// Module whose table failed to bind.
        module: ModuleKind,
        /// Major version whose symbol set was requested.
        major: u32,
        /// Every unresolved mandatory symbol name.
        symbols: Vec<&'static str>,
    },

    /// The module's self-reported version disagrees with the combination
    /// under test.
    #[error("{module}: expected major {expected}, library reports {found}")]
    VersionMismatch {
        /// Module that was probed.
        module: ModuleKind,
        /// Major version the combination expected.
        expected: u32,
        /// Version the library reported about itself.
        found: Version,
    },
}

/// Discovery failed as a whole: no search path yielded a loadable module
/// set, or no known version combination fully bound.
///
/// Carries the accumulated attempt log instead of any native code — the log
/// is the diagnostic, per the troubleshooting contract.
#[derive(Debug, Error)]
#[error("no usable library family install found after {} attempts\n{}", attempts.len(), attempts.join("\n"))]
pub struct DiscoveryError {
    /// Ordered textual load-attempt log.
    pub attempts: Vec<String>,
}

/// Errors from the versioned field accessor.
///
/// Always a coverage or usage error, never a runtime condition of the native
/// library; the accessor refuses to guess.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    /// No descriptor exists for this (kind, major) pair.
    #[error("no shape descriptor for {kind:?} at major {major}")]
    UnsupportedShape {
        /// Structure kind asked for.
        kind: StructKind,
        /// Major version in effect on the handle.
        major: u32,
    },

    /// The descriptor exists but does not describe the named field.
    #[error("{kind:?} v{major} has no field `{field}`")]
    UnknownField {
        /// Structure kind asked for.
        kind: StructKind,
        /// Major version in effect on the handle.
        major: u32,
        /// Field name requested.
        field: String,
    },

    /// The value handed to a write does not match the field's declared type.
    #[error("field `{field}` is {expected:?}, value has a different width")]
    TypeMismatch {
        /// Field name written to.
        field: String,
        /// Declared field type.
        expected: crate::shape::FieldType,
    },

    /// Index past the end of an inline fixed-size array field.
    #[error("field `{field}` has {count} elements, index {index} out of range")]
    IndexOutOfRange {
        /// Field name accessed.
        field: String,
        /// Declared element count.
        count: usize,
        /// Index requested.
        index: usize,
    },
}

/// Errors from the typed wrappers' native call surface.
#[derive(Debug, Error)]
pub enum NativeCallError {
    /// A native entry point returned a failure status.
    #[error("{op} failed with native status {status}")]
    Failed {
        /// Native entry point that failed.
        op: &'static str,
        /// Decoded status.
        status: crate::decode::NativeStatus,
    },

    /// No decoder implementation exists for the stream's codec.
    #[error("no decoder available for codec id {codec_id}")]
    DecoderUnavailable {
        /// The stream's codec id discriminant.
        codec_id: i32,
    },

    /// A caller-supplied value could not be passed to the native side.
    #[error("invalid {what}")]
    Invalid {
        /// What was rejected.
        what: &'static str,
    },

    /// A structure field needed by the wrapper could not be accessed.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Errors surfaced through the decode state machine's result type.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The operation is not legal in the session's current state.
    #[error("{op} not allowed in state {state:?}")]
    InvalidState {
        /// Operation attempted.
        op: &'static str,
        /// State the session was in.
        state: crate::decode::DecodeState,
    },

    /// Flushing was already requested; it is allowed once per session.
    #[error("flushing already started")]
    AlreadyFlushing,

    /// A packet with no payload was submitted outside of flushing.
    #[error("empty packet submitted")]
    EmptyPacket,

    /// A native call returned a failure status that is not one of the
    /// backpressure codes the machine interprets itself.
    #[error("{op} failed with native status {status}")]
    Native {
        /// Native entry point that failed.
        op: &'static str,
        /// Decoded status.
        status: crate::decode::NativeStatus,
    },

    /// A structure field needed by the pipeline could not be accessed.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// The bounded callback registry has no free trampoline slot.
///
/// The capacity limit is a documented contract of the native callback
/// signature (it carries no session identifier), not something to grow past.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("log callback registry full ({capacity} slots in use)")]
pub struct RegistryFull {
    /// Fixed number of trampoline identities.
    pub capacity: usize,
}
