//! # avcompat
//!
//! Runtime ABI mediation for the FFmpeg library family.
//!
//! The four cooperating modules (avformat, avcodec, avutil, swresample) are
//! never linked at build time. They are located and `dlopen`ed at run time,
//! version-probed, and bound against hand-reconstructed per-generation
//! struct layouts, so one build of this crate works against every supported
//! install from the 2.x series through 7.x.
//!
//! # Architecture
//!
//! ```text
//! session (discovery: newest-first version combinations)
//!   ├─> loader  (candidate filenames, dlopen, attempt log)
//!   ├─> version (packed-integer probe, known-good combos)
//!   └─> tables  (all-or-nothing symbol binding per module)
//!         └─> wrappers (typed surface over tagged handles)
//!               ├─> accessor + shape (versioned field access)
//!               ├─> handle  (owning / borrowing split)
//!               └─> decode  (one push/pull contract over two protocols)
//! ```
//!
//! # Decode Flow
//!
//! **Setup:** [`session::obtain`] → [`wrappers::InputContext::open`] →
//! [`wrappers::DecoderContext::for_stream`] → [`decode::DecoderSession`]
//!
//! **Steady state:** read packet → `send_packet` → `decode_next_frame`
//! until empty → repeat; `set_flushing` once at end of input, then drain to
//! `EndOfBitstream`.
//!
//! Native log traffic is routed through the bounded [`logsink`] registry
//! into `tracing`.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Versioned field access over tagged handles.
pub mod accessor;
/// Discovery configuration.
pub mod config;
/// Decode pipeline state machine and protocol adapters.
pub mod decode;
/// Error types for every layer.
pub mod error;
/// Owning and borrowing handles to native structures.
pub mod handle;
/// Shared-library loading and symbol resolution.
pub mod loader;
/// Native log callback routing.
pub mod logsink;
/// Library family discovery, probing, binding, and caching.
pub mod session;
/// Per-generation structure layouts.
pub mod shape;
/// Per-module mandatory function tables.
pub mod tables;
/// Version decoding and known-good combinations.
pub mod version;
/// Typed wrappers over bound modules.
pub mod wrappers;

pub use config::DiscoveryConfig;
pub use decode::{DecodeState, DecoderSession, SendOutcome};
pub use error::{DecodeError, DiscoveryError, NativeCallError, ShapeError};
pub use session::{LibraryFamily, ModuleInfo};
pub use version::{ModuleKind, Version, VersionCombo};
pub use wrappers::{DecoderContext, Frame, InputContext, Packet, Resampler, StreamView};
