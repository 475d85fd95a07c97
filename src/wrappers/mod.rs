//! Typed wrappers over tagged handles.
//!
//! Each wrapper pairs a handle with the bound tables it needs and exposes
//! the fields the pipeline reads, going through the versioned accessor for
//! every touch of native memory. Owning wrappers release their allocation
//! on drop through the handle's release strategy; borrowing views are plain
//! `Copy` handles that never free.

mod codec_context;
mod format_context;
mod frame;
mod packet;
mod resample;

pub use codec_context::DecoderContext;
pub use format_context::{InputContext, StreamView};
pub use frame::Frame;
pub use packet::Packet;
pub use resample::Resampler;
