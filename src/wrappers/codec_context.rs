//! Decoder context wrapper and session construction.
//!
//! The protocol split is decided here, once: the bound codec table already
//! carries exactly one extension set, and the matching adapter variant is
//! chosen when the context is turned into a decoder session. Everything
//! downstream is version-blind.

#![expect(
    unsafe_code,
    reason = "decoder lookup and context allocation are native calls"
)]

use std::ffi::c_void;

use tracing::debug;

use crate::accessor;
use crate::decode::{
    CodecHandles, CombinedDecode, DecoderSession, NativeStatus, SplitDecode,
};
use crate::error::{NativeCallError, ShapeError};
use crate::handle::{OwnedHandle, Release, StructHandle};
use crate::session::LibraryFamily;
use crate::shape::StructKind;
use crate::tables::CodecApi;
use crate::wrappers::format_context::StreamView;

/// Fields the demuxer fills into a stream's embedded context that a
/// decoder needs in place before open.
const STREAM_CARRYOVER_FIELDS: &[&str] = &[
    "codec_type",
    "codec_id",
    "codec_tag",
    "extradata",
    "extradata_size",
    "width",
    "height",
    "coded_width",
    "coded_height",
    "pix_fmt",
    "time_base_num",
    "time_base_den",
    "ticks_per_frame",
    "bit_rate",
    "sample_rate",
    "channels",
    "sample_fmt",
];

/// Copy the demuxer-probed fields from a stream's embedded context into a
/// freshly allocated one. Both handles carry the same major, so the field
/// set and widths line up exactly.
fn carry_stream_parameters(
    src: &crate::handle::BorrowedHandle,
    dst: &OwnedHandle,
) -> Result<(), ShapeError> {
    for field in STREAM_CARRYOVER_FIELDS {
        let value = accessor::read(src, field)?;
        accessor::write(dst, field, value)?;
    }
    Ok(())
}

/// An allocated, not-yet-opened decoder context for one stream.
pub struct DecoderContext {
    ctx: OwnedHandle,
    codec: *const c_void,
    codec_id: i32,
}

impl DecoderContext {
    /// Look up the stream's decoder and allocate a context for it.
    ///
    /// On split-protocol generations the stream's codec parameters are
    /// copied into the context; older generations carry the parameters in
    /// the stream's embedded context and need no copy step.
    pub fn for_stream(
        family: &LibraryFamily,
        stream: &StreamView,
    ) -> Result<Self, NativeCallError> {
        let tables = family.codec_table();
        let codec_major = family.combo().codec;

        let codec_id = stream.codec_id()?;
        let codec = unsafe { (tables.find_decoder)(codec_id) };
        if codec.is_null() {
            return Err(NativeCallError::DecoderUnavailable { codec_id });
        }

        let raw = unsafe { (tables.alloc_context)(codec) };
        if raw.is_null() {
            return Err(NativeCallError::Failed {
                op: "alloc_context",
                status: NativeStatus::OUT_OF_MEMORY,
            });
        }
        let ctx = unsafe {
            OwnedHandle::from_native(
                raw.cast(),
                StructKind::CodecContext,
                codec_major,
                Release::NativeIndirect(tables.free_context),
            )
        };

        match tables.api {
            CodecApi::Split(fns) => {
                if let Some(par) = stream.parameters()? {
                    let status = NativeStatus(unsafe {
                        (fns.parameters_to_context)(raw, par.addr().cast())
                    });
                    if !status.is_ok() {
                        return Err(NativeCallError::Failed {
                            op: "parameters_to_context",
                            status,
                        });
                    }
                }
            }
            CodecApi::Combined(_) => {
                // No parameters struct on these generations; the stream's
                // embedded context holds what the demuxer probed. It must
                // reach the fresh context before open, or the decoder sees
                // zero dimensions and no extradata.
                if let Some(embedded) = stream.embedded_context()? {
                    carry_stream_parameters(&embedded, &ctx)?;
                }
            }
        }

        debug!(codec_id, major = codec_major, "decoder context allocated");
        Ok(Self {
            ctx,
            codec,
            codec_id,
        })
    }

    /// The codec id the context was allocated for.
    pub fn codec_id(&self) -> i32 {
        self.codec_id
    }

    /// Coded picture width, once parameters are in place.
    pub fn width(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.ctx, "width")
    }

    /// Coded picture height, once parameters are in place.
    pub fn height(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.ctx, "height")
    }

    /// Turn the context into a decoder session with the adapter variant
    /// matching the bound protocol. The session still has to be opened.
    pub fn into_session(self, family: &LibraryFamily) -> Result<DecoderSession, ShapeError> {
        let tables = family.codec_table();
        let codec_major = family.combo().codec;
        let util = family.util_table();
        let handles = CodecHandles {
            ctx: self.ctx,
            codec: self.codec,
            open: tables.open2,
            frame_alloc: util.frame_alloc,
            frame_free: util.frame_free,
            util_major: family.combo().util,
        };
        let adapter: Box<dyn crate::decode::DecodeAdapter> = match tables.api {
            CodecApi::Split(fns) => Box::new(SplitDecode::new(handles, fns)),
            CodecApi::Combined(fns) => {
                Box::new(CombinedDecode::new(handles, fns, codec_major)?)
            }
        };
        Ok(DecoderSession::new(adapter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::FieldValue;
    use crate::shape::descriptor_for;

    #[test]
    fn test_stream_context_fields_reach_a_fresh_context_before_open() {
        // Pre-parameters generations: everything the demuxer probed lives
        // in the stream's embedded context and must be carried over.
        for major in [55u32, 56, 57] {
            let size = descriptor_for(StructKind::CodecContext, major).unwrap().size;
            let embedded = OwnedHandle::alloc_zeroed(StructKind::CodecContext, major, size);
            accessor::write(&embedded, "codec_id", FieldValue::I32(28)).unwrap();
            accessor::write(&embedded, "width", FieldValue::I32(1280)).unwrap();
            accessor::write(&embedded, "height", FieldValue::I32(720)).unwrap();
            accessor::write(&embedded, "extradata_size", FieldValue::I32(41)).unwrap();
            let extradata = [0u8; 41];
            accessor::write(
                &embedded,
                "extradata",
                FieldValue::Ptr(extradata.as_ptr() as *mut u8),
            )
            .unwrap();

            let fresh = OwnedHandle::alloc_zeroed(StructKind::CodecContext, major, size);
            carry_stream_parameters(&embedded.borrow(), &fresh).unwrap();

            assert_eq!(accessor::read_i32(&fresh, "codec_id").unwrap(), 28);
            assert_eq!(accessor::read_i32(&fresh, "width").unwrap(), 1280);
            assert_eq!(accessor::read_i32(&fresh, "height").unwrap(), 720);
            assert_eq!(accessor::read_i32(&fresh, "extradata_size").unwrap(), 41);
            assert_eq!(
                accessor::read_ptr(&fresh, "extradata").unwrap(),
                extradata.as_ptr() as *mut u8
            );
        }
    }

    #[test]
    fn test_dimension_getters_follow_the_context_layout() {
        for major in [56u32, 58, 61] {
            let size = descriptor_for(StructKind::CodecContext, major).unwrap().size;
            let ctx = OwnedHandle::alloc_zeroed(StructKind::CodecContext, major, size);
            accessor::write(&ctx, "width", FieldValue::I32(640)).unwrap();
            accessor::write(&ctx, "height", FieldValue::I32(360)).unwrap();
            let dc = DecoderContext {
                ctx,
                codec: std::ptr::null(),
                codec_id: 27,
            };
            assert_eq!(dc.width().unwrap(), 640);
            assert_eq!(dc.height().unwrap(), 360);
            assert_eq!(dc.codec_id(), 27);
        }
    }
}
