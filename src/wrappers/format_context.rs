//! Container input wrapper and per-stream views.
//!
//! The input context is the one structure whose location diagnostics moved
//! around the most across generations: an inline filename buffer through
//! major 57, buffer plus heap `url` in 58, `url` only from 59. `location()`
//! hides that behind the descriptor's field inventory.

#![expect(
    unsafe_code,
    reason = "demuxer open/close/read are native calls over raw handles"
)]

use std::ffi::{c_int, c_void, CStr, CString};

use tracing::debug;

use crate::accessor;
use crate::decode::NativeStatus;
use crate::error::{NativeCallError, ShapeError};
use crate::handle::{BorrowedHandle, OwnedHandle, Release, StructHandle};
use crate::session::LibraryFamily;
use crate::shape::{descriptor_for, StructKind};
use crate::wrappers::packet::Packet;

/// An opened demuxer input, owned. Closing releases the native context.
pub struct InputContext {
    handle: OwnedHandle,
    format_major: u32,
    codec_major: u32,
    read_frame: unsafe extern "C" fn(*mut c_void, *mut c_void) -> c_int,
    find_stream_info: unsafe extern "C" fn(*mut c_void, *mut *mut c_void) -> c_int,
}

impl InputContext {
    /// Open an input by URL or path and probe its stream parameters.
    pub fn open(family: &LibraryFamily, location: &str) -> Result<Self, NativeCallError> {
        let tables = family.format_table();
        let c_location =
            CString::new(location).map_err(|_| NativeCallError::Invalid { what: "location" })?;

        let mut raw: *mut c_void = std::ptr::null_mut();
        let status = NativeStatus(unsafe {
            (tables.open_input)(
                &mut raw,
                c_location.as_ptr(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        });
        if !status.is_ok() || raw.is_null() {
            return Err(NativeCallError::Failed {
                op: "open_input",
                status,
            });
        }
        let handle = unsafe {
            OwnedHandle::from_native(
                raw.cast(),
                StructKind::FormatContext,
                family.combo().format,
                Release::NativeIndirect(tables.close_input),
            )
        };

        let ctx = Self {
            handle,
            format_major: family.combo().format,
            codec_major: family.combo().codec,
            read_frame: tables.read_frame,
            find_stream_info: tables.find_stream_info,
        };

        let status = NativeStatus(unsafe {
            (ctx.find_stream_info)(ctx.handle.addr().cast(), std::ptr::null_mut())
        });
        if !status.is_ok() {
            return Err(NativeCallError::Failed {
                op: "find_stream_info",
                status,
            });
        }
        debug!(location, streams = ctx.stream_count().unwrap_or(0), "input opened");
        Ok(ctx)
    }

    /// Number of elementary streams.
    pub fn stream_count(&self) -> Result<u32, ShapeError> {
        accessor::read_u32(&self.handle, "nb_streams")
    }

    /// View of one stream, if `index` is in range.
    pub fn stream(&self, index: u32) -> Result<Option<StreamView>, ShapeError> {
        if index >= self.stream_count()? {
            return Ok(None);
        }
        let Some(addr) = accessor::read_ptr_array_element(&self.handle, "streams", index as usize)?
        else {
            return Ok(None);
        };
        if addr.is_null() {
            return Ok(None);
        }
        let handle = unsafe { BorrowedHandle::new(addr, StructKind::Stream, self.format_major) };
        Ok(Some(StreamView {
            handle,
            codec_major: self.codec_major,
        }))
    }

    /// Total duration in the family's native time units.
    pub fn duration(&self) -> Result<i64, ShapeError> {
        accessor::read_i64(&self.handle, "duration")
    }

    /// Where the input was opened from, for diagnostics.
    ///
    /// Reads `url` on generations that have it and the inline filename
    /// buffer on the ones that predate it.
    pub fn location(&self) -> Result<String, ShapeError> {
        let desc = descriptor_for(StructKind::FormatContext, self.format_major).ok_or(
            ShapeError::UnsupportedShape {
                kind: StructKind::FormatContext,
                major: self.format_major,
            },
        )?;
        if desc.has_field("url") {
            let p = accessor::read_ptr(&self.handle, "url")?;
            if p.is_null() {
                return Ok(String::new());
            }
            let s = unsafe { CStr::from_ptr(p.cast()) };
            return Ok(s.to_string_lossy().into_owned());
        }
        let mut bytes = Vec::new();
        let count = desc
            .field("filename")
            .map(|f| f.count)
            .unwrap_or(0);
        for i in 0..count {
            let b = match accessor::read_at(&self.handle, "filename", i)? {
                accessor::FieldValue::U8(0) => break,
                accessor::FieldValue::U8(b) => b,
                _ => break,
            };
            bytes.push(b);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the next packet of the input into `packet`.
    ///
    /// `Ok(true)` means a packet was read, `Ok(false)` means the input is
    /// exhausted.
    pub fn read_packet(&self, packet: &Packet) -> Result<bool, NativeCallError> {
        let status = NativeStatus(unsafe {
            (self.read_frame)(self.handle.addr().cast(), packet.view().addr().cast())
        });
        if status.is_ok() {
            Ok(true)
        } else if status.is_end_of_file() {
            Ok(false)
        } else {
            Err(NativeCallError::Failed {
                op: "read_frame",
                status,
            })
        }
    }
}

/// A borrowed view of one elementary stream inside an input.
pub struct StreamView {
    pub(crate) handle: BorrowedHandle,
    pub(crate) codec_major: u32,
}

impl StreamView {
    /// Stream index within the input.
    pub fn index(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.handle, "index")
    }

    /// Time base as (numerator, denominator).
    pub fn time_base(&self) -> Result<(i32, i32), ShapeError> {
        Ok((
            accessor::read_i32(&self.handle, "time_base_num")?,
            accessor::read_i32(&self.handle, "time_base_den")?,
        ))
    }

    /// Stream duration in time-base units.
    pub fn duration(&self) -> Result<i64, ShapeError> {
        accessor::read_i64(&self.handle, "duration")
    }

    /// Known frame count, zero when the container does not record it.
    pub fn nb_frames(&self) -> Result<i64, ShapeError> {
        accessor::read_i64(&self.handle, "nb_frames")
    }

    /// The stream's codec parameters, on generations that separate them
    /// from the embedded codec context.
    pub fn parameters(&self) -> Result<Option<BorrowedHandle>, ShapeError> {
        let desc = descriptor_for(StructKind::Stream, self.handle.major()).ok_or(
            ShapeError::UnsupportedShape {
                kind: StructKind::Stream,
                major: self.handle.major(),
            },
        )?;
        if !desc.has_field("codecpar") {
            return Ok(None);
        }
        let p = accessor::read_ptr(&self.handle, "codecpar")?;
        if p.is_null() {
            return Ok(None);
        }
        Ok(Some(unsafe {
            BorrowedHandle::new(p, StructKind::CodecParameters, self.codec_major)
        }))
    }

    /// The embedded codec context of pre-parameters generations.
    pub(crate) fn embedded_context(&self) -> Result<Option<BorrowedHandle>, ShapeError> {
        let desc = descriptor_for(StructKind::Stream, self.handle.major()).ok_or(
            ShapeError::UnsupportedShape {
                kind: StructKind::Stream,
                major: self.handle.major(),
            },
        )?;
        if !desc.has_field("codec") {
            return Ok(None);
        }
        let p = accessor::read_ptr(&self.handle, "codec")?;
        if p.is_null() {
            return Ok(None);
        }
        Ok(Some(unsafe {
            BorrowedHandle::new(p, StructKind::CodecContext, self.codec_major)
        }))
    }

    /// The stream's codec id, from whichever structure this generation
    /// keeps it in.
    pub fn codec_id(&self) -> Result<i32, ShapeError> {
        if let Some(par) = self.parameters()? {
            return accessor::read_i32(&par, "codec_id");
        }
        if let Some(ctx) = self.embedded_context()? {
            return accessor::read_i32(&ctx, "codec_id");
        }
        Err(ShapeError::UnknownField {
            kind: StructKind::Stream,
            major: self.handle.major(),
            field: "codec_id".to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::FieldValue;

    fn stream_shell(format_major: u32) -> OwnedHandle {
        let size = descriptor_for(StructKind::Stream, format_major).unwrap().size;
        OwnedHandle::alloc_zeroed(StructKind::Stream, format_major, size)
    }

    #[test]
    fn test_codec_id_comes_from_parameters_on_new_generations() {
        let stream = stream_shell(59);
        let par_size = descriptor_for(StructKind::CodecParameters, 59).unwrap().size;
        let par = OwnedHandle::alloc_zeroed(StructKind::CodecParameters, 59, par_size);
        accessor::write(&par, "codec_id", FieldValue::I32(27)).unwrap();
        accessor::write(&stream, "codecpar", FieldValue::Ptr(par.addr())).unwrap();

        let view = StreamView {
            handle: stream.borrow(),
            codec_major: 59,
        };
        assert_eq!(view.codec_id().unwrap(), 27);
        assert!(view.parameters().unwrap().is_some());
    }

    #[test]
    fn test_codec_id_comes_from_embedded_context_on_old_generations() {
        let stream = stream_shell(56);
        let ctx_size = descriptor_for(StructKind::CodecContext, 56).unwrap().size;
        let ctx = OwnedHandle::alloc_zeroed(StructKind::CodecContext, 56, ctx_size);
        accessor::write(&ctx, "codec_id", FieldValue::I32(13)).unwrap();
        accessor::write(&stream, "codec", FieldValue::Ptr(ctx.addr())).unwrap();

        let view = StreamView {
            handle: stream.borrow(),
            codec_major: 56,
        };
        // Major-56 streams have no codecpar field at all.
        assert!(view.parameters().unwrap().is_none());
        assert_eq!(view.codec_id().unwrap(), 13);
    }

    #[test]
    fn test_stream_metadata_getters() {
        let stream = stream_shell(61);
        accessor::write(&stream, "index", FieldValue::I32(1)).unwrap();
        accessor::write(&stream, "time_base_num", FieldValue::I32(1)).unwrap();
        accessor::write(&stream, "time_base_den", FieldValue::I32(90_000)).unwrap();
        accessor::write(&stream, "duration", FieldValue::I64(450_000)).unwrap();

        let view = StreamView {
            handle: stream.borrow(),
            codec_major: 61,
        };
        assert_eq!(view.index().unwrap(), 1);
        assert_eq!(view.time_base().unwrap(), (1, 90_000));
        assert_eq!(view.duration().unwrap(), 450_000);
    }

    #[test]
    fn test_location_reads_url_pointer_on_new_generations() {
        let size = descriptor_for(StructKind::FormatContext, 61).unwrap().size;
        let fmt = OwnedHandle::alloc_zeroed(StructKind::FormatContext, 61, size);
        let url = CString::new("rtsp://cam/stream1").unwrap();
        accessor::write(&fmt, "url", FieldValue::Ptr(url.as_ptr() as *mut u8)).unwrap();

        let ctx = InputContext {
            handle: fmt,
            format_major: 61,
            codec_major: 61,
            read_frame: noop_read_frame,
            find_stream_info: noop_find_stream_info,
        };
        assert_eq!(ctx.location().unwrap(), "rtsp://cam/stream1");
    }

    #[test]
    fn test_location_reads_inline_filename_on_old_generations() {
        let size = descriptor_for(StructKind::FormatContext, 56).unwrap().size;
        let fmt = OwnedHandle::alloc_zeroed(StructKind::FormatContext, 56, size);
        for (i, b) in b"clip.mkv".iter().enumerate() {
            accessor::write_at(&fmt, "filename", i, FieldValue::U8(*b)).unwrap();
        }

        let ctx = InputContext {
            handle: fmt,
            format_major: 56,
            codec_major: 56,
            read_frame: noop_read_frame,
            find_stream_info: noop_find_stream_info,
        };
        assert_eq!(ctx.location().unwrap(), "clip.mkv");
    }

    #[test]
    fn test_stream_lookup_follows_the_pointer_array() {
        let size = descriptor_for(StructKind::FormatContext, 61).unwrap().size;
        let fmt = OwnedHandle::alloc_zeroed(StructKind::FormatContext, 61, size);
        let s0 = stream_shell(61);
        accessor::write(&s0, "index", FieldValue::I32(0)).unwrap();
        let mut entries: [*mut u8; 1] = [s0.addr()];
        accessor::write(&fmt, "nb_streams", FieldValue::U32(1)).unwrap();
        accessor::write(&fmt, "streams", FieldValue::Ptr(entries.as_mut_ptr().cast())).unwrap();

        let ctx = InputContext {
            handle: fmt,
            format_major: 61,
            codec_major: 61,
            read_frame: noop_read_frame,
            find_stream_info: noop_find_stream_info,
        };
        let view = ctx.stream(0).unwrap().unwrap();
        assert_eq!(view.index().unwrap(), 0);
        assert!(ctx.stream(1).unwrap().is_none());
    }

    unsafe extern "C" fn noop_read_frame(_ctx: *mut c_void, _pkt: *mut c_void) -> c_int {
        NativeStatus::END_OF_FILE.0
    }

    unsafe extern "C" fn noop_find_stream_info(
        _ctx: *mut c_void,
        _opts: *mut *mut c_void,
    ) -> c_int {
        0
    }
}
