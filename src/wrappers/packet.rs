//! Compressed-data packet wrapper.
//!
//! Allocation differs by protocol generation: the split protocol allocates
//! packet shells natively and frees them with the matching native call; the
//! combined protocol expects a caller-allocated shell that is initialized,
//! used, and cleaned up with the payload-release call before the shell
//! itself is returned.

#![expect(
    unsafe_code,
    reason = "packet shells are allocated and released through native entry points"
)]

use crate::accessor::{self, FieldValue};
use crate::decode::NativeStatus;
use crate::error::{NativeCallError, ShapeError};
use crate::handle::{BorrowedHandle, OwnedHandle, Release, StructHandle};
use crate::session::LibraryFamily;
use crate::shape::{descriptor_for, StructKind};
use crate::tables::CodecApi;

/// One compressed data unit, owned.
pub struct Packet {
    handle: OwnedHandle,
}

impl Packet {
    /// Allocate an empty packet appropriate for the family's codec
    /// generation.
    pub fn alloc(family: &LibraryFamily) -> Result<Self, NativeCallError> {
        let major = family.combo().codec;
        let handle = match family.codec_table().api {
            CodecApi::Split(fns) => {
                let addr = unsafe { (fns.packet_alloc)() };
                if addr.is_null() {
                    return Err(NativeCallError::Failed {
                        op: "packet_alloc",
                        status: NativeStatus::OUT_OF_MEMORY,
                    });
                }
                unsafe {
                    OwnedHandle::from_native(
                        addr.cast(),
                        StructKind::Packet,
                        major,
                        Release::NativeIndirect(fns.packet_free),
                    )
                }
            }
            CodecApi::Combined(fns) => {
                let size = descriptor_for(StructKind::Packet, major)
                    .ok_or(ShapeError::UnsupportedShape {
                        kind: StructKind::Packet,
                        major,
                    })?
                    .size;
                let shell = OwnedHandle::alloc_zeroed(StructKind::Packet, major, size)
                    .with_cleanup(fns.free_packet);
                unsafe { (fns.init_packet)(shell.addr().cast()) };
                shell
            }
        };
        Ok(Self { handle })
    }

    /// Wrap an already-allocated packet handle.
    pub fn from_handle(handle: OwnedHandle) -> Self {
        Self { handle }
    }

    /// Non-owning view for submitting into a decoder session.
    pub fn view(&self) -> BorrowedHandle {
        self.handle.borrow()
    }

    /// Presentation timestamp.
    pub fn pts(&self) -> Result<i64, ShapeError> {
        accessor::read_i64(&self.handle, "pts")
    }

    /// Decode timestamp.
    pub fn dts(&self) -> Result<i64, ShapeError> {
        accessor::read_i64(&self.handle, "dts")
    }

    /// Index of the stream this packet belongs to.
    pub fn stream_index(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.handle, "stream_index")
    }

    /// Payload size in bytes; zero means no payload.
    pub fn size(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.handle, "size")
    }

    /// Packet flag bits.
    pub fn flags(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.handle, "flags")
    }

    /// Set the stream index before submitting.
    pub fn set_stream_index(&self, index: i32) -> Result<(), ShapeError> {
        accessor::write(&self.handle, "stream_index", FieldValue::I32(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(major: u32) -> Packet {
        let size = descriptor_for(StructKind::Packet, major).unwrap().size;
        Packet::from_handle(OwnedHandle::alloc_zeroed(StructKind::Packet, major, size))
    }

    #[test]
    fn test_getters_track_accessor_writes() {
        for major in [55u32, 57, 61] {
            let p = shell(major);
            accessor::write(&p.handle, "pts", FieldValue::I64(90_000)).unwrap();
            accessor::write(&p.handle, "dts", FieldValue::I64(89_000)).unwrap();
            accessor::write(&p.handle, "size", FieldValue::I32(1_316)).unwrap();
            p.set_stream_index(2).unwrap();

            assert_eq!(p.pts().unwrap(), 90_000);
            assert_eq!(p.dts().unwrap(), 89_000);
            assert_eq!(p.size().unwrap(), 1_316);
            assert_eq!(p.stream_index().unwrap(), 2);
        }
    }

    #[test]
    fn test_view_shares_the_same_structure() {
        let p = shell(59);
        accessor::write(&p.handle, "size", FieldValue::I32(7)).unwrap();
        let v = p.view();
        assert_eq!(accessor::read_i32(&v, "size").unwrap(), 7);
    }
}
