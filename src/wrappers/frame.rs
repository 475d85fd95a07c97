//! Decoded frame wrapper.

use crate::accessor;
use crate::error::ShapeError;
use crate::handle::OwnedHandle;

/// One decoded picture or sample block, owned.
///
/// Produced by the decode pipeline; the handle's major is the
/// shared-utility generation, which is what the frame layout follows.
pub struct Frame {
    handle: OwnedHandle,
}

impl Frame {
    /// Wrap a frame handle produced by the pipeline.
    pub fn from_handle(handle: OwnedHandle) -> Self {
        Self { handle }
    }

    /// Picture width in pixels.
    pub fn width(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.handle, "width")
    }

    /// Picture height in pixels.
    pub fn height(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.handle, "height")
    }

    /// Pixel or sample format discriminant.
    pub fn format(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.handle, "format")
    }

    /// Presentation timestamp.
    pub fn pts(&self) -> Result<i64, ShapeError> {
        accessor::read_i64(&self.handle, "pts")
    }

    /// Audio sample count.
    pub fn nb_samples(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.handle, "nb_samples")
    }

    /// Audio sample rate.
    pub fn sample_rate(&self) -> Result<i32, ShapeError> {
        accessor::read_i32(&self.handle, "sample_rate")
    }

    /// Data pointer of one plane.
    pub fn plane(&self, index: usize) -> Result<*mut u8, ShapeError> {
        accessor::read_at(&self.handle, "data", index).map(|v| {
            v.as_ptr().unwrap_or(std::ptr::null_mut())
        })
    }

    /// Line size of one plane in bytes.
    pub fn linesize(&self, index: usize) -> Result<i32, ShapeError> {
        accessor::read_at(&self.handle, "linesize", index)?
            .as_i32()
            .ok_or(ShapeError::TypeMismatch {
                field: "linesize".to_owned(),
                expected: crate::shape::FieldType::I32,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::FieldValue;
    use crate::shape::{descriptor_for, StructKind};

    fn shell(util_major: u32) -> Frame {
        let size = descriptor_for(StructKind::Frame, util_major).unwrap().size;
        Frame::from_handle(OwnedHandle::alloc_zeroed(
            StructKind::Frame,
            util_major,
            size,
        ))
    }

    #[test]
    fn test_video_getters() {
        for major in [54u32, 57, 59] {
            let f = shell(major);
            accessor::write(&f.handle, "width", FieldValue::I32(1920)).unwrap();
            accessor::write(&f.handle, "height", FieldValue::I32(1080)).unwrap();
            accessor::write(&f.handle, "pts", FieldValue::I64(3600)).unwrap();
            accessor::write_at(&f.handle, "linesize", 0, FieldValue::I32(1920)).unwrap();
            accessor::write_at(&f.handle, "linesize", 1, FieldValue::I32(960)).unwrap();

            assert_eq!(f.width().unwrap(), 1920);
            assert_eq!(f.height().unwrap(), 1080);
            assert_eq!(f.pts().unwrap(), 3600);
            assert_eq!(f.linesize(0).unwrap(), 1920);
            assert_eq!(f.linesize(1).unwrap(), 960);
            assert!(f.plane(0).unwrap().is_null());
        }
    }

    #[test]
    fn test_plane_index_is_bounds_checked() {
        let f = shell(57);
        assert!(f.plane(7).is_ok());
        assert!(matches!(
            f.plane(8),
            Err(ShapeError::IndexOutOfRange { .. })
        ));
    }
}
