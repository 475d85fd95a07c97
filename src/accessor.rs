//! Versioned field access over tagged handles.
//!
//! This is the only place in the crate that dereferences into native
//! structure memory. Every read and write goes handle -> descriptor lookup
//! -> offset arithmetic -> unaligned load or store; a handle whose (kind,
//! major) pair has no descriptor, or a field name the descriptor does not
//! carry, is an explicit [`ShapeError`] rather than a guessed offset.
//!
//! Descriptor resolution happens per access. Handles stay plain address
//! plus tags, and an unsupported pair only surfaces when something actually
//! touches it.

#![expect(
    unsafe_code,
    reason = "field access reads and writes raw native structure memory"
)]

use crate::error::ShapeError;
use crate::handle::StructHandle;
use crate::shape::{descriptor_for, FieldDesc, FieldType};

/// A value read from or written to one field element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// One byte of an inline char buffer.
    U8(u8),
    /// 32-bit signed.
    I32(i32),
    /// 32-bit unsigned.
    U32(u32),
    /// 64-bit signed.
    I64(i64),
    /// 64-bit unsigned.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Pointer-sized.
    Ptr(*mut u8),
}

impl FieldValue {
    /// The declared type this value satisfies.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::U8(_) => FieldType::U8,
            FieldValue::I32(_) => FieldType::I32,
            FieldValue::U32(_) => FieldType::U32,
            FieldValue::I64(_) => FieldType::I64,
            FieldValue::U64(_) => FieldType::U64,
            FieldValue::F32(_) => FieldType::F32,
            FieldValue::F64(_) => FieldType::F64,
            FieldValue::Ptr(_) => FieldType::Ptr,
        }
    }

    /// The contained `i32`, if that is what this is.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            FieldValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained `i64`, if that is what this is.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained `u32`, if that is what this is.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            FieldValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained `u64`, if that is what this is.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained pointer, if that is what this is.
    pub fn as_ptr(&self) -> Option<*mut u8> {
        match self {
            FieldValue::Ptr(v) => Some(*v),
            _ => None,
        }
    }
}

/// Resolve the descriptor entry for `field` on `handle`.
fn locate<H: StructHandle>(handle: &H, field: &str) -> Result<&'static FieldDesc, ShapeError> {
    let desc = descriptor_for(handle.kind(), handle.major()).ok_or(
        ShapeError::UnsupportedShape {
            kind: handle.kind(),
            major: handle.major(),
        },
    )?;
    desc.field(field).ok_or_else(|| ShapeError::UnknownField {
        kind: handle.kind(),
        major: handle.major(),
        field: field.to_owned(),
    })
}

fn element_ptr(
    base: *mut u8,
    desc: &FieldDesc,
    index: usize,
) -> Result<*mut u8, ShapeError> {
    if index >= desc.count {
        return Err(ShapeError::IndexOutOfRange {
            field: desc.name.to_owned(),
            count: desc.count,
            index,
        });
    }
    Ok(unsafe { base.add(desc.offset + index * desc.ty.width()) })
}

/// Read a scalar field.
pub fn read<H: StructHandle>(handle: &H, field: &str) -> Result<FieldValue, ShapeError> {
    read_at(handle, field, 0)
}

/// Read element `index` of a field (0 for scalars).
///
/// Loads are unaligned; the descriptors keep natural alignment but the base
/// allocation is only guaranteed 8-aligned.
pub fn read_at<H: StructHandle>(
    handle: &H,
    field: &str,
    index: usize,
) -> Result<FieldValue, ShapeError> {
    let desc = locate(handle, field)?;
    let p = element_ptr(handle.addr(), desc, index)?;
    let value = unsafe {
        match desc.ty {
            FieldType::U8 => FieldValue::U8(p.read_unaligned()),
            FieldType::I32 => FieldValue::I32(p.cast::<i32>().read_unaligned()),
            FieldType::U32 => FieldValue::U32(p.cast::<u32>().read_unaligned()),
            FieldType::I64 => FieldValue::I64(p.cast::<i64>().read_unaligned()),
            FieldType::U64 => FieldValue::U64(p.cast::<u64>().read_unaligned()),
            FieldType::F32 => FieldValue::F32(p.cast::<f32>().read_unaligned()),
            FieldType::F64 => FieldValue::F64(p.cast::<f64>().read_unaligned()),
            FieldType::Ptr => FieldValue::Ptr(p.cast::<*mut u8>().read_unaligned()),
        }
    };
    Ok(value)
}

/// Write a scalar field. The value's type must match the declared type.
pub fn write<H: StructHandle>(
    handle: &H,
    field: &str,
    value: FieldValue,
) -> Result<(), ShapeError> {
    write_at(handle, field, 0, value)
}

/// Write element `index` of a field (0 for scalars).
pub fn write_at<H: StructHandle>(
    handle: &H,
    field: &str,
    index: usize,
    value: FieldValue,
) -> Result<(), ShapeError> {
    let desc = locate(handle, field)?;
    if value.field_type() != desc.ty {
        return Err(ShapeError::TypeMismatch {
            field: desc.name.to_owned(),
            expected: desc.ty,
        });
    }
    let p = element_ptr(handle.addr(), desc, index)?;
    unsafe {
        match value {
            FieldValue::U8(v) => p.write_unaligned(v),
            FieldValue::I32(v) => p.cast::<i32>().write_unaligned(v),
            FieldValue::U32(v) => p.cast::<u32>().write_unaligned(v),
            FieldValue::I64(v) => p.cast::<i64>().write_unaligned(v),
            FieldValue::U64(v) => p.cast::<u64>().write_unaligned(v),
            FieldValue::F32(v) => p.cast::<f32>().write_unaligned(v),
            FieldValue::F64(v) => p.cast::<f64>().write_unaligned(v),
            FieldValue::Ptr(v) => p.cast::<*mut u8>().write_unaligned(v),
        }
    }
    Ok(())
}

/// Typed convenience: read a field declared `I32`.
pub fn read_i32<H: StructHandle>(handle: &H, field: &str) -> Result<i32, ShapeError> {
    typed(handle, field, FieldValue::as_i32)
}

/// Typed convenience: read a field declared `I64`.
pub fn read_i64<H: StructHandle>(handle: &H, field: &str) -> Result<i64, ShapeError> {
    typed(handle, field, FieldValue::as_i64)
}

/// Typed convenience: read a field declared `U32`.
pub fn read_u32<H: StructHandle>(handle: &H, field: &str) -> Result<u32, ShapeError> {
    typed(handle, field, FieldValue::as_u32)
}

/// Typed convenience: read a field declared `U64`.
pub fn read_u64<H: StructHandle>(handle: &H, field: &str) -> Result<u64, ShapeError> {
    typed(handle, field, FieldValue::as_u64)
}

/// Typed convenience: read a field declared `Ptr`.
pub fn read_ptr<H: StructHandle>(handle: &H, field: &str) -> Result<*mut u8, ShapeError> {
    typed(handle, field, FieldValue::as_ptr)
}

fn typed<H: StructHandle, T>(
    handle: &H,
    field: &str,
    extract: impl Fn(&FieldValue) -> Option<T>,
) -> Result<T, ShapeError> {
    let value = read(handle, field)?;
    extract(&value).ok_or_else(|| ShapeError::TypeMismatch {
        field: field.to_owned(),
        expected: value.field_type(),
    })
}

/// Follow a `Ptr` field to an out-of-line pointer array and read element
/// `index` of that array.
///
/// This is how the stream list hangs off the container context: the field
/// holds a pointer to a heap array of structure pointers whose length lives
/// in a separate count field. The caller checks `index` against that count;
/// this function only refuses a null array.
pub fn read_ptr_array_element<H: StructHandle>(
    handle: &H,
    field: &str,
    index: usize,
) -> Result<Option<*mut u8>, ShapeError> {
    let array = read_ptr(handle, field)?;
    if array.is_null() {
        return Ok(None);
    }
    let element = unsafe { array.cast::<*mut u8>().add(index).read_unaligned() };
    Ok(Some(element))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::OwnedHandle;
    use crate::shape::{supported_pairs, StructKind};

    fn pattern(kind: StructKind, fi: usize, ei: usize, ty: FieldType) -> FieldValue {
        let seed = (kind as usize * 131 + fi * 17 + ei * 3 + 1) as u64;
        match ty {
            FieldType::U8 => FieldValue::U8(seed as u8),
            FieldType::I32 => FieldValue::I32(seed as i32),
            FieldType::U32 => FieldValue::U32(seed as u32),
            FieldType::I64 => FieldValue::I64(seed as i64 * -7),
            FieldType::U64 => FieldValue::U64(seed.wrapping_mul(0x9e37_79b9)),
            FieldType::F32 => FieldValue::F32(seed as f32 * 0.5),
            FieldType::F64 => FieldValue::F64(seed as f64 * 0.25),
            FieldType::Ptr => FieldValue::Ptr(std::ptr::null_mut::<u8>().wrapping_add(seed as usize)),
        }
    }

    #[test]
    fn test_every_field_round_trips_bit_for_bit() {
        for (kind, major) in supported_pairs() {
            let desc = descriptor_for(kind, major).unwrap();
            let h = OwnedHandle::alloc_zeroed(kind, major, desc.size);
            for (fi, field) in desc.fields.iter().enumerate() {
                for ei in 0..field.count {
                    let v = pattern(kind, fi, ei, field.ty);
                    write_at(&h, field.name, ei, v).unwrap();
                }
            }
            for (fi, field) in desc.fields.iter().enumerate() {
                for ei in 0..field.count {
                    let expected = pattern(kind, fi, ei, field.ty);
                    let got = read_at(&h, field.name, ei).unwrap();
                    assert_eq!(got, expected, "{desc}: field `{}`[{ei}]", field.name);
                }
            }
        }
    }

    #[test]
    fn test_writes_stay_inside_their_field() {
        // Writing one field must not disturb its neighbors.
        let h = OwnedHandle::alloc_zeroed(StructKind::Packet, 59, 104);
        write(&h, "pts", FieldValue::I64(-1)).unwrap();
        write(&h, "dts", FieldValue::I64(0)).unwrap();
        write(&h, "size", FieldValue::I32(i32::MAX)).unwrap();
        write(&h, "stream_index", FieldValue::I32(0)).unwrap();
        assert_eq!(read_i64(&h, "pts").unwrap(), -1);
        assert_eq!(read_i64(&h, "dts").unwrap(), 0);
        assert_eq!(read_i32(&h, "size").unwrap(), i32::MAX);
        assert_eq!(read_i32(&h, "stream_index").unwrap(), 0);
    }

    #[test]
    fn test_unsupported_pair_is_an_explicit_error() {
        // Codec parameters do not exist before codec major 57.
        let h = OwnedHandle::alloc_zeroed(StructKind::CodecParameters, 55, 144);
        assert_eq!(
            read(&h, "codec_id"),
            Err(ShapeError::UnsupportedShape {
                kind: StructKind::CodecParameters,
                major: 55,
            })
        );
    }

    #[test]
    fn test_unknown_field_names_itself() {
        let h = OwnedHandle::alloc_zeroed(StructKind::Frame, 59, 272);
        match read(&h, "key_frame") {
            Err(ShapeError::UnknownField { field, major, .. }) => {
                assert_eq!(field, "key_frame");
                assert_eq!(major, 59);
            }
            other => panic!("expected UnknownField, got {other:?}"),
        }
    }

    #[test]
    fn test_write_rejects_mismatched_width() {
        let h = OwnedHandle::alloc_zeroed(StructKind::Packet, 59, 104);
        // `size` is declared I32; an I64 write must be refused.
        assert_eq!(
            write(&h, "size", FieldValue::I64(1)),
            Err(ShapeError::TypeMismatch {
                field: "size".to_owned(),
                expected: FieldType::I32,
            })
        );
    }

    #[test]
    fn test_index_is_bounds_checked() {
        let h = OwnedHandle::alloc_zeroed(StructKind::Frame, 59, 272);
        assert!(read_at(&h, "linesize", 7).is_ok());
        assert_eq!(
            read_at(&h, "linesize", 8),
            Err(ShapeError::IndexOutOfRange {
                field: "linesize".to_owned(),
                count: 8,
                index: 8,
            })
        );
        // Scalars only have element 0.
        assert!(read_at(&h, "pts", 1).is_err());
    }

    #[test]
    fn test_ptr_array_element_follows_indirection() {
        let h = OwnedHandle::alloc_zeroed(StructKind::FormatContext, 61, 112);
        assert_eq!(read_ptr_array_element(&h, "streams", 0).unwrap(), None);

        let mut entries: [*mut u8; 2] = [0x1000 as *mut u8, 0x2000 as *mut u8];
        write(&h, "streams", FieldValue::Ptr(entries.as_mut_ptr().cast())).unwrap();
        assert_eq!(
            read_ptr_array_element(&h, "streams", 1).unwrap(),
            Some(0x2000 as *mut u8)
        );
    }
}
