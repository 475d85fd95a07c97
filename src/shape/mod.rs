//! Hand-reconstructed structure layouts, one per (kind, major generation).
//!
//! The native structures are opaque: once a newer release is installed its
//! headers no longer describe older binaries, so every supported generation's
//! field layout is reconstructed here from that generation's public headers
//! and kept as pure data. Offsets describe the LP64 layout. A wrong offset
//! does not fail loudly — it silently misreads memory — which makes these
//! tables the load-bearing correctness surface of the whole crate; they are
//! authored once per generation and never recomputed at run time.
//!
//! Layouts only enumerate the fields the typed wrappers need, in declaration
//! order, including the inline fixed-size arrays (frame plane pointers,
//! line sizes, the old context name buffers). Everything else in the native
//! structure is untouched padding as far as this crate is concerned.

mod codec;
mod format;
mod frame;
mod packet;

use std::fmt;

/// The structure kinds this crate mediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructKind {
    /// Compressed data unit.
    Packet,
    /// Decoded picture or sample block.
    Frame,
    /// Decoder state.
    CodecContext,
    /// Per-stream codec parameters (codec major >= 57 only).
    CodecParameters,
    /// Demuxer state.
    FormatContext,
    /// One elementary stream of an input.
    Stream,
}

/// Machine type of one described field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Unsigned byte (only used inside inline char buffers).
    U8,
    /// 32-bit signed.
    I32,
    /// 32-bit unsigned.
    U32,
    /// 64-bit signed.
    I64,
    /// 64-bit unsigned.
    U64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Pointer-sized.
    Ptr,
}

impl FieldType {
    /// Width in bytes of one element.
    pub const fn width(self) -> usize {
        match self {
            FieldType::U8 => 1,
            FieldType::I32 | FieldType::U32 | FieldType::F32 => 4,
            FieldType::I64 | FieldType::U64 | FieldType::F64 | FieldType::Ptr => 8,
        }
    }
}

/// One described field: name, byte offset, element type, element count
/// (`count > 1` is an inline fixed-size array).
#[derive(Debug, Clone, Copy)]
pub struct FieldDesc {
    /// Field name as the wrappers address it.
    pub name: &'static str,
    /// Byte offset from the structure base.
    pub offset: usize,
    /// Element type.
    pub ty: FieldType,
    /// Element count; 1 for scalars.
    pub count: usize,
}

impl FieldDesc {
    /// Bytes covered by the whole field.
    pub const fn byte_len(&self) -> usize {
        self.ty.width() * self.count
    }
}

/// Scalar field shorthand used by the per-kind tables.
const fn f(name: &'static str, offset: usize, ty: FieldType) -> FieldDesc {
    FieldDesc {
        name,
        offset,
        ty,
        count: 1,
    }
}

/// Inline-array field shorthand used by the per-kind tables.
const fn arr(name: &'static str, offset: usize, ty: FieldType, count: usize) -> FieldDesc {
    FieldDesc {
        name,
        offset,
        ty,
        count,
    }
}

/// The layout of one structure kind at one major generation.
#[derive(Debug)]
pub struct ShapeDescriptor {
    /// Structure kind described.
    pub kind: StructKind,
    /// Major version of the owning module this layout belongs to.
    pub major: u32,
    /// Total allocation size in bytes (enough for every described field).
    pub size: usize,
    /// Fields in declaration order.
    pub fields: &'static [FieldDesc],
}

impl ShapeDescriptor {
    /// Look up one field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields.iter().find(|d| d.name == name)
    }

    /// Whether this layout describes `name` at all.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

impl fmt::Display for ShapeDescriptor {
    fn fmt(&self, fm: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fm,
            "{:?} v{} ({} fields, {} bytes)",
            self.kind,
            self.major,
            self.fields.len(),
            self.size
        )
    }
}

/// Look up the layout for a (kind, major) pair.
///
/// `None` means the pair is outside the supported matrix; the accessor turns
/// that into an explicit [`crate::error::ShapeError::UnsupportedShape`]
/// instead of guessing.
pub fn descriptor_for(kind: StructKind, major: u32) -> Option<&'static ShapeDescriptor> {
    match kind {
        StructKind::Packet => packet::descriptor(major),
        StructKind::Frame => frame::descriptor(major),
        StructKind::CodecContext => codec::context_descriptor(major),
        StructKind::CodecParameters => codec::parameters_descriptor(major),
        StructKind::FormatContext => format::context_descriptor(major),
        StructKind::Stream => format::stream_descriptor(major),
    }
}

/// Every supported (kind, major) pair, for exhaustive iteration in tests and
/// coverage reporting.
pub fn supported_pairs() -> Vec<(StructKind, u32)> {
    let mut pairs = Vec::new();
    let kinds = [
        StructKind::Packet,
        StructKind::Frame,
        StructKind::CodecContext,
        StructKind::CodecParameters,
        StructKind::FormatContext,
        StructKind::Stream,
    ];
    for kind in kinds {
        for major in 0..=64u32 {
            if descriptor_for(kind, major).is_some() {
                pairs.push((kind, major));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_covers_every_known_combo() {
        for combo in crate::version::VERSION_COMBOS {
            assert!(descriptor_for(StructKind::Packet, combo.codec).is_some());
            assert!(descriptor_for(StructKind::CodecContext, combo.codec).is_some());
            assert!(descriptor_for(StructKind::Frame, combo.util).is_some());
            assert!(descriptor_for(StructKind::FormatContext, combo.format).is_some());
            assert!(descriptor_for(StructKind::Stream, combo.format).is_some());
            // Codec parameters only exist from codec major 57 onwards.
            assert_eq!(
                descriptor_for(StructKind::CodecParameters, combo.codec).is_some(),
                combo.codec >= 57
            );
        }
    }

    #[test]
    fn test_fields_are_ordered_aligned_and_disjoint() {
        for (kind, major) in supported_pairs() {
            let d = descriptor_for(kind, major).unwrap();
            let mut last_end = 0usize;
            for field in d.fields {
                assert!(
                    field.offset >= last_end,
                    "{d}: field `{}` overlaps its predecessor",
                    field.name
                );
                assert_eq!(
                    field.offset % field.ty.width(),
                    0,
                    "{d}: field `{}` misaligned",
                    field.name
                );
                assert!(field.count >= 1, "{d}: `{}` empty", field.name);
                last_end = field.offset + field.byte_len();
            }
            assert!(last_end <= d.size, "{d}: fields exceed declared size");
            assert_eq!(d.size % 8, 0, "{d}: size not 8-aligned");
        }
    }

    #[test]
    fn test_field_names_are_unique_per_descriptor() {
        for (kind, major) in supported_pairs() {
            let d = descriptor_for(kind, major).unwrap();
            for (i, field) in d.fields.iter().enumerate() {
                assert!(
                    d.fields[i + 1..].iter().all(|o| o.name != field.name),
                    "{d}: duplicate field `{}`",
                    field.name
                );
            }
        }
    }

    #[test]
    fn test_descriptor_tags_match_lookup_key() {
        for (kind, major) in supported_pairs() {
            let d = descriptor_for(kind, major).unwrap();
            assert_eq!(d.kind, kind);
            assert_eq!(d.major, major);
        }
    }

    #[test]
    fn test_generation_layouts_actually_differ() {
        // The whole reason this module exists: at least the packet, frame,
        // and format layouts change shape across generations.
        let p55 = descriptor_for(StructKind::Packet, 55).unwrap();
        let p58 = descriptor_for(StructKind::Packet, 58).unwrap();
        let p61 = descriptor_for(StructKind::Packet, 61).unwrap();
        assert_ne!(p55.size, p58.size);
        assert_ne!(p58.size, p61.size);

        let f56 = descriptor_for(StructKind::FormatContext, 56).unwrap();
        let f61 = descriptor_for(StructKind::FormatContext, 61).unwrap();
        assert!(f56.has_field("filename") && !f56.has_field("url"));
        assert!(f61.has_field("url") && !f61.has_field("filename"));

        let fr56 = descriptor_for(StructKind::Frame, 56).unwrap();
        let fr59 = descriptor_for(StructKind::Frame, 59).unwrap();
        assert!(fr56.has_field("key_frame"));
        assert!(!fr59.has_field("key_frame"));
    }
}
