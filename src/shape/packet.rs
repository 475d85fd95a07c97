//! Packet layouts per codec generation.
//!
//! Three distinct shapes cover the seven supported majors:
//! - 55/56 still carry the caller-visible `destruct`/`priv` pair and a
//!   32-bit `duration`;
//! - 57/58 drop those and widen `duration` to 64 bits;
//! - 59+ drop `convergence_duration` and append `opaque`, `opaque_ref`
//!   and an embedded time base.

use super::{f, FieldDesc, FieldType::*, ShapeDescriptor, StructKind};

const GEN2_FIELDS: &[FieldDesc] = &[
    f("buf", 0, Ptr),
    f("pts", 8, I64),
    f("dts", 16, I64),
    f("data", 24, Ptr),
    f("size", 32, I32),
    f("stream_index", 36, I32),
    f("flags", 40, I32),
    f("side_data", 48, Ptr),
    f("side_data_elems", 56, I32),
    f("duration", 60, I32),
    f("destruct", 64, Ptr),
    f("priv", 72, Ptr),
    f("pos", 80, I64),
    f("convergence_duration", 88, I64),
];

const GEN3_FIELDS: &[FieldDesc] = &[
    f("buf", 0, Ptr),
    f("pts", 8, I64),
    f("dts", 16, I64),
    f("data", 24, Ptr),
    f("size", 32, I32),
    f("stream_index", 36, I32),
    f("flags", 40, I32),
    f("side_data", 48, Ptr),
    f("side_data_elems", 56, I32),
    f("duration", 64, I64),
    f("pos", 72, I64),
    f("convergence_duration", 80, I64),
];

const GEN5_FIELDS: &[FieldDesc] = &[
    f("buf", 0, Ptr),
    f("pts", 8, I64),
    f("dts", 16, I64),
    f("data", 24, Ptr),
    f("size", 32, I32),
    f("stream_index", 36, I32),
    f("flags", 40, I32),
    f("side_data", 48, Ptr),
    f("side_data_elems", 56, I32),
    f("duration", 64, I64),
    f("pos", 72, I64),
    f("opaque", 80, Ptr),
    f("opaque_ref", 88, Ptr),
    f("time_base_num", 96, I32),
    f("time_base_den", 100, I32),
];

const fn shape(major: u32, size: usize, fields: &'static [FieldDesc]) -> ShapeDescriptor {
    ShapeDescriptor {
        kind: StructKind::Packet,
        major,
        size,
        fields,
    }
}

static V55: ShapeDescriptor = shape(55, 96, GEN2_FIELDS);
static V56: ShapeDescriptor = shape(56, 96, GEN2_FIELDS);
static V57: ShapeDescriptor = shape(57, 88, GEN3_FIELDS);
static V58: ShapeDescriptor = shape(58, 88, GEN3_FIELDS);
static V59: ShapeDescriptor = shape(59, 104, GEN5_FIELDS);
static V60: ShapeDescriptor = shape(60, 104, GEN5_FIELDS);
static V61: ShapeDescriptor = shape(61, 104, GEN5_FIELDS);

pub(super) fn descriptor(major: u32) -> Option<&'static ShapeDescriptor> {
    match major {
        55 => Some(&V55),
        56 => Some(&V56),
        57 => Some(&V57),
        58 => Some(&V58),
        59 => Some(&V59),
        60 => Some(&V60),
        61 => Some(&V61),
        _ => None,
    }
}
