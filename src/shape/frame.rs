//! Frame layouts per shared-utility generation.
//!
//! The plane-pointer and line-size arrays at the front never moved; the
//! churn is all behind them: `pkt_pts` left in 56, an embedded time base
//! arrived in 57, the picture-number pair left and the channel layout became
//! a struct in 58, and 59 finally dropped `key_frame`/`interlaced_frame` in
//! favor of flag bits.

use super::{arr, f, FieldDesc, FieldType::*, ShapeDescriptor, StructKind};

const GEN_OLD_FIELDS: &[FieldDesc] = &[
    arr("data", 0, Ptr, 8),
    arr("linesize", 64, I32, 8),
    f("extended_data", 96, Ptr),
    f("width", 104, I32),
    f("height", 108, I32),
    f("nb_samples", 112, I32),
    f("format", 116, I32),
    f("key_frame", 120, I32),
    f("pict_type", 124, I32),
    f("sample_aspect_ratio_num", 128, I32),
    f("sample_aspect_ratio_den", 132, I32),
    f("pts", 136, I64),
    f("pkt_pts", 144, I64),
    f("pkt_dts", 152, I64),
    f("coded_picture_number", 160, I32),
    f("display_picture_number", 164, I32),
    f("quality", 168, I32),
    f("opaque", 176, Ptr),
    arr("error", 184, U64, 8),
    f("repeat_pict", 248, I32),
    f("interlaced_frame", 252, I32),
    f("top_field_first", 256, I32),
    f("palette_has_changed", 260, I32),
    f("reordered_opaque", 264, I64),
    f("sample_rate", 272, I32),
    f("channel_layout", 280, U64),
];

const GEN4_FIELDS: &[FieldDesc] = &[
    arr("data", 0, Ptr, 8),
    arr("linesize", 64, I32, 8),
    f("extended_data", 96, Ptr),
    f("width", 104, I32),
    f("height", 108, I32),
    f("nb_samples", 112, I32),
    f("format", 116, I32),
    f("key_frame", 120, I32),
    f("pict_type", 124, I32),
    f("sample_aspect_ratio_num", 128, I32),
    f("sample_aspect_ratio_den", 132, I32),
    f("pts", 136, I64),
    f("pkt_dts", 144, I64),
    f("coded_picture_number", 152, I32),
    f("display_picture_number", 156, I32),
    f("quality", 160, I32),
    f("opaque", 168, Ptr),
    arr("error", 176, U64, 8),
    f("repeat_pict", 240, I32),
    f("interlaced_frame", 244, I32),
    f("top_field_first", 248, I32),
    f("palette_has_changed", 252, I32),
    f("reordered_opaque", 256, I64),
    f("sample_rate", 264, I32),
    f("channel_layout", 272, U64),
];

const GEN5_FIELDS: &[FieldDesc] = &[
    arr("data", 0, Ptr, 8),
    arr("linesize", 64, I32, 8),
    f("extended_data", 96, Ptr),
    f("width", 104, I32),
    f("height", 108, I32),
    f("nb_samples", 112, I32),
    f("format", 116, I32),
    f("key_frame", 120, I32),
    f("pict_type", 124, I32),
    f("sample_aspect_ratio_num", 128, I32),
    f("sample_aspect_ratio_den", 132, I32),
    f("pts", 136, I64),
    f("pkt_dts", 144, I64),
    f("time_base_num", 152, I32),
    f("time_base_den", 156, I32),
    f("coded_picture_number", 160, I32),
    f("display_picture_number", 164, I32),
    f("quality", 168, I32),
    f("opaque", 176, Ptr),
    arr("error", 184, U64, 8),
    f("repeat_pict", 248, I32),
    f("interlaced_frame", 252, I32),
    f("top_field_first", 256, I32),
    f("palette_has_changed", 260, I32),
    f("reordered_opaque", 264, I64),
    f("sample_rate", 272, I32),
    f("channel_layout", 280, U64),
];

const GEN6_FIELDS: &[FieldDesc] = &[
    arr("data", 0, Ptr, 8),
    arr("linesize", 64, I32, 8),
    f("extended_data", 96, Ptr),
    f("width", 104, I32),
    f("height", 108, I32),
    f("nb_samples", 112, I32),
    f("format", 116, I32),
    f("key_frame", 120, I32),
    f("pict_type", 124, I32),
    f("sample_aspect_ratio_num", 128, I32),
    f("sample_aspect_ratio_den", 132, I32),
    f("pts", 136, I64),
    f("pkt_dts", 144, I64),
    f("time_base_num", 152, I32),
    f("time_base_den", 156, I32),
    f("quality", 160, I32),
    f("opaque", 168, Ptr),
    arr("error", 176, U64, 8),
    f("repeat_pict", 240, I32),
    f("interlaced_frame", 244, I32),
    f("top_field_first", 248, I32),
    f("palette_has_changed", 252, I32),
    f("reordered_opaque", 256, I64),
    f("sample_rate", 264, I32),
    f("ch_layout_order", 272, I32),
    f("ch_layout_nb_channels", 276, I32),
    f("ch_layout_mask", 280, U64),
];

const GEN7_FIELDS: &[FieldDesc] = &[
    arr("data", 0, Ptr, 8),
    arr("linesize", 64, I32, 8),
    f("extended_data", 96, Ptr),
    f("width", 104, I32),
    f("height", 108, I32),
    f("nb_samples", 112, I32),
    f("format", 116, I32),
    f("pict_type", 120, I32),
    f("sample_aspect_ratio_num", 124, I32),
    f("sample_aspect_ratio_den", 128, I32),
    f("pts", 136, I64),
    f("pkt_dts", 144, I64),
    f("time_base_num", 152, I32),
    f("time_base_den", 156, I32),
    f("quality", 160, I32),
    f("opaque", 168, Ptr),
    arr("error", 176, U64, 8),
    f("repeat_pict", 240, I32),
    f("flags", 244, I32),
    f("sample_rate", 248, I32),
    f("ch_layout_order", 256, I32),
    f("ch_layout_nb_channels", 260, I32),
    f("ch_layout_mask", 264, U64),
];

const fn shape(major: u32, size: usize, fields: &'static [FieldDesc]) -> ShapeDescriptor {
    ShapeDescriptor {
        kind: StructKind::Frame,
        major,
        size,
        fields,
    }
}

static V52: ShapeDescriptor = shape(52, 288, GEN_OLD_FIELDS);
static V54: ShapeDescriptor = shape(54, 288, GEN_OLD_FIELDS);
static V55: ShapeDescriptor = shape(55, 288, GEN_OLD_FIELDS);
static V56: ShapeDescriptor = shape(56, 280, GEN4_FIELDS);
static V57: ShapeDescriptor = shape(57, 288, GEN5_FIELDS);
static V58: ShapeDescriptor = shape(58, 288, GEN6_FIELDS);
static V59: ShapeDescriptor = shape(59, 272, GEN7_FIELDS);

pub(super) fn descriptor(major: u32) -> Option<&'static ShapeDescriptor> {
    match major {
        52 => Some(&V52),
        54 => Some(&V54),
        55 => Some(&V55),
        56 => Some(&V56),
        57 => Some(&V57),
        58 => Some(&V58),
        59 => Some(&V59),
        _ => None,
    }
}
