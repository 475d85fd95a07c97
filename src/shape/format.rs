//! Container context and stream layouts.
//!
//! The format context kept an inline 1024-byte filename buffer for three
//! generations, grew a heap `url` pointer alongside it in 58, then dropped
//! the buffer entirely in 59. The stream table tracks the move from the
//! embedded codec context pointer to the `codecpar` pointer.

use super::{arr, f, FieldDesc, FieldType::*, ShapeDescriptor, StructKind};

// ============================================================================
// Format context
// ============================================================================

const FMT_GEN2_FIELDS: &[FieldDesc] = &[
    f("av_class", 0, Ptr),
    f("iformat", 8, Ptr),
    f("oformat", 16, Ptr),
    f("priv_data", 24, Ptr),
    f("pb", 32, Ptr),
    f("ctx_flags", 40, I32),
    f("nb_streams", 44, U32),
    f("streams", 48, Ptr),
    arr("filename", 56, U8, 1024),
    f("start_time", 1080, I64),
    f("duration", 1088, I64),
    f("bit_rate", 1096, I32),
    f("packet_size", 1100, U32),
    f("max_delay", 1104, I32),
    f("flags", 1108, I32),
];

const FMT_GEN3_FIELDS: &[FieldDesc] = &[
    f("av_class", 0, Ptr),
    f("iformat", 8, Ptr),
    f("oformat", 16, Ptr),
    f("priv_data", 24, Ptr),
    f("pb", 32, Ptr),
    f("ctx_flags", 40, I32),
    f("nb_streams", 44, U32),
    f("streams", 48, Ptr),
    arr("filename", 56, U8, 1024),
    f("start_time", 1080, I64),
    f("duration", 1088, I64),
    f("bit_rate", 1096, I64),
    f("packet_size", 1104, U32),
    f("max_delay", 1108, I32),
    f("flags", 1112, I32),
    f("probesize", 1120, I64),
];

const FMT_GEN4_FIELDS: &[FieldDesc] = &[
    f("av_class", 0, Ptr),
    f("iformat", 8, Ptr),
    f("oformat", 16, Ptr),
    f("priv_data", 24, Ptr),
    f("pb", 32, Ptr),
    f("ctx_flags", 40, I32),
    f("nb_streams", 44, U32),
    f("streams", 48, Ptr),
    arr("filename", 56, U8, 1024),
    f("url", 1080, Ptr),
    f("start_time", 1088, I64),
    f("duration", 1096, I64),
    f("bit_rate", 1104, I64),
    f("packet_size", 1112, U32),
    f("max_delay", 1116, I32),
    f("flags", 1120, I32),
    f("probesize", 1128, I64),
];

const FMT_GEN5_FIELDS: &[FieldDesc] = &[
    f("av_class", 0, Ptr),
    f("iformat", 8, Ptr),
    f("oformat", 16, Ptr),
    f("priv_data", 24, Ptr),
    f("pb", 32, Ptr),
    f("ctx_flags", 40, I32),
    f("nb_streams", 44, U32),
    f("streams", 48, Ptr),
    f("url", 56, Ptr),
    f("start_time", 64, I64),
    f("duration", 72, I64),
    f("bit_rate", 80, I64),
    f("packet_size", 88, U32),
    f("max_delay", 92, I32),
    f("flags", 96, I32),
    f("probesize", 104, I64),
];

const fn fmt_shape(major: u32, size: usize, fields: &'static [FieldDesc]) -> ShapeDescriptor {
    ShapeDescriptor {
        kind: StructKind::FormatContext,
        major,
        size,
        fields,
    }
}

static FMT_V55: ShapeDescriptor = fmt_shape(55, 1112, FMT_GEN2_FIELDS);
static FMT_V56: ShapeDescriptor = fmt_shape(56, 1112, FMT_GEN2_FIELDS);
static FMT_V57: ShapeDescriptor = fmt_shape(57, 1128, FMT_GEN3_FIELDS);
static FMT_V58: ShapeDescriptor = fmt_shape(58, 1136, FMT_GEN4_FIELDS);
static FMT_V59: ShapeDescriptor = fmt_shape(59, 112, FMT_GEN5_FIELDS);
static FMT_V60: ShapeDescriptor = fmt_shape(60, 112, FMT_GEN5_FIELDS);
static FMT_V61: ShapeDescriptor = fmt_shape(61, 112, FMT_GEN5_FIELDS);

pub(super) fn context_descriptor(major: u32) -> Option<&'static ShapeDescriptor> {
    match major {
        55 => Some(&FMT_V55),
        56 => Some(&FMT_V56),
        57 => Some(&FMT_V57),
        58 => Some(&FMT_V58),
        59 => Some(&FMT_V59),
        60 => Some(&FMT_V60),
        61 => Some(&FMT_V61),
        _ => None,
    }
}

// ============================================================================
// Stream
// ============================================================================

const STREAM_GEN2_FIELDS: &[FieldDesc] = &[
    f("index", 0, I32),
    f("id", 4, I32),
    f("codec", 8, Ptr),
    f("priv_data", 16, Ptr),
    f("pts_val", 24, I64),
    f("pts_num", 32, I32),
    f("pts_den", 36, I32),
    f("time_base_num", 40, I32),
    f("time_base_den", 44, I32),
    f("start_time", 48, I64),
    f("duration", 56, I64),
    f("nb_frames", 64, I64),
    f("disposition", 72, I32),
    f("discard", 76, I32),
    f("sample_aspect_ratio_num", 80, I32),
    f("sample_aspect_ratio_den", 84, I32),
    f("metadata", 88, Ptr),
    f("avg_frame_rate_num", 96, I32),
    f("avg_frame_rate_den", 100, I32),
];

const STREAM_GEN3_FIELDS: &[FieldDesc] = &[
    f("index", 0, I32),
    f("id", 4, I32),
    f("codec", 8, Ptr),
    f("priv_data", 16, Ptr),
    f("time_base_num", 24, I32),
    f("time_base_den", 28, I32),
    f("start_time", 32, I64),
    f("duration", 40, I64),
    f("nb_frames", 48, I64),
    f("disposition", 56, I32),
    f("discard", 60, I32),
    f("sample_aspect_ratio_num", 64, I32),
    f("sample_aspect_ratio_den", 68, I32),
    f("metadata", 72, Ptr),
    f("avg_frame_rate_num", 80, I32),
    f("avg_frame_rate_den", 84, I32),
    f("codecpar", 136, Ptr),
];

const STREAM_GEN5_FIELDS: &[FieldDesc] = &[
    f("index", 0, I32),
    f("id", 4, I32),
    f("priv_data", 8, Ptr),
    f("time_base_num", 16, I32),
    f("time_base_den", 20, I32),
    f("start_time", 24, I64),
    f("duration", 32, I64),
    f("nb_frames", 40, I64),
    f("disposition", 48, I32),
    f("discard", 52, I32),
    f("sample_aspect_ratio_num", 56, I32),
    f("sample_aspect_ratio_den", 60, I32),
    f("metadata", 64, Ptr),
    f("avg_frame_rate_num", 72, I32),
    f("avg_frame_rate_den", 76, I32),
    f("codecpar", 120, Ptr),
];

const fn stream_shape(major: u32, size: usize, fields: &'static [FieldDesc]) -> ShapeDescriptor {
    ShapeDescriptor {
        kind: StructKind::Stream,
        major,
        size,
        fields,
    }
}

static STREAM_V55: ShapeDescriptor = stream_shape(55, 104, STREAM_GEN2_FIELDS);
static STREAM_V56: ShapeDescriptor = stream_shape(56, 104, STREAM_GEN2_FIELDS);
static STREAM_V57: ShapeDescriptor = stream_shape(57, 144, STREAM_GEN3_FIELDS);
static STREAM_V58: ShapeDescriptor = stream_shape(58, 144, STREAM_GEN3_FIELDS);
static STREAM_V59: ShapeDescriptor = stream_shape(59, 128, STREAM_GEN5_FIELDS);
static STREAM_V60: ShapeDescriptor = stream_shape(60, 128, STREAM_GEN5_FIELDS);
static STREAM_V61: ShapeDescriptor = stream_shape(61, 128, STREAM_GEN5_FIELDS);

pub(super) fn stream_descriptor(major: u32) -> Option<&'static ShapeDescriptor> {
    match major {
        55 => Some(&STREAM_V55),
        56 => Some(&STREAM_V56),
        57 => Some(&STREAM_V57),
        58 => Some(&STREAM_V58),
        59 => Some(&STREAM_V59),
        60 => Some(&STREAM_V60),
        61 => Some(&STREAM_V61),
        _ => None,
    }
}
