//! Codec context and codec parameter layouts.
//!
//! The context is the largest table we carry. Only the fields the wrappers
//! actually touch are described; the declared size still spans the full
//! native struct so allocation-side checks stay honest. Parameters first
//! exist as a separate struct in codec major 57, so earlier majors have no
//! descriptor and lookups report the shape as unsupported.

use super::{arr, f, FieldDesc, FieldType::*, ShapeDescriptor, StructKind};

// ============================================================================
// Codec context
// ============================================================================

const CTX_GEN2_FIELDS: &[FieldDesc] = &[
    f("av_class", 0, Ptr),
    f("log_level_offset", 8, I32),
    f("codec_type", 12, I32),
    f("codec", 16, Ptr),
    arr("codec_name", 24, U8, 32),
    f("codec_id", 56, I32),
    f("codec_tag", 60, U32),
    f("stream_codec_tag", 64, U32),
    f("priv_data", 72, Ptr),
    f("internal", 80, Ptr),
    f("opaque", 88, Ptr),
    f("bit_rate", 96, I32),
    f("bit_rate_tolerance", 100, I32),
    f("global_quality", 104, I32),
    f("compression_level", 108, I32),
    f("flags", 112, I32),
    f("flags2", 116, I32),
    f("extradata", 120, Ptr),
    f("extradata_size", 128, I32),
    f("time_base_num", 132, I32),
    f("time_base_den", 136, I32),
    f("ticks_per_frame", 140, I32),
    f("delay", 144, I32),
    f("width", 148, I32),
    f("height", 152, I32),
    f("coded_width", 156, I32),
    f("coded_height", 160, I32),
    f("gop_size", 164, I32),
    f("pix_fmt", 168, I32),
    f("sample_rate", 384, I32),
    f("channels", 388, I32),
    f("sample_fmt", 392, I32),
    f("frame_size", 396, I32),
    f("frame_number", 400, I32),
    f("pkt_timebase_num", 912, I32),
    f("pkt_timebase_den", 916, I32),
];

const CTX_GEN3_FIELDS: &[FieldDesc] = &[
    f("av_class", 0, Ptr),
    f("log_level_offset", 8, I32),
    f("codec_type", 12, I32),
    f("codec", 16, Ptr),
    f("codec_id", 24, I32),
    f("codec_tag", 28, U32),
    f("priv_data", 32, Ptr),
    f("internal", 40, Ptr),
    f("opaque", 48, Ptr),
    f("bit_rate", 56, I64),
    f("bit_rate_tolerance", 64, I32),
    f("global_quality", 68, I32),
    f("compression_level", 72, I32),
    f("flags", 76, I32),
    f("flags2", 80, I32),
    f("extradata", 88, Ptr),
    f("extradata_size", 96, I32),
    f("time_base_num", 100, I32),
    f("time_base_den", 104, I32),
    f("ticks_per_frame", 108, I32),
    f("delay", 112, I32),
    f("width", 116, I32),
    f("height", 120, I32),
    f("coded_width", 124, I32),
    f("coded_height", 128, I32),
    f("gop_size", 132, I32),
    f("pix_fmt", 136, I32),
    f("sample_rate", 416, I32),
    f("channels", 420, I32),
    f("sample_fmt", 424, I32),
    f("frame_size", 428, I32),
    f("frame_number", 432, I32),
    f("pkt_timebase_num", 936, I32),
    f("pkt_timebase_den", 940, I32),
];

const CTX_GEN5_FIELDS: &[FieldDesc] = &[
    f("av_class", 0, Ptr),
    f("log_level_offset", 8, I32),
    f("codec_type", 12, I32),
    f("codec", 16, Ptr),
    f("codec_id", 24, I32),
    f("codec_tag", 28, U32),
    f("priv_data", 32, Ptr),
    f("internal", 40, Ptr),
    f("opaque", 48, Ptr),
    f("bit_rate", 56, I64),
    f("bit_rate_tolerance", 64, I32),
    f("global_quality", 68, I32),
    f("compression_level", 72, I32),
    f("flags", 76, I32),
    f("flags2", 80, I32),
    f("extradata", 88, Ptr),
    f("extradata_size", 96, I32),
    f("time_base_num", 100, I32),
    f("time_base_den", 104, I32),
    f("ticks_per_frame", 108, I32),
    f("delay", 112, I32),
    f("width", 116, I32),
    f("height", 120, I32),
    f("coded_width", 124, I32),
    f("coded_height", 128, I32),
    f("gop_size", 132, I32),
    f("pix_fmt", 136, I32),
    f("sample_rate", 408, I32),
    f("channels", 412, I32),
    f("sample_fmt", 416, I32),
    f("frame_size", 420, I32),
    f("frame_number", 424, I32),
    f("ch_layout_order", 880, I32),
    f("ch_layout_nb_channels", 884, I32),
    f("ch_layout_mask", 888, U64),
    f("pkt_timebase_num", 896, I32),
    f("pkt_timebase_den", 900, I32),
];

const CTX_GEN7_FIELDS: &[FieldDesc] = &[
    f("av_class", 0, Ptr),
    f("log_level_offset", 8, I32),
    f("codec_type", 12, I32),
    f("codec", 16, Ptr),
    f("codec_id", 24, I32),
    f("codec_tag", 28, U32),
    f("priv_data", 32, Ptr),
    f("internal", 40, Ptr),
    f("opaque", 48, Ptr),
    f("bit_rate", 56, I64),
    f("bit_rate_tolerance", 64, I32),
    f("global_quality", 68, I32),
    f("compression_level", 72, I32),
    f("flags", 76, I32),
    f("flags2", 80, I32),
    f("extradata", 88, Ptr),
    f("extradata_size", 96, I32),
    f("time_base_num", 100, I32),
    f("time_base_den", 104, I32),
    f("ticks_per_frame", 108, I32),
    f("delay", 112, I32),
    f("width", 116, I32),
    f("height", 120, I32),
    f("coded_width", 124, I32),
    f("coded_height", 128, I32),
    f("gop_size", 132, I32),
    f("pix_fmt", 136, I32),
    f("sample_rate", 400, I32),
    f("sample_fmt", 404, I32),
    f("frame_size", 408, I32),
    f("ch_layout_order", 856, I32),
    f("ch_layout_nb_channels", 860, I32),
    f("ch_layout_mask", 864, U64),
    f("pkt_timebase_num", 872, I32),
    f("pkt_timebase_den", 876, I32),
];

const fn ctx_shape(major: u32, size: usize, fields: &'static [FieldDesc]) -> ShapeDescriptor {
    ShapeDescriptor {
        kind: StructKind::CodecContext,
        major,
        size,
        fields,
    }
}

static CTX_V55: ShapeDescriptor = ctx_shape(55, 920, CTX_GEN2_FIELDS);
static CTX_V56: ShapeDescriptor = ctx_shape(56, 928, CTX_GEN2_FIELDS);
static CTX_V57: ShapeDescriptor = ctx_shape(57, 944, CTX_GEN3_FIELDS);
static CTX_V58: ShapeDescriptor = ctx_shape(58, 944, CTX_GEN3_FIELDS);
static CTX_V59: ShapeDescriptor = ctx_shape(59, 904, CTX_GEN5_FIELDS);
static CTX_V60: ShapeDescriptor = ctx_shape(60, 904, CTX_GEN5_FIELDS);
static CTX_V61: ShapeDescriptor = ctx_shape(61, 880, CTX_GEN7_FIELDS);

pub(super) fn context_descriptor(major: u32) -> Option<&'static ShapeDescriptor> {
    match major {
        55 => Some(&CTX_V55),
        56 => Some(&CTX_V56),
        57 => Some(&CTX_V57),
        58 => Some(&CTX_V58),
        59 => Some(&CTX_V59),
        60 => Some(&CTX_V60),
        61 => Some(&CTX_V61),
        _ => None,
    }
}

// ============================================================================
// Codec parameters
// ============================================================================

const PAR_GEN3_FIELDS: &[FieldDesc] = &[
    f("codec_type", 0, I32),
    f("codec_id", 4, I32),
    f("codec_tag", 8, U32),
    f("extradata", 16, Ptr),
    f("extradata_size", 24, I32),
    f("format", 28, I32),
    f("bit_rate", 32, I64),
    f("bits_per_coded_sample", 40, I32),
    f("bits_per_raw_sample", 44, I32),
    f("profile", 48, I32),
    f("level", 52, I32),
    f("width", 56, I32),
    f("height", 60, I32),
    f("sample_aspect_ratio_num", 64, I32),
    f("sample_aspect_ratio_den", 68, I32),
    f("field_order", 72, I32),
    f("color_range", 76, I32),
    f("color_primaries", 80, I32),
    f("color_trc", 84, I32),
    f("color_space", 88, I32),
    f("chroma_location", 92, I32),
    f("video_delay", 96, I32),
    f("channel_layout", 104, U64),
    f("channels", 112, I32),
    f("sample_rate", 116, I32),
    f("block_align", 120, I32),
    f("frame_size", 124, I32),
    f("initial_padding", 128, I32),
    f("trailing_padding", 132, I32),
    f("seek_preroll", 136, I32),
];

const PAR_GEN5_FIELDS: &[FieldDesc] = &[
    f("codec_type", 0, I32),
    f("codec_id", 4, I32),
    f("codec_tag", 8, U32),
    f("extradata", 16, Ptr),
    f("extradata_size", 24, I32),
    f("format", 28, I32),
    f("bit_rate", 32, I64),
    f("bits_per_coded_sample", 40, I32),
    f("bits_per_raw_sample", 44, I32),
    f("profile", 48, I32),
    f("level", 52, I32),
    f("width", 56, I32),
    f("height", 60, I32),
    f("sample_aspect_ratio_num", 64, I32),
    f("sample_aspect_ratio_den", 68, I32),
    f("field_order", 72, I32),
    f("color_range", 76, I32),
    f("color_primaries", 80, I32),
    f("color_trc", 84, I32),
    f("color_space", 88, I32),
    f("chroma_location", 92, I32),
    f("video_delay", 96, I32),
    f("ch_layout_order", 104, I32),
    f("ch_layout_nb_channels", 108, I32),
    f("ch_layout_mask", 112, U64),
    f("sample_rate", 120, I32),
    f("block_align", 124, I32),
    f("frame_size", 128, I32),
    f("initial_padding", 132, I32),
    f("trailing_padding", 136, I32),
    f("seek_preroll", 140, I32),
];

const fn par_shape(major: u32, fields: &'static [FieldDesc]) -> ShapeDescriptor {
    ShapeDescriptor {
        kind: StructKind::CodecParameters,
        major,
        size: 144,
        fields,
    }
}

static PAR_V57: ShapeDescriptor = par_shape(57, PAR_GEN3_FIELDS);
static PAR_V58: ShapeDescriptor = par_shape(58, PAR_GEN3_FIELDS);
static PAR_V59: ShapeDescriptor = par_shape(59, PAR_GEN5_FIELDS);
static PAR_V60: ShapeDescriptor = par_shape(60, PAR_GEN5_FIELDS);
static PAR_V61: ShapeDescriptor = par_shape(61, PAR_GEN5_FIELDS);

pub(super) fn parameters_descriptor(major: u32) -> Option<&'static ShapeDescriptor> {
    match major {
        57 => Some(&PAR_V57),
        58 => Some(&PAR_V58),
        59 => Some(&PAR_V59),
        60 => Some(&PAR_V60),
        61 => Some(&PAR_V61),
        _ => None,
    }
}
