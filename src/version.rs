//! Library family versions and the packed-integer probe decode.
//!
//! Each module in the family self-reports a single packed integer through its
//! `<module>_version()` entry point. That integer is the only versioning
//! signal available before any structure may be touched, so the bit packing
//! is reproduced here exactly: `major << 16 | minor << 8 | micro`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four cooperating modules of the library family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleKind {
    /// Container format layer (demuxing/muxing).
    Format,
    /// Codec layer (decoders/encoders).
    Codec,
    /// Shared utility layer (frames, memory, logging).
    Util,
    /// Audio resampler layer.
    Resample,
}

impl ModuleKind {
    /// Base library name, without platform prefix/suffix decoration.
    pub fn base_name(self) -> &'static str {
        match self {
            ModuleKind::Format => "avformat",
            ModuleKind::Codec => "avcodec",
            ModuleKind::Util => "avutil",
            ModuleKind::Resample => "swresample",
        }
    }

    /// Name of the module's self-reported-version entry point.
    pub fn version_symbol(self) -> &'static str {
        match self {
            ModuleKind::Format => "avformat_version",
            ModuleKind::Codec => "avcodec_version",
            ModuleKind::Util => "avutil_version",
            ModuleKind::Resample => "swresample_version",
        }
    }

    /// All four modules, in bind order.
    pub const ALL: [ModuleKind; 4] = [
        ModuleKind::Util,
        ModuleKind::Format,
        ModuleKind::Codec,
        ModuleKind::Resample,
    ];
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

/// A decoded module version. Ordering is lexicographic over
/// (major, minor, micro).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Binary-compatibility generation; determines struct layout and the
    /// available entry points.
    pub major: u32,
    /// Feature level within a generation.
    pub minor: u32,
    /// Patch level.
    pub micro: u32,
}

impl Version {
    /// Construct from explicit components.
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }

    /// Decode the family's packed version integer.
    ///
    /// The packing is `major << 16 | minor << 8 | micro`; the decode is a
    /// pure function and trivially idempotent.
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            major: packed >> 16,
            minor: (packed >> 8) & 0xff,
            micro: packed & 0xff,
        }
    }

    /// Re-pack into the family's integer form.
    pub const fn to_packed(self) -> u32 {
        (self.major << 16) | ((self.minor & 0xff) << 8) | (self.micro & 0xff)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

/// One known-good four-module combination, identified by major versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionCombo {
    /// Container format major.
    pub format: u32,
    /// Codec major.
    pub codec: u32,
    /// Shared utility major.
    pub util: u32,
    /// Resampler major.
    pub resample: u32,
}

impl VersionCombo {
    /// Major version expected of one module in this combination.
    pub fn major_of(self, kind: ModuleKind) -> u32 {
        match kind {
            ModuleKind::Format => self.format,
            ModuleKind::Codec => self.codec,
            ModuleKind::Util => self.util,
            ModuleKind::Resample => self.resample,
        }
    }
}

impl fmt::Display for VersionCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avformat={} avcodec={} avutil={} swresample={}",
            self.format, self.codec, self.util, self.resample
        )
    }
}

/// Known-good combinations, newest first. Discovery walks this list and
/// retains the first combination that fully binds.
///
/// Spans the seven incompatible codec generations 55 through 61
/// (release series 2.x through 7.x).
pub const VERSION_COMBOS: &[VersionCombo] = &[
    // 7.x
    VersionCombo { format: 61, codec: 61, util: 59, resample: 5 },
    // 6.x
    VersionCombo { format: 60, codec: 60, util: 58, resample: 4 },
    // 5.x
    VersionCombo { format: 59, codec: 59, util: 57, resample: 4 },
    // 4.x
    VersionCombo { format: 58, codec: 58, util: 56, resample: 3 },
    // 3.x
    VersionCombo { format: 57, codec: 57, util: 55, resample: 2 },
    // 2.8
    VersionCombo { format: 56, codec: 56, util: 54, resample: 1 },
    // 2.0 - 2.3
    VersionCombo { format: 55, codec: 55, util: 52, resample: 0 },
];

/// Codec majors at or above this threshold use the submit/receive protocol;
/// older majors use the combined-decode protocol.
pub const SPLIT_PROTOCOL_CODEC_MAJOR: u32 = 58;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_decode() {
        // 59.37.100 as the family packs it
        let packed = (59 << 16) | (37 << 8) | 100;
        let v = Version::from_packed(packed);
        assert_eq!(v, Version::new(59, 37, 100));
        assert_eq!(v.to_packed(), packed);
    }

    #[test]
    fn test_decode_is_idempotent() {
        let packed = 0x3A_25_64; // 58.37.100
        assert_eq!(Version::from_packed(packed), Version::from_packed(packed));
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        assert!(Version::new(59, 0, 0) > Version::new(58, 99, 99));
        assert!(Version::new(59, 1, 0) > Version::new(59, 0, 99));
        assert!(Version::new(59, 1, 2) > Version::new(59, 1, 1));
    }

    #[test]
    fn test_combos_are_newest_first() {
        for pair in VERSION_COMBOS.windows(2) {
            assert!(pair[0].codec > pair[1].codec, "{} !> {}", pair[0], pair[1]);
            assert!(pair[0].format > pair[1].format);
            assert!(pair[0].util > pair[1].util);
            assert!(pair[0].resample >= pair[1].resample);
        }
    }

    #[test]
    fn test_combos_cover_seven_codec_generations() {
        let majors: Vec<u32> = VERSION_COMBOS.iter().map(|c| c.codec).collect();
        assert_eq!(majors, vec![61, 60, 59, 58, 57, 56, 55]);
    }

    #[test]
    fn test_protocol_threshold() {
        assert!(59 >= SPLIT_PROTOCOL_CODEC_MAJOR);
        assert!(56 < SPLIT_PROTOCOL_CODEC_MAJOR);
    }
}
