//! Known OpenFlow protocol versions and their wire numbers.

use std::fmt;
use std::str::FromStr;

/// One supported revision of the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OFVersion {
    V1_0,
    V1_1,
    V1_2,
    V1_3,
    V1_4,
    V1_5,
}

impl OFVersion {
    pub const ALL: [OFVersion; 6] = [
        OFVersion::V1_0,
        OFVersion::V1_1,
        OFVersion::V1_2,
        OFVersion::V1_3,
        OFVersion::V1_4,
        OFVersion::V1_5,
    ];

    /// Value of the `version` byte in the OpenFlow header.
    pub fn wire_version(self) -> u32 {
        match self {
            OFVersion::V1_0 => 1,
            OFVersion::V1_1 => 2,
            OFVersion::V1_2 => 3,
            OFVersion::V1_3 => 4,
            OFVersion::V1_4 => 5,
            OFVersion::V1_5 => 6,
        }
    }

    pub fn from_wire(wire: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.wire_version() == wire)
    }

    /// Dotted form, e.g. `1.3`.
    pub fn version_string(self) -> &'static str {
        match self {
            OFVersion::V1_0 => "1.0",
            OFVersion::V1_1 => "1.1",
            OFVersion::V1_2 => "1.2",
            OFVersion::V1_3 => "1.3",
            OFVersion::V1_4 => "1.4",
            OFVersion::V1_5 => "1.5",
        }
    }

    /// Constant form used by generated code, e.g. `OF_VERSION_1_3`.
    pub fn constant_name(self) -> &'static str {
        match self {
            OFVersion::V1_0 => "OF_VERSION_1_0",
            OFVersion::V1_1 => "OF_VERSION_1_1",
            OFVersion::V1_2 => "OF_VERSION_1_2",
            OFVersion::V1_3 => "OF_VERSION_1_3",
            OFVersion::V1_4 => "OF_VERSION_1_4",
            OFVersion::V1_5 => "OF_VERSION_1_5",
        }
    }

    /// Accepts `1.3`, `OF_VERSION_1_3` and `of13` (case-insensitive).
    pub fn from_token(token: &str) -> Option<Self> {
        let t = token.trim();
        Self::ALL.into_iter().find(|v| {
            let short = format!("of{}", v.version_string().replace('.', ""));
            t == v.version_string()
                || t.eq_ignore_ascii_case(v.constant_name())
                || t.eq_ignore_ascii_case(&short)
        })
    }
}

impl fmt::Display for OFVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version_string())
    }
}

impl FromStr for OFVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OFVersion::from_token(s).ok_or_else(|| format!("unknown OpenFlow version '{}'", s))
    }
}
