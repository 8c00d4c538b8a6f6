//! Primitive wire types and their per-version widths.

use crate::version::OFVersion;

/// Wire shape of a primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Big-endian unsigned integer of the given byte width (1, 2, 4 or 8).
    Int(usize),
    /// Fixed-size byte string (addresses, names, 128-bit values).
    Bytes(usize),
    /// Variable-width byte string running to the end of its enclosing bound.
    Octets,
}

impl Primitive {
    /// Width in bytes, `None` for variable-width types.
    pub fn width(self) -> Option<usize> {
        match self {
            Primitive::Int(n) | Primitive::Bytes(n) => Some(n),
            Primitive::Octets => None,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Primitive::Int(_))
    }
}

/// Resolve a primitive type name for one version.
pub fn primitive(name: &str, version: OFVersion) -> Option<Primitive> {
    let p = match name {
        "uint8_t" => Primitive::Int(1),
        "uint16_t" => Primitive::Int(2),
        "uint32_t" => Primitive::Int(4),
        "uint64_t" => Primitive::Int(8),
        "uint128_t" | "of_bitmap_128_t" => Primitive::Bytes(16),
        "of_mac_addr_t" => Primitive::Bytes(6),
        "of_ipv4_t" => Primitive::Bytes(4),
        "of_ipv6_t" => Primitive::Bytes(16),
        "of_port_name_t" => Primitive::Bytes(16),
        "of_table_name_t" | "of_serial_num_t" => Primitive::Bytes(32),
        "of_str64_t" => Primitive::Bytes(64),
        "of_desc_str_t" => Primitive::Bytes(256),
        "of_octets_t" => Primitive::Octets,
        "of_port_no_t" => match version {
            OFVersion::V1_0 => Primitive::Int(2),
            _ => Primitive::Int(4),
        },
        "of_fm_cmd_t" => match version {
            OFVersion::V1_0 => Primitive::Int(2),
            _ => Primitive::Int(1),
        },
        "of_wc_bmap_t" | "of_match_bmap_t" => match version {
            OFVersion::V1_0 | OFVersion::V1_1 => Primitive::Int(4),
            _ => Primitive::Int(8),
        },
        _ => return None,
    };
    Some(p)
}

/// True if `name` is a primitive in any version.
pub fn is_primitive(name: &str) -> bool {
    primitive(name, OFVersion::V1_0).is_some()
}

/// Name of the list class synthesized for `list(element)`.
pub fn list_class_name(element: &str) -> String {
    match element.strip_prefix("of_") {
        Some(rest) => format!("of_list_{}", rest),
        None => format!("list_{}", element),
    }
}
