//! Abstract syntax tree for OpenFlow input files.
//!
//! The tree is a faithful, unvalidated image of one file. All nodes are `Eq` so that
//! two parses of the same text can be compared directly.

use std::fmt;

/// One parsed input file: the two header lines and the declarations that follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub header: Header,
    pub declarations: Vec<Declaration>,
}

/// Header lines: version tokens (line 1) and wire version numbers (line 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version_tokens: Vec<String>,
    pub wire_versions: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Struct(StructDecl),
    Enum(EnumDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Struct(s) => &s.name,
            Declaration::Enum(e) => &e.name,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Declaration::Struct(s) => s.line,
            Declaration::Enum(e) => e.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    pub name: String,
    pub superclass: Option<String>,
    pub members: Vec<MemberDecl>,
    pub line: usize,
}

/// One entry of a struct body, in declaration (wire) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberDecl {
    /// `type name;`
    Data { ty: TypeRef, name: String },
    /// `list(type) name;`
    List { element: TypeRef, name: String },
    /// `type name == value;`
    Fixed { ty: TypeRef, name: String, value: u64 },
    /// `type name == ?;`
    Discriminator { ty: TypeRef, name: String },
    /// `pad(n);`
    Pad { length: u64 },
}

impl MemberDecl {
    /// Member name; pad entries are anonymous.
    pub fn name(&self) -> Option<&str> {
        match self {
            MemberDecl::Data { name, .. }
            | MemberDecl::List { name, .. }
            | MemberDecl::Fixed { name, .. }
            | MemberDecl::Discriminator { name, .. } => Some(name),
            MemberDecl::Pad { .. } => None,
        }
    }

    pub fn type_ref(&self) -> Option<&TypeRef> {
        match self {
            MemberDecl::Data { ty, .. }
            | MemberDecl::Fixed { ty, .. }
            | MemberDecl::Discriminator { ty, .. } => Some(ty),
            MemberDecl::List { element, .. } => Some(element),
            MemberDecl::Pad { .. } => None,
        }
    }
}

/// A named type, optionally as a fixed-size array (`uint8_t[6]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub name: String,
    pub array_len: Option<u64>,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef {
            name: name.into(),
            array_len: None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.array_len {
            Some(n) => write!(f, "{}[{}]", self.name, n),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: String,
    /// Raw `(key, value)` parameters, e.g. `("wire_type", "uint16_t")`.
    pub params: Vec<(String, String)>,
    pub entries: Vec<EnumEntry>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    pub name: String,
    pub value: u64,
}
