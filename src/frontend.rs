//! Per-file semantic checks: turn one file's AST into an [`OFInput`].
//!
//! Nothing here looks beyond the file being processed. Cross-file references are
//! resolved later, per version, in [`crate::ir`].

use crate::ast::{self, EnumEntry, MemberDecl};
use crate::error::InputError;
use crate::types;
use crate::version::OFVersion;
use std::collections::{BTreeSet, HashSet};

/// Validated declarations of one input file and the versions they apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OFInput {
    pub filename: String,
    pub versions: BTreeSet<OFVersion>,
    pub declarations: Vec<OFDecl>,
}

impl OFInput {
    pub fn applies_to(&self, version: OFVersion) -> bool {
        self.versions.contains(&version)
    }

    pub fn wire_versions(&self) -> BTreeSet<u32> {
        self.versions.iter().map(|v| v.wire_version()).collect()
    }

    pub fn classes(&self) -> impl Iterator<Item = &OFClassDecl> {
        self.declarations.iter().filter_map(|d| match d {
            OFDecl::Class(c) => Some(c),
            OFDecl::Enum(_) => None,
        })
    }

    pub fn enums(&self) -> impl Iterator<Item = &OFEnumDecl> {
        self.declarations.iter().filter_map(|d| match d {
            OFDecl::Enum(e) => Some(e),
            OFDecl::Class(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OFDecl {
    Class(OFClassDecl),
    Enum(OFEnumDecl),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OFClassDecl {
    pub name: String,
    pub superclass: Option<String>,
    pub members: Vec<MemberDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OFEnumDecl {
    pub name: String,
    pub params: EnumParams,
    pub entries: Vec<EnumEntry>,
}

/// Recognized `enum name(...)` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumParams {
    pub wire_type: Option<String>,
    pub bitmask: bool,
    pub complete: bool,
}

/// Build the [`OFInput`] for one parsed file. Consumes the AST.
pub fn create_ofinput(filename: &str, file: ast::File) -> Result<OFInput, InputError> {
    let versions = resolve_versions(&file.header)?;

    let mut seen = HashSet::new();
    for decl in &file.declarations {
        if !seen.insert(decl.name().to_string()) {
            return Err(InputError::DuplicateDeclaration {
                name: decl.name().to_string(),
                line: decl.line(),
            });
        }
    }

    let mut declarations = Vec::with_capacity(file.declarations.len());
    for decl in file.declarations {
        declarations.push(match decl {
            ast::Declaration::Struct(s) => OFDecl::Class(check_struct(s, &seen)?),
            ast::Declaration::Enum(e) => OFDecl::Enum(check_enum(e)?),
        });
    }

    Ok(OFInput {
        filename: filename.to_string(),
        versions,
        declarations,
    })
}

fn resolve_versions(header: &ast::Header) -> Result<BTreeSet<OFVersion>, InputError> {
    if header.version_tokens.is_empty() || header.wire_versions.is_empty() {
        return Err(InputError::EmptyHeader);
    }
    if header.version_tokens.len() != header.wire_versions.len() {
        return Err(InputError::HeaderArity {
            tokens: header.version_tokens.len(),
            wires: header.wire_versions.len(),
        });
    }
    let mut versions = BTreeSet::new();
    for (token, &wire) in header.version_tokens.iter().zip(&header.wire_versions) {
        let version = OFVersion::from_token(token)
            .ok_or_else(|| InputError::UnknownVersion(token.clone()))?;
        if OFVersion::from_wire(wire).is_none() {
            return Err(InputError::UnknownWireVersion(wire));
        }
        if version.wire_version() != wire {
            return Err(InputError::WireMismatch {
                token: token.clone(),
                expected: version.wire_version(),
                found: wire,
            });
        }
        if !versions.insert(version) {
            return Err(InputError::DuplicateVersion(token.clone()));
        }
    }
    Ok(versions)
}

fn check_struct(s: ast::StructDecl, declared: &HashSet<String>) -> Result<OFClassDecl, InputError> {
    if s.superclass.as_deref() == Some(s.name.as_str()) {
        return Err(InputError::SelfSuperclass { class: s.name });
    }

    let mut names = HashSet::new();
    let mut discriminators = 0;
    for m in &s.members {
        if let Some(name) = m.name() {
            if !names.insert(name) {
                return Err(InputError::DuplicateMember {
                    class: s.name.clone(),
                    member: name.to_string(),
                });
            }
        }
        if let Some(ty) = m.type_ref() {
            if ty.array_len == Some(0) {
                return Err(InputError::ZeroArray {
                    class: s.name.clone(),
                    member: m.name().unwrap_or_default().to_string(),
                });
            }
        }
        match m {
            MemberDecl::Pad { length: 0 } => {
                return Err(InputError::ZeroPad { class: s.name.clone() });
            }
            MemberDecl::Discriminator { .. } => discriminators += 1,
            MemberDecl::List { element, name } => {
                if !types::is_primitive(&element.name) && !declared.contains(&element.name) {
                    return Err(InputError::UndeclaredListElement {
                        class: s.name.clone(),
                        member: name.clone(),
                        ty: element.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
    if discriminators > 1 {
        return Err(InputError::MultipleDiscriminators { class: s.name });
    }

    Ok(OFClassDecl {
        name: s.name,
        superclass: s.superclass,
        members: s.members,
    })
}

fn check_enum(e: ast::EnumDecl) -> Result<OFEnumDecl, InputError> {
    let mut names = HashSet::new();
    for entry in &e.entries {
        if !names.insert(entry.name.as_str()) {
            return Err(InputError::DuplicateEnumEntry {
                enum_name: e.name.clone(),
                entry: entry.name.clone(),
            });
        }
    }

    let mut params = EnumParams::default();
    for (key, value) in &e.params {
        let invalid = || InputError::InvalidEnumParam {
            enum_name: e.name.clone(),
            param: key.clone(),
            value: value.clone(),
        };
        match key.as_str() {
            "wire_type" => params.wire_type = Some(value.clone()),
            "bitmask" => params.bitmask = parse_flag(value).ok_or_else(invalid)?,
            "complete" => params.complete = parse_flag(value).ok_or_else(invalid)?,
            _ => {
                return Err(InputError::UnknownEnumParam {
                    enum_name: e.name.clone(),
                    param: key.clone(),
                })
            }
        }
    }

    Ok(OFEnumDecl {
        name: e.name,
        params,
        entries: e.entries,
    })
}

fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "True" | "true" => Some(true),
        "False" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn input(src: &str) -> Result<OFInput, InputError> {
        create_ofinput("test", parse(src).expect("parse"))
    }

    #[test]
    fn multi_version_header() {
        let i = input("1.0, 1.3\n1, 4\nstruct a { uint8_t x; };\n").expect("input");
        assert!(i.applies_to(OFVersion::V1_0));
        assert!(i.applies_to(OFVersion::V1_3));
        assert!(!i.applies_to(OFVersion::V1_2));
        assert_eq!(i.wire_versions().into_iter().collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn wire_mismatch() {
        let err = input("1.3\n1\n").unwrap_err();
        assert!(matches!(err, InputError::WireMismatch { expected: 4, found: 1, .. }));
    }

    #[test]
    fn unknown_token() {
        assert_eq!(input("banana\n1\n").unwrap_err(), InputError::UnknownVersion("banana".into()));
    }

    #[test]
    fn duplicate_member() {
        let err = input("1.0\n1\nstruct a { uint8_t x; uint16_t x; };\n").unwrap_err();
        assert!(matches!(err, InputError::DuplicateMember { .. }));
    }

    #[test]
    fn list_of_undeclared_type() {
        let err = input("1.0\n1\nstruct a { list(of_nothing) xs; };\n").unwrap_err();
        assert!(matches!(err, InputError::UndeclaredListElement { .. }));
    }

    #[test]
    fn enum_params() {
        let i = input("1.0\n1\nenum e(wire_type=uint16_t, bitmask=True) { A = 1 };\n").expect("input");
        let e = i.enums().next().expect("enum");
        assert_eq!(e.params.wire_type.as_deref(), Some("uint16_t"));
        assert!(e.params.bitmask);
        assert!(!e.params.complete);
    }

    #[test]
    fn unknown_enum_param() {
        let err = input("1.0\n1\nenum e(colour=blue) { A = 1 };\n").unwrap_err();
        assert!(matches!(err, InputError::UnknownEnumParam { .. }));
    }
}
