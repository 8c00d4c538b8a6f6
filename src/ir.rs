//! Per-version protocol model.
//!
//! [`build_protocol`] merges every [`OFInput`] that applies to one version into an
//! [`OFProtocol`]: classes with their members in wire order, enums, and the list
//! classes implied by `list(T)` members. Every type reference is resolved here.

use crate::ast::{MemberDecl, TypeRef};
use crate::error::ModelError;
use crate::frontend::{OFClassDecl, OFEnumDecl, OFInput};
use crate::types::{self, Primitive};
use crate::version::OFVersion;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Largest pad or array a member may declare, in bytes. OpenFlow lengths are 16-bit.
pub const MAX_MEMBER_SIZE: u64 = 0xffff;

/// Complete model of one protocol version. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OFProtocol {
    pub version: OFVersion,
    pub classes: BTreeMap<String, Arc<OFClass>>,
    pub enums: BTreeMap<String, Arc<OFEnum>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OFClass {
    pub name: String,
    pub superclass: Option<String>,
    /// Members in wire order.
    pub members: Vec<OFMember>,
    pub kind: ClassKind,
    /// Has a discriminator member; instances are always of a subclass.
    pub is_virtual: bool,
    /// Contains list or variable-width content, directly or through an included class.
    pub needs_length_prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassKind {
    Struct,
    /// Repeated-element container synthesized for `list(T)`.
    List { element: OFType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OFMember {
    Data { name: String, ty: OFType },
    Pad { length: usize },
    /// Total encoded length of the instance.
    Length { name: String, ty: OFType },
    /// Encoded length of the member named `field`.
    FieldLength { name: String, ty: OFType, field: String },
    /// Constant value, pins a discriminator in subclasses.
    Type { name: String, ty: OFType, value: u64 },
    Discriminator { name: String, ty: OFType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OFType {
    Primitive { name: String, prim: Primitive },
    /// Fixed-size array of a fixed-width primitive.
    Array { element: String, prim: Primitive, len: usize },
    Class(String),
    Enum { name: String, wire: Primitive },
    /// Repeated elements; `class` is the synthesized list class.
    List { element: Box<OFType>, class: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OFEnum {
    pub name: String,
    pub wire_type: String,
    pub bitmask: bool,
    pub complete: bool,
    pub entries: Vec<OFEnumEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OFEnumEntry {
    pub name: String,
    pub value: u64,
}

impl OFProtocol {
    pub fn class(&self, name: &str) -> Option<&OFClass> {
        self.classes.get(name).map(Arc::as_ref)
    }

    pub fn enum_(&self, name: &str) -> Option<&OFEnum> {
        self.enums.get(name).map(Arc::as_ref)
    }

    /// Classes whose superclass chain includes `name`.
    pub fn descendants(&self, name: &str) -> Vec<&OFClass> {
        self.classes
            .values()
            .filter(|c| self.is_descendant(&c.name, name))
            .map(Arc::as_ref)
            .collect()
    }

    /// True if `class` is `ancestor` or inherits from it.
    pub fn is_descendant(&self, class: &str, ancestor: &str) -> bool {
        self.ancestry_depth(class, ancestor).is_some()
    }

    /// Number of superclass steps from `class` up to `ancestor`.
    pub fn ancestry_depth(&self, class: &str, ancestor: &str) -> Option<usize> {
        let mut current = Some(class);
        let mut depth = 0;
        while let Some(name) = current {
            if name == ancestor {
                return Some(depth);
            }
            depth += 1;
            if depth > self.classes.len() {
                return None;
            }
            current = self.class(name).and_then(|c| c.superclass.as_deref());
        }
        None
    }

    /// Wire width of a type, `None` if it is variable.
    pub fn width_of(&self, ty: &OFType) -> Option<usize> {
        match ty {
            OFType::Primitive { prim, .. } | OFType::Enum { wire: prim, .. } => prim.width(),
            OFType::Array { prim, len, .. } => prim.width().and_then(|w| w.checked_mul(*len)),
            // A virtual class stands for any of its subclasses.
            OFType::Class(name) => self
                .class(name)
                .filter(|c| !c.is_virtual)
                .and_then(|c| self.fixed_size(c)),
            OFType::List { .. } => None,
        }
    }

    /// Encoded size of a class when it does not depend on the instance.
    pub fn fixed_size(&self, class: &OFClass) -> Option<usize> {
        if class.needs_length_prefix || class.is_list() {
            return None;
        }
        class
            .members
            .iter()
            .try_fold(0usize, |size, m| size.checked_add(self.member_width(m)?))
    }

    pub fn member_width(&self, member: &OFMember) -> Option<usize> {
        match member {
            OFMember::Pad { length } => Some(*length),
            other => other.ty().and_then(|ty| self.width_of(ty)),
        }
    }

    /// Byte offset of each member; `None` once a variable-width member has been passed.
    pub fn offsets(&self, class: &OFClass) -> Vec<Option<usize>> {
        let mut out = Vec::with_capacity(class.members.len());
        let mut offset = Some(0usize);
        for m in &class.members {
            out.push(offset);
            offset = match (offset, self.member_width(m)) {
                (Some(o), Some(w)) => o.checked_add(w),
                _ => None,
            };
        }
        out
    }
}

impl OFClass {
    pub fn members(&self) -> &[OFMember] {
        &self.members
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, ClassKind::List { .. })
    }

    pub fn element_type(&self) -> Option<&OFType> {
        match &self.kind {
            ClassKind::List { element } => Some(element),
            ClassKind::Struct => None,
        }
    }

    pub fn needs_length_prefix(&self) -> bool {
        self.needs_length_prefix
    }

    pub fn length_member(&self) -> Option<&OFMember> {
        self.members.iter().find(|m| matches!(m, OFMember::Length { .. }))
    }

    pub fn has_length_member(&self) -> bool {
        self.length_member().is_some()
    }

    pub fn discriminator(&self) -> Option<&OFMember> {
        self.members.iter().find(|m| matches!(m, OFMember::Discriminator { .. }))
    }

    pub fn member(&self, name: &str) -> Option<&OFMember> {
        self.members.iter().find(|m| m.name() == Some(name))
    }

    /// Names of the members an instance supplies values for.
    pub fn data_members(&self) -> impl Iterator<Item = (&str, &OFType)> {
        self.members.iter().filter_map(|m| match m {
            OFMember::Data { name, ty } => Some((name.as_str(), ty)),
            _ => None,
        })
    }
}

impl OFMember {
    pub fn name(&self) -> Option<&str> {
        match self {
            OFMember::Data { name, .. }
            | OFMember::Length { name, .. }
            | OFMember::FieldLength { name, .. }
            | OFMember::Type { name, .. }
            | OFMember::Discriminator { name, .. } => Some(name),
            OFMember::Pad { .. } => None,
        }
    }

    pub fn ty(&self) -> Option<&OFType> {
        match self {
            OFMember::Data { ty, .. }
            | OFMember::Length { ty, .. }
            | OFMember::FieldLength { ty, .. }
            | OFMember::Type { ty, .. }
            | OFMember::Discriminator { ty, .. } => Some(ty),
            OFMember::Pad { .. } => None,
        }
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self.ty(), Some(OFType::List { .. }))
    }
}

impl OFType {
    /// Integer width if values of this type are integers.
    pub fn int_width(&self) -> Option<usize> {
        match self {
            OFType::Primitive { prim: Primitive::Int(w), .. }
            | OFType::Enum { wire: Primitive::Int(w), .. } => Some(*w),
            _ => None,
        }
    }

    /// Names of classes and enums this type refers to.
    pub fn references(&self) -> Vec<&str> {
        match self {
            OFType::Class(name) => vec![name.as_str()],
            OFType::Enum { name, .. } => vec![name.as_str()],
            OFType::List { element, class } => {
                let mut out = element.references();
                out.push(class.as_str());
                out
            }
            OFType::Primitive { .. } | OFType::Array { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for OFType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OFType::Primitive { name, .. } | OFType::Class(name) | OFType::Enum { name, .. } => {
                f.write_str(name)
            }
            OFType::Array { element, len, .. } => write!(f, "{}[{}]", element, len),
            OFType::List { element, .. } => write!(f, "list({})", element),
        }
    }
}

/// Build the model of `version` from every input that applies to it.
pub fn build_protocol(version: OFVersion, inputs: &[&OFInput]) -> Result<OFProtocol, ModelError> {
    let mut class_decls: BTreeMap<&str, (&OFClassDecl, &str)> = BTreeMap::new();
    let mut enum_decls: BTreeMap<&str, (&OFEnumDecl, &str)> = BTreeMap::new();

    for input in inputs {
        for c in input.classes() {
            if let Some((prev, file)) = class_decls.get(c.name.as_str()) {
                if *prev != c {
                    return Err(ModelError::ConflictingClass {
                        name: c.name.clone(),
                        first: file.to_string(),
                        second: input.filename.clone(),
                    });
                }
                continue;
            }
            class_decls.insert(c.name.as_str(), (c, input.filename.as_str()));
        }
        for e in input.enums() {
            if let Some((prev, file)) = enum_decls.get(e.name.as_str()) {
                if *prev != e {
                    return Err(ModelError::ConflictingEnum {
                        name: e.name.clone(),
                        first: file.to_string(),
                        second: input.filename.clone(),
                    });
                }
                continue;
            }
            enum_decls.insert(e.name.as_str(), (e, input.filename.as_str()));
        }
    }

    if let Some(name) = class_decls.keys().find(|n| enum_decls.contains_key(*n)) {
        return Err(ModelError::ClassEnumClash(name.to_string()));
    }

    let mut enums = BTreeMap::new();
    for (name, (decl, _)) in &enum_decls {
        enums.insert(name.to_string(), Arc::new(build_enum(version, decl)?));
    }

    let builder = ClassBuilder {
        version,
        classes: &class_decls,
        enums: &enums,
    };

    let mut resolved: BTreeMap<String, (Option<String>, Vec<OFMember>)> = BTreeMap::new();
    let mut list_elements: BTreeMap<String, OFType> = BTreeMap::new();
    for (name, (decl, _)) in &class_decls {
        builder.check_superclass(decl)?;
        let members = builder.resolve_members(decl)?;
        for m in &members {
            if let Some(OFType::List { element, class }) = m.ty() {
                list_elements.insert(class.clone(), element.as_ref().clone());
            }
        }
        resolved.insert(name.to_string(), (decl.superclass.clone(), members));
    }

    if let Some(name) = list_elements.keys().find(|n| resolved.contains_key(*n)) {
        return Err(ModelError::ListClassClash(name.clone()));
    }

    if let Some(class) = containment_cycle(&resolved) {
        return Err(ModelError::ContainmentCycle { class });
    }
    let variable = variable_classes(&resolved);

    let mut classes = BTreeMap::new();
    for (name, (superclass, members)) in resolved {
        let is_virtual = has_discriminator(&members);
        let needs_length_prefix = variable.contains(&name);
        classes.insert(
            name.clone(),
            Arc::new(OFClass {
                name,
                superclass,
                members,
                kind: ClassKind::Struct,
                is_virtual,
                needs_length_prefix,
            }),
        );
    }
    for (name, element) in list_elements {
        tracing::trace!(version = %version, class = %name, "synthesized list class");
        classes.insert(
            name.clone(),
            Arc::new(OFClass {
                name,
                superclass: None,
                members: Vec::new(),
                kind: ClassKind::List { element },
                is_virtual: false,
                needs_length_prefix: true,
            }),
        );
    }

    tracing::debug!(
        version = %version,
        classes = classes.len(),
        enums = enums.len(),
        "built protocol model"
    );
    Ok(OFProtocol {
        version,
        classes,
        enums,
    })
}

fn build_enum(version: OFVersion, decl: &OFEnumDecl) -> Result<OFEnum, ModelError> {
    let wire_type = decl.params.wire_type.clone().unwrap_or_else(|| "uint32_t".to_string());
    let width = match types::primitive(&wire_type, version) {
        Some(Primitive::Int(w)) => w,
        _ => {
            return Err(ModelError::InvalidEnumWireType {
                enum_name: decl.name.clone(),
                ty: wire_type,
            })
        }
    };
    for entry in &decl.entries {
        if !fits(entry.value, width) {
            return Err(ModelError::EnumValueOverflow {
                enum_name: decl.name.clone(),
                entry: entry.name.clone(),
                value: entry.value,
                ty: wire_type,
            });
        }
    }
    Ok(OFEnum {
        name: decl.name.clone(),
        wire_type,
        bitmask: decl.params.bitmask,
        complete: decl.params.complete,
        entries: decl
            .entries
            .iter()
            .map(|e| OFEnumEntry {
                name: e.name.clone(),
                value: e.value,
            })
            .collect(),
    })
}

fn fits(value: u64, width: usize) -> bool {
    width >= 8 || value < (1u64 << (width * 8))
}

struct ClassBuilder<'a> {
    version: OFVersion,
    classes: &'a BTreeMap<&'a str, (&'a OFClassDecl, &'a str)>,
    enums: &'a BTreeMap<String, Arc<OFEnum>>,
}

impl ClassBuilder<'_> {
    fn check_superclass(&self, decl: &OFClassDecl) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        seen.insert(decl.name.as_str());
        let mut current = decl;
        while let Some(sup) = current.superclass.as_deref() {
            let (next, _) = *self.classes.get(sup).ok_or_else(|| ModelError::UnresolvedSuperclass {
                class: current.name.clone(),
                superclass: sup.to_string(),
            })?;
            if !seen.insert(sup) {
                return Err(ModelError::SuperclassCycle {
                    class: decl.name.clone(),
                });
            }
            current = next;
        }
        Ok(())
    }

    fn resolve_members(&self, decl: &OFClassDecl) -> Result<Vec<OFMember>, ModelError> {
        let mut members = Vec::with_capacity(decl.members.len());
        for (i, m) in decl.members.iter().enumerate() {
            let member = match m {
                MemberDecl::Pad { length } => OFMember::Pad {
                    length: member_size(decl, "pad", Some(*length))?,
                },
                MemberDecl::Data { ty, name } => {
                    let ty = self.resolve_type(decl, name, ty)?;
                    self.classify_data(decl, i, name, ty)
                }
                MemberDecl::List { element, name } => {
                    let element_ty = self.resolve_list_element(decl, name, element)?;
                    OFMember::Data {
                        name: name.clone(),
                        ty: OFType::List {
                            element: Box::new(element_ty),
                            class: types::list_class_name(&element.name),
                        },
                    }
                }
                MemberDecl::Fixed { ty, name, value } => {
                    let ty = self.resolve_integer(decl, name, ty)?;
                    let width = ty.int_width().unwrap_or(8);
                    if !fits(*value, width) {
                        return Err(ModelError::ValueOverflow {
                            class: decl.name.clone(),
                            member: name.clone(),
                            value: *value,
                            width,
                        });
                    }
                    OFMember::Type {
                        name: name.clone(),
                        ty,
                        value: *value,
                    }
                }
                MemberDecl::Discriminator { ty, name } => OFMember::Discriminator {
                    name: name.clone(),
                    ty: self.resolve_integer(decl, name, ty)?,
                },
            };
            members.push(member);
        }
        Ok(members)
    }

    /// Length and field-length members are recognized by name.
    fn classify_data(&self, decl: &OFClassDecl, index: usize, name: &str, ty: OFType) -> OFMember {
        let is_int = matches!(ty, OFType::Primitive { prim: Primitive::Int(_), .. });
        if is_int && (name == "length" || name == "len") {
            return OFMember::Length {
                name: name.to_string(),
                ty,
            };
        }
        if is_int {
            let field = name
                .strip_suffix("_length")
                .or_else(|| name.strip_suffix("_len"))
                .filter(|f| decl.members[index + 1..].iter().any(|m| m.name() == Some(*f)));
            if let Some(field) = field {
                return OFMember::FieldLength {
                    name: name.to_string(),
                    ty,
                    field: field.to_string(),
                };
            }
        }
        OFMember::Data {
            name: name.to_string(),
            ty,
        }
    }

    fn resolve_type(&self, decl: &OFClassDecl, member: &str, ty: &TypeRef) -> Result<OFType, ModelError> {
        if let Some(len) = ty.array_len {
            return match types::primitive(&ty.name, self.version) {
                Some(prim) if prim.width().is_some() => {
                    let bytes = prim.width().and_then(|w| len.checked_mul(w as u64));
                    member_size(decl, member, bytes)?;
                    Ok(OFType::Array {
                        element: ty.name.clone(),
                        prim,
                        len: member_size(decl, member, Some(len))?,
                    })
                }
                _ => Err(ModelError::InvalidArrayElement {
                    class: decl.name.clone(),
                    member: member.to_string(),
                    ty: ty.name.clone(),
                }),
            };
        }
        if let Some(prim) = types::primitive(&ty.name, self.version) {
            return Ok(OFType::Primitive {
                name: ty.name.clone(),
                prim,
            });
        }
        if self.classes.contains_key(ty.name.as_str()) {
            return Ok(OFType::Class(ty.name.clone()));
        }
        if let Some(e) = self.enums.get(&ty.name) {
            let wire = types::primitive(&e.wire_type, self.version).unwrap_or(Primitive::Int(4));
            return Ok(OFType::Enum {
                name: ty.name.clone(),
                wire,
            });
        }
        Err(ModelError::UnresolvedType {
            class: decl.name.clone(),
            member: member.to_string(),
            ty: ty.to_string(),
        })
    }

    fn resolve_list_element(
        &self,
        decl: &OFClassDecl,
        member: &str,
        element: &TypeRef,
    ) -> Result<OFType, ModelError> {
        let invalid = || ModelError::InvalidListElement {
            class: decl.name.clone(),
            member: member.to_string(),
            ty: element.to_string(),
        };
        if element.array_len.is_some() {
            return Err(invalid());
        }
        if let Some(prim) = types::primitive(&element.name, self.version) {
            return match prim.width() {
                Some(_) => Ok(OFType::Primitive {
                    name: element.name.clone(),
                    prim,
                }),
                None => Err(invalid()),
            };
        }
        if self.classes.contains_key(element.name.as_str()) {
            return Ok(OFType::Class(element.name.clone()));
        }
        if self.enums.contains_key(&element.name) {
            return Err(invalid());
        }
        Err(ModelError::UnresolvedListElement {
            class: decl.name.clone(),
            member: member.to_string(),
            ty: element.to_string(),
        })
    }

    fn resolve_integer(&self, decl: &OFClassDecl, member: &str, ty: &TypeRef) -> Result<OFType, ModelError> {
        let resolved = self.resolve_type(decl, member, ty)?;
        if resolved.int_width().is_none() {
            return Err(ModelError::NonIntegerValueMember {
                class: decl.name.clone(),
                member: member.to_string(),
                ty: ty.to_string(),
            });
        }
        Ok(resolved)
    }
}

fn member_size(decl: &OFClassDecl, member: &str, size: Option<u64>) -> Result<usize, ModelError> {
    match size {
        Some(n) if n <= MAX_MEMBER_SIZE => Ok(n as usize),
        _ => Err(ModelError::OversizedMember {
            class: decl.name.clone(),
            member: member.to_string(),
        }),
    }
}

fn has_discriminator(members: &[OFMember]) -> bool {
    members.iter().any(|m| matches!(m, OFMember::Discriminator { .. }))
}

/// A class that includes itself by value, directly or through other class-typed
/// members. Lists break the chain.
fn containment_cycle(classes: &BTreeMap<String, (Option<String>, Vec<OFMember>)>) -> Option<String> {
    fn visit<'a>(
        name: &'a str,
        classes: &'a BTreeMap<String, (Option<String>, Vec<OFMember>)>,
        done: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) -> Option<&'a str> {
        if done.contains(name) {
            return None;
        }
        if stack.contains(&name) {
            return Some(name);
        }
        let (_, members) = classes.get(name)?;
        stack.push(name);
        for m in members {
            if let Some(OFType::Class(c)) = m.ty() {
                if let Some(found) = visit(c, classes, done, stack) {
                    return Some(found);
                }
            }
        }
        stack.pop();
        done.insert(name);
        None
    }

    let mut done = HashSet::new();
    let mut stack = Vec::new();
    classes
        .keys()
        .find_map(|name| visit(name, classes, &mut done, &mut stack))
        .map(str::to_string)
}

/// Names of classes holding list or variable-width content, directly or through an
/// included class. A member typed as a virtual class is variable, since any subclass
/// may stand in for it. Recursion through a class already on the stack adds nothing.
fn variable_classes(classes: &BTreeMap<String, (Option<String>, Vec<OFMember>)>) -> HashSet<String> {
    fn visit<'a>(
        name: &'a str,
        classes: &'a BTreeMap<String, (Option<String>, Vec<OFMember>)>,
        memo: &mut HashMap<&'a str, bool>,
        stack: &mut HashSet<&'a str>,
    ) -> bool {
        if let Some(&v) = memo.get(name) {
            return v;
        }
        let Some((_, members)) = classes.get(name) else {
            return false;
        };
        if !stack.insert(name) {
            return false;
        }
        let mut variable = false;
        for m in members {
            variable |= match m.ty() {
                Some(OFType::List { .. }) => true,
                Some(OFType::Primitive { prim, .. }) => prim.width().is_none(),
                Some(OFType::Class(c)) => match classes.get(c.as_str()) {
                    Some((_, inner)) if has_discriminator(inner) => true,
                    _ => visit(c, classes, memo, stack),
                },
                _ => false,
            };
        }
        stack.remove(name);
        memo.insert(name, variable);
        variable
    }

    let mut memo = HashMap::new();
    let mut stack = HashSet::new();
    let mut out = HashSet::new();
    for name in classes.keys() {
        if visit(name, classes, &mut memo, &mut stack) {
            out.insert(name.clone());
        }
    }
    out
}
