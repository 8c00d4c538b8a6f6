//! Cross-version view of the per-version models.
//!
//! Entities are matched by name only. Each [`UnifiedEntity`] keeps an `Arc` to the
//! definition of every version that has one; member lists are never merged, so a
//! backend sees exactly the layout each version declared.

use crate::error::UnificationError;
use crate::ir::{OFClass, OFEnum, OFProtocol};
use crate::version::OFVersion;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-version definitions of one named entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub name: String,
    pub by_version: BTreeMap<OFVersion, Arc<T>>,
}

impl<T: PartialEq> Versioned<T> {
    fn new(name: &str) -> Self {
        Versioned {
            name: name.to_string(),
            by_version: BTreeMap::new(),
        }
    }

    pub fn versions(&self) -> impl Iterator<Item = OFVersion> + '_ {
        self.by_version.keys().copied()
    }

    pub fn get(&self, version: OFVersion) -> Option<&T> {
        self.by_version.get(&version).map(Arc::as_ref)
    }

    pub fn is_defined_in(&self, version: OFVersion) -> bool {
        self.by_version.contains_key(&version)
    }

    /// True if every defining version has an identical definition.
    pub fn is_uniform(&self) -> bool {
        let mut defs = self.by_version.values();
        match defs.next() {
            Some(first) => defs.all(|d| d == first),
            None => true,
        }
    }
}

pub type UnifiedClass = Versioned<OFClass>;
pub type UnifiedEnum = Versioned<OFEnum>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnifiedEntity {
    Class(UnifiedClass),
    Enum(UnifiedEnum),
}

impl UnifiedEntity {
    pub fn name(&self) -> &str {
        match self {
            UnifiedEntity::Class(c) => &c.name,
            UnifiedEntity::Enum(e) => &e.name,
        }
    }

    pub fn versions(&self) -> Vec<OFVersion> {
        match self {
            UnifiedEntity::Class(c) => c.versions().collect(),
            UnifiedEntity::Enum(e) => e.versions().collect(),
        }
    }

    pub fn as_class(&self) -> Option<&UnifiedClass> {
        match self {
            UnifiedEntity::Class(c) => Some(c),
            UnifiedEntity::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&UnifiedEnum> {
        match self {
            UnifiedEntity::Enum(e) => Some(e),
            UnifiedEntity::Class(_) => None,
        }
    }
}

/// The single schema handed to generator backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedModel {
    protocols: BTreeMap<OFVersion, Arc<OFProtocol>>,
    entities: BTreeMap<String, UnifiedEntity>,
}

impl UnifiedModel {
    /// Versions that were built, in ascending order.
    pub fn versions(&self) -> impl Iterator<Item = OFVersion> + '_ {
        self.protocols.keys().copied()
    }

    pub fn protocol(&self, version: OFVersion) -> Option<&OFProtocol> {
        self.protocols.get(&version).map(Arc::as_ref)
    }

    /// Entity names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn entity(&self, name: &str) -> Option<&UnifiedEntity> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &UnifiedEntity> {
        self.entities.values()
    }

    pub fn classes(&self) -> impl Iterator<Item = &UnifiedClass> {
        self.entities.values().filter_map(UnifiedEntity::as_class)
    }

    pub fn enums(&self) -> impl Iterator<Item = &UnifiedEnum> {
        self.entities.values().filter_map(UnifiedEntity::as_enum)
    }

    /// Definition of class `name` in `version`, if that version has one.
    pub fn class(&self, name: &str, version: OFVersion) -> Option<&OFClass> {
        self.entity(name)?.as_class()?.get(version)
    }

    pub fn enum_(&self, name: &str, version: OFVersion) -> Option<&OFEnum> {
        self.entity(name)?.as_enum()?.get(version)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Unify all per-version models into one [`UnifiedModel`].
pub fn build_unified_ir(
    protocols: &BTreeMap<OFVersion, Arc<OFProtocol>>,
) -> Result<UnifiedModel, UnificationError> {
    for (&key, protocol) in protocols {
        if protocol.version != key {
            return Err(UnificationError::VersionKeyMismatch {
                key,
                found: protocol.version,
            });
        }
        check_references(protocol)?;
    }

    let mut entities: BTreeMap<String, UnifiedEntity> = BTreeMap::new();
    for (&version, protocol) in protocols {
        for (name, class) in &protocol.classes {
            let entity = entities
                .entry(name.clone())
                .or_insert_with(|| UnifiedEntity::Class(Versioned::new(name)));
            match entity {
                UnifiedEntity::Class(c) => {
                    c.by_version.insert(version, Arc::clone(class));
                }
                UnifiedEntity::Enum(e) => {
                    return Err(UnificationError::KindConflict {
                        name: name.clone(),
                        class_version: version,
                        enum_version: e.versions().next().unwrap_or(version),
                    })
                }
            }
        }
        for (name, en) in &protocol.enums {
            let entity = entities
                .entry(name.clone())
                .or_insert_with(|| UnifiedEntity::Enum(Versioned::new(name)));
            match entity {
                UnifiedEntity::Enum(e) => {
                    e.by_version.insert(version, Arc::clone(en));
                }
                UnifiedEntity::Class(c) => {
                    return Err(UnificationError::KindConflict {
                        name: name.clone(),
                        class_version: c.versions().next().unwrap_or(version),
                        enum_version: version,
                    })
                }
            }
        }
    }

    tracing::info!(
        versions = protocols.len(),
        entities = entities.len(),
        "built unified model"
    );
    Ok(UnifiedModel {
        protocols: protocols.clone(),
        entities,
    })
}

fn check_references(protocol: &OFProtocol) -> Result<(), UnificationError> {
    let version = protocol.version;
    let dangling = |entity: &str, referenced: &str| UnificationError::DanglingReference {
        version,
        entity: entity.to_string(),
        referenced: referenced.to_string(),
    };
    let known = |name: &str| protocol.classes.contains_key(name) || protocol.enums.contains_key(name);

    if let Some(name) = protocol.classes.keys().find(|n| protocol.enums.contains_key(*n)) {
        return Err(UnificationError::DuplicateEntity {
            version,
            name: name.clone(),
        });
    }

    for class in protocol.classes.values() {
        if let Some(sup) = &class.superclass {
            if !protocol.classes.contains_key(sup) {
                return Err(dangling(&class.name, sup));
            }
        }
        let element_refs = class.element_type().map(|t| t.references()).unwrap_or_default();
        let member_refs = class.members.iter().filter_map(|m| m.ty()).flat_map(|t| t.references());
        for referenced in element_refs.into_iter().chain(member_refs) {
            if !known(referenced) {
                return Err(dangling(&class.name, referenced));
            }
        }
    }
    Ok(())
}
