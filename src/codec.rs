//! Reference codec: encode/decode class instances straight from a per-version model.
//!
//! All integers are big-endian. On encode, pad bytes are zero, fixed-value members are
//! written from the model, and length / field-length members are computed from what
//! was written. On decode, a length member bounds the instance and a field-length
//! member bounds its field; lists decode elements until their bound is reached.
//! Virtual classes are resolved to the subclass whose fixed value matches the
//! discriminator on the wire.

use crate::ir::{OFClass, OFMember, OFProtocol, OFType};
use crate::types::Primitive;
use crate::value::{Object, Value};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown class: {0}")]
    UnknownClass(String),
    #[error("class {0} is virtual; use one of its subclasses")]
    VirtualClass(String),
    #[error("class {0} is a list class and has no instances of its own")]
    ListClass(String),
    #[error("{class}: missing value for member '{member}'")]
    MissingField { class: String, member: String },
    #[error("{class}.{member}: expected {expected}")]
    TypeMismatch {
        class: String,
        member: String,
        expected: String,
    },
    #[error("{class}.{member}: value {value:#x} does not fit in {width} byte(s)")]
    ValueOverflow {
        class: String,
        member: String,
        value: u64,
        width: usize,
    },
    #[error("{class}.{member}: expected {expected} byte(s), got {found}")]
    WidthMismatch {
        class: String,
        member: String,
        expected: usize,
        found: usize,
    },
    #[error("{class}.{member}: expected {expected:#x}, found {found:#x}")]
    FixedValueMismatch {
        class: String,
        member: String,
        expected: u64,
        found: u64,
    },
    #[error("{class}: no subclass with {member} = {value:#x}")]
    UnknownDiscriminator {
        class: String,
        member: String,
        value: u64,
    },
    #[error("{class}: {needed} byte(s) needed, only {available} left")]
    Truncated {
        class: String,
        needed: usize,
        available: usize,
    },
    #[error("Length/count mismatch: {0}")]
    LengthMismatch(String),
}

/// Codec over one version's model.
#[derive(Debug, Clone, Copy)]
pub struct Codec<'p> {
    protocol: &'p OFProtocol,
}

/// Where a computed integer goes once the rest of the instance is written.
struct Slot<'a> {
    pos: usize,
    width: usize,
    member: &'a str,
    field: Option<&'a str>,
}

impl<'p> Codec<'p> {
    pub fn new(protocol: &'p OFProtocol) -> Self {
        Codec { protocol }
    }

    pub fn protocol(&self) -> &'p OFProtocol {
        self.protocol
    }

    /// Serialize an instance.
    pub fn encode(&self, obj: &Object) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.encode_object(&mut out, obj, None)?;
        Ok(out)
    }

    /// Deserialize one instance of `class` starting at the cursor position.
    pub fn decode(&self, class: &str, r: &mut Cursor<&[u8]>) -> Result<Object, CodecError> {
        let end = r.get_ref().len();
        self.decode_object(r, class, end)
    }

    /// Deserialize one instance that must span all of `bytes`.
    pub fn decode_bytes(&self, class: &str, bytes: &[u8]) -> Result<Object, CodecError> {
        let mut r = Cursor::new(bytes);
        let obj = self.decode(class, &mut r)?;
        let consumed = r.position() as usize;
        if consumed != bytes.len() {
            return Err(CodecError::LengthMismatch(format!(
                "{}: decoded {} of {} byte(s)",
                class,
                consumed,
                bytes.len()
            )));
        }
        Ok(obj)
    }

    fn class(&self, name: &str) -> Result<&'p OFClass, CodecError> {
        self.protocol
            .class(name)
            .ok_or_else(|| CodecError::UnknownClass(name.to_string()))
    }

    fn encode_object(&self, w: &mut Vec<u8>, obj: &Object, expected: Option<&str>) -> Result<(), CodecError> {
        let class = self.class(&obj.class)?;
        if class.is_virtual {
            return Err(CodecError::VirtualClass(class.name.clone()));
        }
        if class.is_list() {
            return Err(CodecError::ListClass(class.name.clone()));
        }
        if let Some(base) = expected {
            if !self.protocol.is_descendant(&class.name, base) {
                return Err(CodecError::TypeMismatch {
                    class: obj.class.clone(),
                    member: String::new(),
                    expected: format!("an instance of {}", base),
                });
            }
        }

        let start = w.len();
        let mut slots: Vec<Slot> = Vec::new();
        let mut spans: HashMap<&str, usize> = HashMap::new();
        for m in &class.members {
            match m {
                OFMember::Pad { length } => w.resize(w.len() + length, 0),
                OFMember::Length { name, ty } | OFMember::FieldLength { name, ty, .. } => {
                    let width = ty.int_width().unwrap_or(0);
                    let field = match m {
                        OFMember::FieldLength { field, .. } => Some(field.as_str()),
                        _ => None,
                    };
                    slots.push(Slot {
                        pos: w.len(),
                        width,
                        member: name,
                        field,
                    });
                    w.resize(w.len() + width, 0);
                }
                OFMember::Type { name, ty, value } => {
                    let width = ty.int_width().unwrap_or(0);
                    write_int(w, &class.name, name, *value, width)?;
                }
                OFMember::Discriminator { .. } => {
                    return Err(CodecError::VirtualClass(class.name.clone()));
                }
                OFMember::Data { name, ty } => {
                    let v = obj.get(name).ok_or_else(|| CodecError::MissingField {
                        class: class.name.clone(),
                        member: name.clone(),
                    })?;
                    let before = w.len();
                    self.encode_value(w, &class.name, name, ty, v)?;
                    spans.insert(name, w.len() - before);
                }
            }
        }

        let total = w.len() - start;
        for slot in slots {
            let value = match slot.field {
                Some(field) => spans.get(field).copied().unwrap_or(0),
                None => total,
            };
            let value = value as u64;
            if !fits(value, slot.width) {
                return Err(CodecError::ValueOverflow {
                    class: class.name.clone(),
                    member: slot.member.to_string(),
                    value,
                    width: slot.width,
                });
            }
            BigEndian::write_uint(&mut w[slot.pos..slot.pos + slot.width], value, slot.width);
        }
        Ok(())
    }

    fn encode_value(
        &self,
        w: &mut Vec<u8>,
        class: &str,
        member: &str,
        ty: &OFType,
        v: &Value,
    ) -> Result<(), CodecError> {
        let mismatch = |expected: &str| CodecError::TypeMismatch {
            class: class.to_string(),
            member: member.to_string(),
            expected: expected.to_string(),
        };
        match ty {
            OFType::Primitive { prim, .. } | OFType::Enum { wire: prim, .. } => {
                encode_primitive(w, class, member, *prim, v)
            }
            OFType::Array { prim, len, .. } => {
                let items = v.as_list().ok_or_else(|| mismatch("a list"))?;
                if items.len() != *len {
                    return Err(CodecError::WidthMismatch {
                        class: class.to_string(),
                        member: member.to_string(),
                        expected: *len,
                        found: items.len(),
                    });
                }
                for item in items {
                    encode_primitive(w, class, member, *prim, item)?;
                }
                Ok(())
            }
            OFType::Class(name) => {
                let obj = v.as_object().ok_or_else(|| mismatch("an object"))?;
                self.encode_object(w, obj, Some(name))
            }
            OFType::List { element, .. } => {
                let items = v.as_list().ok_or_else(|| mismatch("a list"))?;
                for item in items {
                    self.encode_value(w, class, member, element, item)?;
                }
                Ok(())
            }
        }
    }

    fn decode_object(&self, r: &mut Cursor<&[u8]>, name: &str, bound: usize) -> Result<Object, CodecError> {
        let class = self.class(name)?;
        if class.is_list() {
            return Err(CodecError::ListClass(class.name.clone()));
        }
        if class.is_virtual {
            let sub = self.resolve_subclass(r, class, bound)?;
            return self.decode_object(r, &sub.name, bound);
        }

        let start = r.position() as usize;
        let mut end = bound;
        let mut field_bounds: HashMap<&str, usize> = HashMap::new();
        let mut obj = Object::new(class.name.clone());
        for m in &class.members {
            match m {
                OFMember::Pad { length } => {
                    ensure(r, *length, end, &class.name)?;
                    let mut buf = vec![0u8; *length];
                    r.read_exact(&mut buf)?;
                }
                OFMember::Length { ty, .. } => {
                    let total = read_int(r, ty.int_width().unwrap_or(0), end, &class.name)? as usize;
                    let used = r.position() as usize - start;
                    if total < used || start.checked_add(total).map_or(true, |e| e > bound) {
                        return Err(CodecError::LengthMismatch(format!(
                            "{}: length {} out of range ({} available)",
                            class.name,
                            total,
                            bound - start
                        )));
                    }
                    end = start + total;
                }
                OFMember::FieldLength { ty, field, .. } => {
                    let n = read_int(r, ty.int_width().unwrap_or(0), end, &class.name)? as usize;
                    field_bounds.insert(field, n);
                }
                OFMember::Type { name, ty, value } => {
                    let found = read_int(r, ty.int_width().unwrap_or(0), end, &class.name)?;
                    if found != *value {
                        return Err(CodecError::FixedValueMismatch {
                            class: class.name.clone(),
                            member: name.clone(),
                            expected: *value,
                            found,
                        });
                    }
                }
                OFMember::Discriminator { .. } => {
                    return Err(CodecError::VirtualClass(class.name.clone()));
                }
                OFMember::Data { name, ty } => {
                    let pos = r.position() as usize;
                    let member_end = match field_bounds.get(name.as_str()) {
                        Some(&n) => match pos.checked_add(n) {
                            Some(e) if e <= end => e,
                            _ => {
                                return Err(CodecError::LengthMismatch(format!(
                                    "{}.{}: field length {} exceeds instance",
                                    class.name, name, n
                                )))
                            }
                        },
                        None => end,
                    };
                    let v = self.decode_value(r, &class.name, name, ty, member_end)?;
                    if field_bounds.contains_key(name.as_str()) && r.position() as usize != member_end {
                        return Err(CodecError::LengthMismatch(format!(
                            "{}.{}: field length {} but {} byte(s) decoded",
                            class.name,
                            name,
                            member_end - pos,
                            r.position() as usize - pos
                        )));
                    }
                    obj.fields.push((name.clone(), v));
                }
            }
        }

        let pos = r.position() as usize;
        if class.has_length_member() && pos != end {
            return Err(CodecError::LengthMismatch(format!(
                "{}: length {} but members span {}",
                class.name,
                end - start,
                pos - start
            )));
        }
        Ok(obj)
    }

    fn decode_value(
        &self,
        r: &mut Cursor<&[u8]>,
        class: &str,
        member: &str,
        ty: &OFType,
        end: usize,
    ) -> Result<Value, CodecError> {
        match ty {
            OFType::Primitive { prim, .. } | OFType::Enum { wire: prim, .. } => {
                decode_primitive(r, class, *prim, end)
            }
            OFType::Array { prim, len, .. } => {
                let mut items = Vec::with_capacity(*len);
                for _ in 0..*len {
                    items.push(decode_primitive(r, class, *prim, end)?);
                }
                Ok(Value::List(items))
            }
            OFType::Class(name) => Ok(Value::Object(self.decode_object(r, name, end)?)),
            OFType::List { element, .. } => {
                let mut items = Vec::new();
                while (r.position() as usize) < end {
                    let before = r.position();
                    items.push(self.decode_value(r, class, member, element, end)?);
                    if r.position() == before {
                        return Err(CodecError::LengthMismatch(format!(
                            "{}.{}: list element consumed no bytes",
                            class, member
                        )));
                    }
                }
                Ok(Value::List(items))
            }
        }
    }

    /// Pick the subclass of a virtual class from the discriminator on the wire.
    fn resolve_subclass(&self, r: &Cursor<&[u8]>, class: &OFClass, bound: usize) -> Result<&'p OFClass, CodecError> {
        let index = class
            .members
            .iter()
            .position(|m| matches!(m, OFMember::Discriminator { .. }))
            .ok_or_else(|| CodecError::VirtualClass(class.name.clone()))?;
        let (disc_name, width) = match &class.members[index] {
            OFMember::Discriminator { name, ty } => (name.as_str(), ty.int_width().unwrap_or(0)),
            _ => return Err(CodecError::VirtualClass(class.name.clone())),
        };
        let offset = self.protocol.offsets(class)[index].ok_or_else(|| {
            CodecError::LengthMismatch(format!(
                "{}: discriminator '{}' has no fixed offset",
                class.name, disc_name
            ))
        })?;

        let pos = r.position() as usize + offset;
        if pos.checked_add(width).map_or(true, |e| e > bound) {
            return Err(CodecError::Truncated {
                class: class.name.clone(),
                needed: offset.saturating_add(width),
                available: bound.saturating_sub(r.position() as usize),
            });
        }
        let value = BigEndian::read_uint(&r.get_ref()[pos..pos + width], width);

        self.protocol
            .classes
            .values()
            .filter(|c| {
                matches!(c.member(disc_name), Some(OFMember::Type { value: v, .. }) if *v == value)
            })
            .filter_map(|c| {
                let depth = self.protocol.ancestry_depth(&c.name, &class.name)?;
                (depth > 0).then_some((depth, c.as_ref()))
            })
            .min_by_key(|(depth, _)| *depth)
            .map(|(_, c)| c)
            .ok_or_else(|| CodecError::UnknownDiscriminator {
                class: class.name.clone(),
                member: disc_name.to_string(),
                value,
            })
    }
}

fn fits(value: u64, width: usize) -> bool {
    width >= 8 || value < (1u64 << (width * 8))
}

fn write_int(w: &mut Vec<u8>, class: &str, member: &str, value: u64, width: usize) -> Result<(), CodecError> {
    if !fits(value, width) {
        return Err(CodecError::ValueOverflow {
            class: class.to_string(),
            member: member.to_string(),
            value,
            width,
        });
    }
    w.write_uint::<BigEndian>(value, width)?;
    Ok(())
}

fn encode_primitive(w: &mut Vec<u8>, class: &str, member: &str, prim: Primitive, v: &Value) -> Result<(), CodecError> {
    let mismatch = |expected: &str| CodecError::TypeMismatch {
        class: class.to_string(),
        member: member.to_string(),
        expected: expected.to_string(),
    };
    match prim {
        Primitive::Int(width) => {
            let value = v.as_u64().ok_or_else(|| mismatch("an integer"))?;
            write_int(w, class, member, value, width)
        }
        Primitive::Bytes(n) => {
            let bytes = v.as_bytes().ok_or_else(|| mismatch("bytes"))?;
            if bytes.len() != n {
                return Err(CodecError::WidthMismatch {
                    class: class.to_string(),
                    member: member.to_string(),
                    expected: n,
                    found: bytes.len(),
                });
            }
            w.write_all(bytes)?;
            Ok(())
        }
        Primitive::Octets => {
            let bytes = v.as_bytes().ok_or_else(|| mismatch("bytes"))?;
            w.write_all(bytes)?;
            Ok(())
        }
    }
}

fn decode_primitive(r: &mut Cursor<&[u8]>, class: &str, prim: Primitive, end: usize) -> Result<Value, CodecError> {
    match prim {
        Primitive::Int(width) => Ok(Value::int(width, read_int(r, width, end, class)?)),
        Primitive::Bytes(n) => {
            ensure(r, n, end, class)?;
            let mut buf = vec![0u8; n];
            r.read_exact(&mut buf)?;
            Ok(Value::Bytes(buf))
        }
        Primitive::Octets => {
            let n = end.saturating_sub(r.position() as usize);
            let mut buf = vec![0u8; n];
            r.read_exact(&mut buf)?;
            Ok(Value::Bytes(buf))
        }
    }
}

fn ensure(r: &Cursor<&[u8]>, needed: usize, end: usize, class: &str) -> Result<(), CodecError> {
    let available = end.saturating_sub(r.position() as usize);
    if needed > available {
        return Err(CodecError::Truncated {
            class: class.to_string(),
            needed,
            available,
        });
    }
    Ok(())
}

fn read_int(r: &mut Cursor<&[u8]>, width: usize, end: usize, class: &str) -> Result<u64, CodecError> {
    ensure(r, width, end, class)?;
    Ok(r.read_uint::<BigEndian>(width)?)
}
