//! Runtime values for the reference codec.

use std::fmt::Write;

/// A single member value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bytes(Vec<u8>),
    Object(Object),
    List(Vec<Value>),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U8(x) => Some(*x as u64),
            Value::U16(x) => Some(*x as u64),
            Value::U32(x) => Some(*x as u64),
            Value::U64(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Integer of the given wire width.
    pub fn int(width: usize, v: u64) -> Value {
        match width {
            1 => Value::U8(v as u8),
            2 => Value::U16(v as u16),
            4 => Value::U32(v as u32),
            _ => Value::U64(v),
        }
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

/// An instance of a class: its name and the values of its data members in wire order.
///
/// Pad, length, field-length and fixed-value members are derived by the codec and are
/// not stored. Equality is member-wise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub class: String,
    pub fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new(class: impl Into<String>) -> Self {
        Object {
            class: class.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style setter; replaces an existing value of the same name.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Human-readable multi-line rendering.
    pub fn show(&self) -> String {
        let mut out = String::new();
        write_object(&mut out, self, 0);
        out
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),*) => {
        $(impl From<$t> for Value {
            fn from(x: $t) -> Self {
                Value::$variant(x)
            }
        })*
    };
}

value_from!(u8 => U8, u16 => U16, u32 => U32, u64 => U64, Vec<u8> => Bytes, Vec<Value> => List);

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_object(out: &mut String, o: &Object, depth: usize) {
    out.push_str(&o.class);
    out.push_str(" {\n");
    for (name, v) in &o.fields {
        indent(out, depth + 1);
        let _ = write!(out, "{} = ", name);
        write_value(out, v, depth + 1);
        out.push('\n');
    }
    indent(out, depth);
    out.push('}');
}

fn write_value(out: &mut String, v: &Value, depth: usize) {
    match v {
        Value::U8(x) => {
            let _ = write!(out, "{:#x}", x);
        }
        Value::U16(x) => {
            let _ = write!(out, "{:#x}", x);
        }
        Value::U32(x) => {
            let _ = write!(out, "{:#x}", x);
        }
        Value::U64(x) => {
            let _ = write!(out, "{:#x}", x);
        }
        Value::Bytes(b) => {
            out.push('\'');
            for (i, byte) in b.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "{:02x}", byte);
            }
            out.push('\'');
        }
        Value::Object(o) => write_object(out, o, depth),
        Value::List(items) if items.is_empty() => out.push_str("[]"),
        Value::List(items) => {
            out.push_str("[\n");
            for item in items {
                indent(out, depth + 1);
                write_value(out, item, depth + 1);
                out.push('\n');
            }
            indent(out, depth);
            out.push(']');
        }
    }
}
