//! Plain-text rendering of the models, used by the `dump` backend.

use crate::ir::{OFClass, OFEnum, OFMember, OFProtocol};
use crate::unified::{UnifiedEntity, UnifiedModel};
use std::fmt::Write;

/// One version's model: enums, then classes, each in name order, with member offsets.
pub fn render_protocol(p: &OFProtocol) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# OpenFlow {} (wire version {})",
        p.version,
        p.version.wire_version()
    );
    for e in p.enums.values() {
        out.push('\n');
        render_enum(&mut out, e);
    }
    for c in p.classes.values() {
        out.push('\n');
        render_class(&mut out, p, c);
    }
    out
}

fn render_enum(out: &mut String, e: &OFEnum) {
    let _ = write!(out, "enum {} : {}", e.name, e.wire_type);
    if e.bitmask {
        out.push_str(" bitmask");
    }
    if e.complete {
        out.push_str(" complete");
    }
    out.push('\n');
    for entry in &e.entries {
        let _ = writeln!(out, "    {} = {:#x}", entry.name, entry.value);
    }
}

fn render_class(out: &mut String, p: &OFProtocol, c: &OFClass) {
    if let Some(element) = c.element_type() {
        let _ = writeln!(out, "list {} of {}", c.name, element);
        return;
    }
    let _ = write!(out, "class {}", c.name);
    if let Some(sup) = &c.superclass {
        let _ = write!(out, " : {}", sup);
    }
    if c.is_virtual {
        out.push_str(" virtual");
    }
    if c.needs_length_prefix {
        out.push_str(" length-prefixed");
    }
    out.push('\n');
    for (m, offset) in c.members.iter().zip(p.offsets(c)) {
        match offset {
            Some(o) => {
                let _ = write!(out, "    {:<5}", o);
            }
            None => out.push_str("    ?    "),
        }
        match m {
            OFMember::Pad { length } => {
                let _ = write!(out, "pad({})", length);
            }
            OFMember::Data { name, ty } => {
                let _ = write!(out, "{} {}", ty, name);
            }
            OFMember::Length { name, ty } => {
                let _ = write!(out, "{} {} (length)", ty, name);
            }
            OFMember::FieldLength { name, ty, field } => {
                let _ = write!(out, "{} {} (length of {})", ty, name, field);
            }
            OFMember::Type { name, ty, value } => {
                let _ = write!(out, "{} {} == {:#x}", ty, name, value);
            }
            OFMember::Discriminator { name, ty } => {
                let _ = write!(out, "{} {} == ?", ty, name);
            }
        }
        out.push('\n');
    }
    if let Some(size) = p.fixed_size(c) {
        let _ = writeln!(out, "    size {}", size);
    }
}

/// Every entity with its kind and the versions defining it. Entities whose definition
/// differs between versions are marked `varies`.
pub fn render_unified(model: &UnifiedModel) -> String {
    let mut out = String::new();
    let versions: Vec<String> = model.versions().map(|v| v.to_string()).collect();
    let _ = writeln!(out, "# versions: {}", versions.join(" "));
    for entity in model.entities() {
        let (kind, uniform) = match entity {
            UnifiedEntity::Class(c) => ("class", c.is_uniform()),
            UnifiedEntity::Enum(e) => ("enum", e.is_uniform()),
        };
        let defined: Vec<String> = entity.versions().iter().map(|v| v.to_string()).collect();
        let _ = write!(out, "{} {} [{}]", kind, entity.name(), defined.join(" "));
        if !uniform {
            out.push_str(" varies");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::create_ofinput;
    use crate::ir::build_protocol;
    use crate::parser::parse;
    use crate::version::OFVersion;

    #[test]
    fn offsets_and_size() {
        let input = create_ofinput(
            "t",
            parse("1.0\n1\nstruct of_hello { uint8_t version; uint8_t type == 0; uint16_t length; uint32_t xid; };\n")
                .expect("parse"),
        )
        .expect("input");
        let p = build_protocol(OFVersion::V1_0, &[&input]).expect("protocol");
        let text = render_protocol(&p);
        let expected = "\
# OpenFlow 1.0 (wire version 1)

class of_hello
    0    uint8_t version
    1    uint8_t type == 0x0
    2    uint16_t length (length)
    4    uint32_t xid
    size 8
";
        assert_eq!(text, expected);
    }
}
