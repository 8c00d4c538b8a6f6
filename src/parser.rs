//! Parse input file text into an AST using PEST.

use crate::ast::*;
use crate::error::ParseError;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct InputParser;

/// Parse one input file into an AST.
pub fn parse(source: &str) -> Result<File, ParseError> {
    let mut pairs = InputParser::parse(Rule::file, source).map_err(from_pest)?;
    let pair = pairs.next().ok_or_else(|| ParseError::new(1, 1, "empty parse"))?;
    build_file(pair)
}

fn from_pest(e: pest::error::Error<Rule>) -> ParseError {
    let (line, column) = match &e.line_col {
        LineColLocation::Pos(p) => *p,
        LineColLocation::Span(start, _) => *start,
    };
    let e = e.renamed_rules(rule_name);
    ParseError::new(line, column, e.variant.message().into_owned())
}

fn rule_name(rule: &Rule) -> String {
    match rule {
        Rule::headers => "header lines".to_string(),
        Rule::version_header => "version header line".to_string(),
        Rule::version_token => "version token".to_string(),
        Rule::wire_header => "wire protocol number header line".to_string(),
        Rule::wire_number => "wire protocol number".to_string(),
        Rule::struct_decl => "struct declaration".to_string(),
        Rule::enum_decl => "enum declaration".to_string(),
        Rule::pad_member | Rule::list_member | Rule::field_member => "member".to_string(),
        Rule::field_value => "`== value`".to_string(),
        Rule::type_ref => "type".to_string(),
        Rule::array_len => "array length".to_string(),
        Rule::superclass => "superclass".to_string(),
        Rule::enum_params => "enum parameters".to_string(),
        Rule::enum_entry => "enum entry".to_string(),
        Rule::ident => "identifier".to_string(),
        Rule::number => "number".to_string(),
        Rule::EOI => "end of input".to_string(),
        other => format!("{:?}", other),
    }
}

fn error_at(pair: &Pair<Rule>, message: impl Into<String>) -> ParseError {
    let (line, column) = pair.line_col();
    ParseError::new(line, column, message)
}

fn build_file(pair: Pair<Rule>) -> Result<File, ParseError> {
    let mut version_tokens = Vec::new();
    let mut wire_versions = Vec::new();
    let mut declarations = Vec::new();

    let pairs = pair.into_inner().flat_map(|p| match p.as_rule() {
        Rule::headers => p.into_inner().collect::<Vec<_>>(),
        _ => vec![p],
    });
    for inner in pairs {
        match inner.as_rule() {
            Rule::version_header => {
                version_tokens = inner.into_inner().map(|t| t.as_str().to_string()).collect();
            }
            Rule::wire_header => {
                for n in inner.into_inner() {
                    let wire = n
                        .as_str()
                        .parse::<u32>()
                        .map_err(|_| error_at(&n, format!("wire version {} out of range", n.as_str())))?;
                    wire_versions.push(wire);
                }
            }
            Rule::struct_decl => declarations.push(Declaration::Struct(build_struct(inner)?)),
            Rule::enum_decl => declarations.push(Declaration::Enum(build_enum(inner)?)),
            _ => {}
        }
    }

    Ok(File {
        header: Header {
            version_tokens,
            wire_versions,
        },
        declarations,
    })
}

fn build_struct(pair: Pair<Rule>) -> Result<StructDecl, ParseError> {
    let line = pair.line_col().0;
    let mut name = String::new();
    let mut superclass = None;
    let mut members = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::superclass => {
                superclass = inner.into_inner().next().map(|p| p.as_str().to_string());
            }
            Rule::pad_member => {
                let n = inner.into_inner().next().ok_or_else(|| ParseError::new(line, 1, "pad(n)"))?;
                members.push(MemberDecl::Pad {
                    length: parse_number(&n)?,
                });
            }
            Rule::list_member => members.push(build_list_member(inner)?),
            Rule::field_member => members.push(build_field_member(inner)?),
            _ => {}
        }
    }
    Ok(StructDecl {
        name,
        superclass,
        members,
        line,
    })
}

fn build_list_member(pair: Pair<Rule>) -> Result<MemberDecl, ParseError> {
    let mut element = None;
    let mut name = String::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::type_ref => element = Some(build_type_ref(inner)?),
            Rule::ident => name = inner.as_str().to_string(),
            _ => {}
        }
    }
    let element = element.ok_or_else(|| ParseError::new(1, 1, "list member without element type"))?;
    Ok(MemberDecl::List { element, name })
}

fn build_field_member(pair: Pair<Rule>) -> Result<MemberDecl, ParseError> {
    let (line, column) = pair.line_col();
    let mut ty = None;
    let mut name = String::new();
    let mut value: Option<Option<u64>> = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::type_ref => ty = Some(build_type_ref(inner)?),
            Rule::ident => name = inner.as_str().to_string(),
            Rule::field_value => {
                let v = inner
                    .into_inner()
                    .next()
                    .ok_or_else(|| ParseError::new(line, column, "`==` without value"))?;
                value = Some(match v.as_rule() {
                    Rule::discriminator => None,
                    _ => Some(parse_number(&v)?),
                });
            }
            _ => {}
        }
    }
    let ty = ty.ok_or_else(|| ParseError::new(line, column, "member without type"))?;
    Ok(match value {
        None => MemberDecl::Data { ty, name },
        Some(None) => MemberDecl::Discriminator { ty, name },
        Some(Some(value)) => MemberDecl::Fixed { ty, name, value },
    })
}

fn build_type_ref(pair: Pair<Rule>) -> Result<TypeRef, ParseError> {
    let mut name = String::new();
    let mut array_len = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::array_len => {
                if let Some(n) = inner.into_inner().next() {
                    array_len = Some(parse_number(&n)?);
                }
            }
            _ => {}
        }
    }
    Ok(TypeRef { name, array_len })
}

fn build_enum(pair: Pair<Rule>) -> Result<EnumDecl, ParseError> {
    let line = pair.line_col().0;
    let mut name = String::new();
    let mut params = Vec::new();
    let mut entries = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::enum_params => {
                for param in inner.into_inner() {
                    let mut it = param.into_inner();
                    let key = it.next().map(|p| p.as_str().to_string()).unwrap_or_default();
                    let value = it.next().map(|p| p.as_str().to_string()).unwrap_or_default();
                    params.push((key, value));
                }
            }
            Rule::enum_entry => {
                let (entry_line, column) = inner.line_col();
                let mut it = inner.into_inner();
                let entry_name = it
                    .next()
                    .ok_or_else(|| ParseError::new(entry_line, column, "enum entry: name"))?;
                let value = it
                    .next()
                    .ok_or_else(|| ParseError::new(entry_line, column, "enum entry: value"))?;
                entries.push(EnumEntry {
                    name: entry_name.as_str().to_string(),
                    value: parse_number(&value)?,
                });
            }
            _ => {}
        }
    }
    Ok(EnumDecl {
        name,
        params,
        entries,
        line,
    })
}

fn parse_number(pair: &Pair<Rule>) -> Result<u64, ParseError> {
    let s = pair.as_str();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse::<u64>()
    };
    parsed.map_err(|_| error_at(pair, format!("number {} does not fit in 64 bits", s)))
}
