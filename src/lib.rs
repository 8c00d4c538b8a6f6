//! # ofschema: OpenFlow protocol schema compiler
//!
//! Compiles versioned OpenFlow protocol definition files into an in-memory schema for
//! code generators: one structural model per protocol version and a unified
//! cross-version view over them.
//!
//! ## Pipeline
//!
//! 1. [`parser`]: input text to [`ast::File`] (PEST grammar).
//! 2. [`frontend`]: per-file checks, producing an [`OFInput`] tagged with its versions.
//! 3. [`ir`]: all inputs of one version merged and resolved into an [`OFProtocol`].
//! 4. [`unified`]: per-version models gathered by entity name into a [`UnifiedModel`].
//! 5. [`backend`]: a generator selected by id writes artifacts from the unified model.
//!
//! [`pipeline::Compilation`] runs stages 1–4 from a [`CompileOptions`]; the `ofc`
//! binary adds logging and exit codes.
//!
//! ## Input files
//!
//! ```text
//! 1.0, 1.3
//! 1, 4
//!
//! enum ofp_type(wire_type=uint8_t) {
//!     OFPT_HELLO = 0,
//! };
//!
//! struct of_header {
//!     uint8_t version;
//!     uint8_t type == ?;
//!     uint16_t length;
//!     uint32_t xid;
//! };
//!
//! struct of_hello : of_header {
//!     uint8_t version;
//!     uint8_t type == 0;
//!     uint16_t length;
//!     uint32_t xid;
//! };
//! ```
//!
//! Line 1 lists the versions the file applies to, line 2 their wire numbers. Members
//! are in wire order; `pad(n)`, `list(T)`, fixed values (`== v`) and discriminators
//! (`== ?`) are described in [`ast::MemberDecl`].
//!
//! [`codec`] is a reference encoder/decoder driven directly by an [`OFProtocol`].

pub mod ast;
pub mod backend;
pub mod codec;
pub mod config;
pub mod dump;
pub mod error;
pub mod frontend;
pub mod ir;
pub mod parser;
pub mod pipeline;
pub mod types;
pub mod unified;
pub mod value;
pub mod version;

pub use codec::{Codec, CodecError};
pub use config::CompileOptions;
pub use error::{Error, Result};
pub use frontend::OFInput;
pub use ir::{OFClass, OFEnum, OFMember, OFProtocol, OFType};
pub use parser::parse;
pub use pipeline::Compilation;
pub use unified::{UnifiedEntity, UnifiedModel};
pub use value::{Object, Value};
pub use version::OFVersion;
