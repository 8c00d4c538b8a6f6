//! Error types for every pipeline stage.
//!
//! Each stage has its own error enum; [`Error`] gathers them for the driver and attaches
//! the file or version that failed. Only [`UnificationError`] signals a defect in the
//! compiler itself; everything else is bad input.

use crate::version::OFVersion;
use std::path::PathBuf;

/// Malformed input text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        ParseError {
            line,
            column,
            message: message.into(),
        }
    }
}

/// One file's declarations are inconsistent on their own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("empty version header")]
    EmptyHeader,
    #[error("unknown version token '{0}'")]
    UnknownVersion(String),
    #[error("unknown wire version {0}")]
    UnknownWireVersion(u32),
    #[error("header lists {tokens} version token(s) but {wires} wire version(s)")]
    HeaderArity { tokens: usize, wires: usize },
    #[error("version {token} has wire version {expected}, header says {found}")]
    WireMismatch {
        token: String,
        expected: u32,
        found: u32,
    },
    #[error("version {0} listed twice in header")]
    DuplicateVersion(String),
    #[error("line {line}: duplicate declaration of '{name}'")]
    DuplicateDeclaration { name: String, line: usize },
    #[error("class {class}: duplicate member '{member}'")]
    DuplicateMember { class: String, member: String },
    #[error("enum {enum_name}: duplicate entry '{entry}'")]
    DuplicateEnumEntry { enum_name: String, entry: String },
    #[error("class {class}: list member '{member}' refers to undeclared type '{ty}'")]
    UndeclaredListElement {
        class: String,
        member: String,
        ty: String,
    },
    #[error("class {class}: pad length must be positive")]
    ZeroPad { class: String },
    #[error("class {class}: member '{member}' is an array of length 0")]
    ZeroArray { class: String, member: String },
    #[error("class {class}: more than one discriminator member")]
    MultipleDiscriminators { class: String },
    #[error("class {class}: class cannot be its own superclass")]
    SelfSuperclass { class: String },
    #[error("enum {enum_name}: unknown parameter '{param}'")]
    UnknownEnumParam { enum_name: String, param: String },
    #[error("enum {enum_name}: invalid value '{value}' for parameter '{param}'")]
    InvalidEnumParam {
        enum_name: String,
        param: String,
        value: String,
    },
}

/// The declarations gathered for one version do not form a consistent model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("class {class}: member '{member}' has unknown type '{ty}'")]
    UnresolvedType {
        class: String,
        member: String,
        ty: String,
    },
    #[error("class {class}: list member '{member}' has unknown element type '{ty}'")]
    UnresolvedListElement {
        class: String,
        member: String,
        ty: String,
    },
    #[error("class {class}: list member '{member}' has element type '{ty}', which is neither a class nor a fixed-width primitive")]
    InvalidListElement {
        class: String,
        member: String,
        ty: String,
    },
    #[error("class {class}: member '{member}' is an array of '{ty}', which is not a fixed-width primitive")]
    InvalidArrayElement {
        class: String,
        member: String,
        ty: String,
    },
    #[error("class {class}: member '{member}' has a fixed value but type '{ty}' is not an integer")]
    NonIntegerValueMember {
        class: String,
        member: String,
        ty: String,
    },
    #[error("class {class}: value {value} of member '{member}' does not fit in {width} byte(s)")]
    ValueOverflow {
        class: String,
        member: String,
        value: u64,
        width: usize,
    },
    #[error("class {class}: unknown superclass '{superclass}'")]
    UnresolvedSuperclass { class: String, superclass: String },
    #[error("class {class}: superclass chain is cyclic")]
    SuperclassCycle { class: String },
    #[error("class {class} contains itself by value")]
    ContainmentCycle { class: String },
    #[error("class {class}: member '{member}' is larger than 65535 bytes")]
    OversizedMember { class: String, member: String },
    #[error("class {name} declared differently in {first} and {second}")]
    ConflictingClass {
        name: String,
        first: String,
        second: String,
    },
    #[error("enum {name} declared differently in {first} and {second}")]
    ConflictingEnum {
        name: String,
        first: String,
        second: String,
    },
    #[error("'{0}' is declared both as a class and as an enum")]
    ClassEnumClash(String),
    #[error("class {0} clashes with the list class synthesized for a list member")]
    ListClassClash(String),
    #[error("enum {enum_name}: wire type '{ty}' is not an integer primitive")]
    InvalidEnumWireType { enum_name: String, ty: String },
    #[error("enum {enum_name}: value {value} of '{entry}' does not fit wire type {ty}")]
    EnumValueOverflow {
        enum_name: String,
        entry: String,
        value: u64,
        ty: String,
    },
}

/// A per-version model broke an invariant the unifier relies on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnificationError {
    #[error("protocol for version {found} stored under version {key}")]
    VersionKeyMismatch { key: OFVersion, found: OFVersion },
    #[error("version {version}: {entity} references '{referenced}', which is not in the model")]
    DanglingReference {
        version: OFVersion,
        entity: String,
        referenced: String,
    },
    #[error("'{name}' is a class in version {class_version} but an enum in version {enum_version}")]
    KindConflict {
        name: String,
        class_version: OFVersion,
        enum_version: OFVersion,
    },
    #[error("version {version}: '{name}' is both a class and an enum")]
    DuplicateEntity { version: OFVersion, name: String },
}

/// A generator backend failed to emit its artifacts.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Backend(String),
}

/// Any failure of a compiler run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error in {file}: {source}")]
    Parse { file: String, source: ParseError },
    #[error("Error in {file}: {source}")]
    Input { file: String, source: InputError },
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Error in version {version}: {source}")]
    Model {
        version: OFVersion,
        source: ModelError,
    },
    #[error("internal error: {0}")]
    Unification(#[from] UnificationError),
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),
    #[error("generation failed: {0}")]
    Generate(#[from] GenerateError),
}

impl Error {
    /// Name of the input file the error belongs to, if it is a per-file error.
    pub fn file(&self) -> Option<&str> {
        match self {
            Error::Parse { file, .. } | Error::Input { file, .. } => Some(file),
            _ => None,
        }
    }

    /// True for errors that indicate a compiler defect rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Unification(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
