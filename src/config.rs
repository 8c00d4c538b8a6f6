//! Compiler options and command-line parsing.
//!
//! Usage:
//!   ofc [OPTIONS]
//!
//! Options:
//!   --lang, -l <id>          Backend to run (default: dump)
//!   --install-dir, -o <dir>  Output directory (default: loxi_output)
//!   --input-dir, -i <dir>    Directory of input files (default: openflow_input)
//!   --version, -V <list>     Comma-separated versions to build, or `all` (default: all)
//!   --verbose, -v            Debug logging
//!   --help, -h               Print usage

use crate::version::OFVersion;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: ofc [OPTIONS]

Options:
  -l, --lang <id>          Backend to run (default: dump)
  -o, --install-dir <dir>  Output directory (default: loxi_output)
  -i, --input-dir <dir>    Directory of input files (default: openflow_input)
  -V, --version <list>     Comma-separated versions to build, or `all` (default: all)
  -v, --verbose            Debug logging
  -h, --help               Print this message
";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("option {0} requires a value")]
    MissingValue(String),
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("{0}")]
    BadVersion(String),
    #[error("empty version list")]
    EmptyVersionList,
}

/// Everything a compiler run needs to know. Built once and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub input_dir: PathBuf,
    pub install_dir: PathBuf,
    pub lang: String,
    pub target_versions: BTreeSet<OFVersion>,
    pub verbose: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            input_dir: PathBuf::from("openflow_input"),
            install_dir: PathBuf::from("loxi_output"),
            lang: "dump".to_string(),
            target_versions: OFVersion::ALL.into_iter().collect(),
            verbose: false,
        }
    }
}

/// Result of reading the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(CompileOptions),
    Help,
}

impl CompileOptions {
    /// Parse arguments (without the program name).
    pub fn from_args<I, S>(args: I) -> Result<Command, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut opts = CompileOptions::default();
        let mut args = args.into_iter().map(Into::<String>::into);
        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
                _ => (arg.clone(), None),
            };
            let mut value = || {
                inline
                    .clone()
                    .or_else(|| args.next())
                    .ok_or_else(|| ConfigError::MissingValue(flag.clone()))
            };
            match flag.as_str() {
                "--help" | "-h" => return Ok(Command::Help),
                "--verbose" | "-v" => opts.verbose = true,
                "--lang" | "-l" => opts.lang = value()?,
                "--install-dir" | "-o" => opts.install_dir = PathBuf::from(value()?),
                "--input-dir" | "-i" => opts.input_dir = PathBuf::from(value()?),
                "--version" | "-V" => opts.target_versions = parse_version_list(&value()?)?,
                _ => return Err(ConfigError::UnknownOption(arg)),
            }
        }
        Ok(Command::Run(opts))
    }
}

/// `"1.0,1.3"`, `"of13"`, or `"all"`.
pub fn parse_version_list(s: &str) -> Result<BTreeSet<OFVersion>, ConfigError> {
    if s.trim().eq_ignore_ascii_case("all") {
        return Ok(OFVersion::ALL.into_iter().collect());
    }
    let mut out = BTreeSet::new();
    for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        out.insert(token.parse::<OFVersion>().map_err(ConfigError::BadVersion)?);
    }
    if out.is_empty() {
        return Err(ConfigError::EmptyVersionList);
    }
    Ok(out)
}
