//! Compiler driver: read inputs, build one model per version, unify.
//!
//! Each stage runs to completion for every input before the next starts, and the first
//! failure aborts the run. A [`Compilation`] is only handed out once every stage has
//! succeeded, so backends never see a partial model.

use crate::backend;
use crate::config::CompileOptions;
use crate::error::{Error, Result};
use crate::frontend::{create_ofinput, OFInput};
use crate::ir::{build_protocol, OFProtocol};
use crate::parser;
use crate::unified::{build_unified_ir, UnifiedModel};
use crate::version::OFVersion;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Input files of `dir` in name order. Backup files (`~` suffix), hidden files and
/// anything that is not a regular file are skipped.
pub fn discover_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source: std::io::Error| Error::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name.ends_with('~') {
            continue;
        }
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

/// Parse and check one file's text. Errors carry `filename`.
pub fn parse_file(filename: &str, text: &str) -> Result<OFInput> {
    let ast = parser::parse(text).map_err(|source| Error::Parse {
        file: filename.to_string(),
        source,
    })?;
    create_ofinput(filename, ast).map_err(|source| Error::Input {
        file: filename.to_string(),
        source,
    })
}

/// Read, parse and check one input file. The input is named by its base name.
pub fn process_input_file(path: &Path) -> Result<OFInput> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    tracing::debug!(file = %filename, "processing input file");
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_file(&filename, &text)
}

/// Every input file of `dir`, in order.
pub fn read_input(dir: &Path) -> Result<Vec<OFInput>> {
    discover_input_files(dir)?
        .iter()
        .map(|p| process_input_file(p))
        .collect()
}

/// A finished compiler run: the per-version models and their unified view.
#[derive(Debug, Clone)]
pub struct Compilation {
    targets: BTreeSet<OFVersion>,
    unified: Arc<UnifiedModel>,
}

impl Compilation {
    /// Run the front end and IR stages over `opts.input_dir`.
    pub fn build(opts: &CompileOptions) -> Result<Self> {
        let inputs = read_input(&opts.input_dir)?;
        tracing::info!(
            files = inputs.len(),
            dir = %opts.input_dir.display(),
            "read input files"
        );
        Self::from_inputs(&inputs, &opts.target_versions)
    }

    /// Build models for every target version that at least one input applies to.
    pub fn from_inputs(inputs: &[OFInput], targets: &BTreeSet<OFVersion>) -> Result<Self> {
        let mut protocols: BTreeMap<OFVersion, Arc<OFProtocol>> = BTreeMap::new();
        for &version in targets {
            let applicable: Vec<&OFInput> = inputs.iter().filter(|i| i.applies_to(version)).collect();
            if applicable.is_empty() {
                tracing::debug!(version = %version, "no input files; skipping");
                continue;
            }
            let protocol =
                build_protocol(version, &applicable).map_err(|source| Error::Model { version, source })?;
            protocols.insert(version, Arc::new(protocol));
        }
        tracing::info!(versions = protocols.len(), "built per-version models");

        let unified = build_unified_ir(&protocols)?;
        Ok(Compilation {
            targets: targets.clone(),
            unified: Arc::new(unified),
        })
    }

    /// Versions requested for this run; only those with inputs have a model.
    pub fn targets(&self) -> &BTreeSet<OFVersion> {
        &self.targets
    }

    pub fn unified(&self) -> &UnifiedModel {
        &self.unified
    }

    /// Shared handle to the unified model.
    pub fn unified_arc(&self) -> Arc<UnifiedModel> {
        Arc::clone(&self.unified)
    }

    pub fn protocol(&self, version: OFVersion) -> Option<&OFProtocol> {
        self.unified.protocol(version)
    }

    /// Run the backend registered as `lang`, writing under `out`.
    pub fn generate(&self, lang: &str, out: &Path) -> Result<()> {
        let generator = backend::lookup(lang).ok_or_else(|| Error::UnknownBackend(lang.to_string()))?;
        tracing::info!(backend = generator.name(), out = %out.display(), "generating");
        generator.generate(&self.unified, out)?;
        Ok(())
    }
}

/// Build from `opts` and run the selected backend.
pub fn run(opts: &CompileOptions) -> Result<Compilation> {
    if backend::lookup(&opts.lang).is_none() {
        return Err(Error::UnknownBackend(opts.lang.clone()));
    }
    let compilation = Compilation::build(opts)?;
    compilation.generate(&opts.lang, &opts.install_dir)?;
    Ok(compilation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_the_file_name() {
        let err = parse_file("broken.dat", "1.0\nstruct a {};\n").unwrap_err();
        assert_eq!(err.file(), Some("broken.dat"));
        assert!(err.to_string().starts_with("Parse error in broken.dat: line 2"));
    }

    #[test]
    fn versions_without_inputs_are_skipped() {
        let input = parse_file("a", "1.0\n1\nstruct s { uint8_t x; };\n").expect("input");
        let c = Compilation::from_inputs(&[input], &OFVersion::ALL.into_iter().collect()).expect("build");
        assert_eq!(c.unified().versions().collect::<Vec<_>>(), vec![OFVersion::V1_0]);
        assert_eq!(c.targets().len(), 6);
    }
}
