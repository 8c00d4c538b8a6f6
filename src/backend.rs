//! Generator backends and the static registry that selects them by id.

use crate::dump;
use crate::error::GenerateError;
use crate::unified::UnifiedModel;
use std::fs;
use std::path::Path;

/// Turns the unified model into artifacts under `out`.
pub trait Generator: Send + Sync {
    fn name(&self) -> &'static str;
    fn generate(&self, model: &UnifiedModel, out: &Path) -> Result<(), GenerateError>;
}

/// Writes the textual model: `<version>.txt` per version and `unified.txt`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DumpGenerator;

impl Generator for DumpGenerator {
    fn name(&self) -> &'static str {
        "dump"
    }

    fn generate(&self, model: &UnifiedModel, out: &Path) -> Result<(), GenerateError> {
        fs::create_dir_all(out)?;
        for version in model.versions() {
            let protocol = model
                .protocol(version)
                .ok_or_else(|| GenerateError::Backend(format!("no model for version {}", version)))?;
            let path = out.join(format!("{}.txt", version));
            fs::write(&path, dump::render_protocol(protocol))?;
            tracing::debug!(path = %path.display(), "wrote");
        }
        fs::write(out.join("unified.txt"), dump::render_unified(model))?;
        Ok(())
    }
}

static DUMP: DumpGenerator = DumpGenerator;
static REGISTRY: &[&dyn Generator] = &[&DUMP];

/// Backend registered under `id`.
pub fn lookup(id: &str) -> Option<&'static dyn Generator> {
    REGISTRY.iter().copied().find(|g| g.name() == id)
}

/// Ids of all registered backends.
pub fn available() -> Vec<&'static str> {
    REGISTRY.iter().map(|g| g.name()).collect()
}
