use crate::lss;
use crate::model::RunDefinition;
use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// On-disk encoding of a run file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFormat {
    Json,
    /// LiveSplit XML.
    Lss,
}

impl RunFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("lss") => RunFormat::Lss,
            _ => RunFormat::Json,
        }
    }

    fn decode(self, data: &str) -> Result<RunDefinition> {
        match self {
            RunFormat::Json => Ok(serde_json::from_str(data)?),
            RunFormat::Lss => lss::parse(data),
        }
    }

    fn encode(self, def: &RunDefinition) -> Result<String> {
        match self {
            RunFormat::Json => {
                let mut data = serde_json::to_string_pretty(def).context("serialize run")?;
                data.push('\n');
                Ok(data)
            }
            RunFormat::Lss => lss::render(def),
        }
    }
}

/// Read and validate a run file.
pub fn load_run(path: &Path) -> Result<RunDefinition> {
    let format = RunFormat::from_path(path);
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read run file: {}", path.display()))?;
    let def = format
        .decode(&data)
        .with_context(|| format!("failed to parse run file: {}", path.display()))?;
    if def.segments.is_empty() {
        bail!("run file has no segments: {}", path.display());
    }
    tracing::info!(
        path = %path.display(),
        ?format,
        segments = def.segments.len(),
        attempts = def.attempt_count,
        "loaded run"
    );
    Ok(def)
}

/// Write the whole run file, replacing the previous contents.
///
/// The document goes to a temporary file in the same directory that is renamed
/// over the target. On any failure the temporary file is removed and the old
/// run file is left as it was.
pub fn save_run(path: &Path, def: &RunDefinition) -> Result<()> {
    let format = RunFormat::from_path(path);
    let data = format.encode(def)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(data.as_bytes())
        .and_then(|()| tmp.flush())
        .with_context(|| format!("failed to write run file: {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;

    tracing::info!(path = %path.display(), ?format, attempts = def.attempt_count, "saved run");
    Ok(())
}

/// Create a new single-segment run file. Refuses to overwrite an existing file.
pub fn create_run(path: &Path) -> Result<RunDefinition> {
    if path.exists() {
        bail!("refusing to overwrite existing file: {}", path.display());
    }
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("New Run")
        .to_string();
    let def = RunDefinition::new(name, "Any%");
    save_run(path, &def)?;
    Ok(def)
}
