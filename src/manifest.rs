use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::LoadError;

pub const MANIFEST_FILE: &str = "refmove.toml";
pub const GO_MOD_FILE: &str = "go.mod";

/// Project settings found at the project root.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    /// Directory holding `go.mod` or `refmove.toml`.
    pub root: PathBuf,
    /// Import path of the root directory; sub-directories append to it.
    pub module: String,
    /// Default for including `_test.go` files when the caller does not say.
    pub tests: Option<bool>,
    /// Directories (relative to the root) that are never loaded.
    pub exclude: Vec<PathBuf>,
}

// ---- TOML deserialization types ----

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlManifest {
    project: Option<TomlProject>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlProject {
    module: Option<String>,
    tests: Option<bool>,
    #[serde(default)]
    exclude: Vec<String>,
}

/// Reads a file from the overlay if it has one, else from disk.
fn read_file(path: &Path, overlay: &BTreeMap<PathBuf, String>) -> Result<Option<String>, LoadError> {
    if let Some(text) = overlay.get(path) {
        return Ok(Some(text.clone()));
    }
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(path).map(Some).map_err(|e| LoadError::io(path, e))
}

// ---- Discovery ----

/// Walk from `start_dir` upward to the first directory holding a manifest or
/// `go.mod`, and read the project settings from it.
pub fn discover(start_dir: &Path, overlay: &BTreeMap<PathBuf, String>) -> Result<ProjectConfig, LoadError> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let manifest = read_file(&dir.join(MANIFEST_FILE), overlay)?;
        let go_mod = read_file(&dir.join(GO_MOD_FILE), overlay)?;
        if manifest.is_some() || go_mod.is_some() {
            return load_config(&dir, manifest.as_deref(), go_mod.as_deref());
        }
        if !dir.pop() {
            return Err(LoadError::NoProjectRoot { start: start_dir.to_path_buf() });
        }
    }
}

fn load_config(root: &Path, manifest: Option<&str>, go_mod: Option<&str>) -> Result<ProjectConfig, LoadError> {
    let project = match manifest {
        Some(content) => parse_manifest(content, &root.join(MANIFEST_FILE))?,
        None => None,
    };

    let configured = project.as_ref().and_then(|p| p.module.clone());
    let module = match (configured, go_mod) {
        (Some(module), _) => module,
        (None, Some(content)) => parse_go_mod(content).ok_or_else(|| {
            LoadError::manifest("go.mod: missing module directive", root.join(GO_MOD_FILE))
        })?,
        (None, None) => {
            return Err(LoadError::manifest(
                "refmove.toml: missing 'module' in [project] and no go.mod",
                root.join(MANIFEST_FILE),
            ));
        }
    };
    validate_module_path(&module, root)?;

    let (tests, exclude) = match project {
        Some(p) => {
            let exclude = p
                .exclude
                .iter()
                .map(|e| validate_exclude(e, &root.join(MANIFEST_FILE)))
                .collect::<Result<Vec<_>, _>>()?;
            (p.tests, exclude)
        }
        None => (None, Vec::new()),
    };

    Ok(ProjectConfig { root: root.to_path_buf(), module, tests, exclude })
}

// ---- Parsing & validation ----

fn parse_manifest(content: &str, manifest_path: &Path) -> Result<Option<TomlProject>, LoadError> {
    let manifest: TomlManifest = toml::from_str(content).map_err(|e| {
        LoadError::manifest(format!("refmove.toml: invalid syntax: {e}"), manifest_path.to_path_buf())
    })?;
    Ok(manifest.project)
}

/// The path from the `module` directive of a go.mod file.
pub fn parse_go_mod(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

fn validate_module_path(module: &str, root: &Path) -> Result<(), LoadError> {
    let valid = !module.is_empty()
        && !module.starts_with('/')
        && !module.ends_with('/')
        && !module.contains("//")
        && !module.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(LoadError::manifest(format!("invalid module path {module:?}"), root.to_path_buf()))
    }
}

fn validate_exclude(entry: &str, manifest_path: &Path) -> Result<PathBuf, LoadError> {
    let path = PathBuf::from(entry);
    let escapes = path.components().any(|c| matches!(c, std::path::Component::ParentDir));
    if entry.is_empty() || path.is_absolute() || escapes {
        return Err(LoadError::manifest(
            format!("refmove.toml: exclude entry {entry:?} must be a relative path inside the project"),
            manifest_path.to_path_buf(),
        ));
    }
    Ok(path)
}
