//! Project loading: discover the project root, read every package under it
//! (from disk, with an in-memory overlay on top), parse the sources and run
//! name resolution.
//!
//! A package is one directory. Its import path is the project's module path
//! joined with the directory's path relative to the root. `_test.go` files
//! declaring `package foo_test` form a separate module whose path carries a
//! `_test` suffix.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::diagnostics::LoadError;
use crate::manifest::{self, ProjectConfig};
use crate::parser::{ast::SourceFile, parse_source};
use crate::resolve::{SymbolId, SymbolTable, resolve_project};
use crate::span::LineIndex;

const SOURCE_EXT: &str = "go";
const TEST_SUFFIX: &str = "_test.go";

/// What to load. `pattern` is a directory, or `dir/...` for the directory
/// and everything beneath it.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub pattern: String,
    /// Include `_test.go` files. `None` defers to the project manifest, then
    /// to including them.
    pub tests: Option<bool>,
    /// File contents that replace (or add to) what is on disk.
    pub overlay: BTreeMap<PathBuf, String>,
}

impl LoadOptions {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), ..Self::default() }
    }

    pub fn with_tests(mut self, tests: bool) -> Self {
        self.tests = Some(tests);
        self
    }

    pub fn with_overlay(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.overlay.insert(path.into(), content.into());
        self
    }
}

/// One parsed source file with its semantic tables.
#[derive(Debug)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub source: String,
    pub lines: LineIndex,
    pub file: SourceFile,
    /// Identifier occurrences that refer to a symbol.
    pub uses: HashMap<crate::parser::ast::NodeId, SymbolId>,
    /// Identifier occurrences that declare a symbol.
    pub defs: HashMap<crate::parser::ast::NodeId, SymbolId>,
}

impl SourceUnit {
    pub fn new(path: PathBuf, source: String, file: SourceFile) -> Self {
        let lines = LineIndex::new(&source);
        Self { path, source, lines, file, uses: HashMap::new(), defs: HashMap::new() }
    }
}

/// A package: every unit of one directory sharing a package clause.
#[derive(Debug)]
pub struct Module {
    /// Canonical import path.
    pub path: String,
    /// Name from the package clause.
    pub name: String,
    pub dir: PathBuf,
    pub units: Vec<SourceUnit>,
    /// Package-level names.
    pub scope: HashMap<String, SymbolId>,
    /// False when some name could not be resolved.
    pub complete: bool,
    /// Inside the requested load pattern.
    pub targeted: bool,
}

impl Module {
    pub fn new(path: String, name: String, dir: PathBuf, units: Vec<SourceUnit>) -> Self {
        Self { path, name, dir, units, scope: HashMap::new(), complete: true, targeted: true }
    }
}

#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub module_path: String,
    /// Sorted by path.
    pub modules: Vec<Module>,
    pub symbols: SymbolTable,
}

impl Project {
    pub fn module(&self, path: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.path == path)
    }

    pub fn package_name(&self, path: &str) -> Option<&str> {
        self.module(path).map(|m| m.name.as_str())
    }

    pub fn targeted(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| m.targeted)
    }
}

/// Last segment of an import path, skipping a `/vN` major-version suffix.
pub fn path_base(path: &str) -> &str {
    let mut segments = path.rsplit('/');
    let last = segments.next().unwrap_or(path);
    let is_version = last.len() > 1
        && last.starts_with('v')
        && last[1..].chars().all(|c| c.is_ascii_digit());
    match segments.next() {
        Some(parent) if is_version && !parent.is_empty() => parent,
        _ => last,
    }
}

/// Name a package is assumed to declare when its source is not loaded: the
/// path base with a `go-` prefix dropped, cut at the first character that
/// cannot appear in an identifier.
pub fn assumed_name(path: &str) -> &str {
    let base = path_base(path);
    let base = base.strip_prefix("go-").unwrap_or(base);
    let end = base.find(|c: char| !(c.is_alphanumeric() || c == '_')).unwrap_or(base.len());
    if end == 0 { base } else { &base[..end] }
}

// ---- Entry point ----

pub fn load(options: &LoadOptions) -> Result<Project, LoadError> {
    let cwd = std::env::current_dir().map_err(|e| LoadError::io(".", e))?;
    let (pattern_dir, recursive) = split_pattern(&options.pattern);
    let pattern_dir = absolute(&cwd, &pattern_dir);
    let overlay: BTreeMap<PathBuf, String> =
        options.overlay.iter().map(|(path, text)| (absolute(&cwd, path), text.clone())).collect();

    let config = manifest::discover(&pattern_dir, &overlay)?;
    let tests = options.tests.or(config.tests).unwrap_or(true);
    debug!(root = %config.root.display(), module = %config.module, tests, "project root");

    let files = collect_files(&config, &overlay, tests)?;
    let mut next_id = 0;
    let mut modules = Vec::new();
    for (dir, dir_files) in files {
        let import_path = import_path(&config, &dir);
        let targeted = dir == pattern_dir || (recursive && dir.starts_with(&pattern_dir));
        let built = match build_modules(&dir, &import_path, dir_files, &mut next_id) {
            Ok(built) => built,
            // Packages outside the pattern are only read for their
            // declarations; their importers fall back to name matching.
            Err(LoadError::Syntax { path, line, column, msg, .. }) if !targeted => {
                warn!(path = %path.display(), line, column, %msg, "skipping package that does not parse");
                continue;
            }
            Err(err) => return Err(err),
        };
        for mut module in built {
            module.targeted = targeted;
            modules.push(module);
        }
    }
    modules.sort_by(|a, b| a.path.cmp(&b.path));

    let mut symbols = SymbolTable::new();
    resolve_project(&mut modules, &mut symbols);
    info!(
        modules = modules.len(),
        targeted = modules.iter().filter(|m| m.targeted).count(),
        "project loaded"
    );

    Ok(Project { root: config.root, module_path: config.module, modules, symbols })
}

fn split_pattern(pattern: &str) -> (PathBuf, bool) {
    if pattern == "..." {
        return (PathBuf::from("."), true);
    }
    match pattern.strip_suffix("/...") {
        Some(dir) if dir.is_empty() => (PathBuf::from("/"), true),
        Some(dir) => (PathBuf::from(dir), true),
        None if pattern.is_empty() => (PathBuf::from("."), false),
        None => (PathBuf::from(pattern), false),
    }
}

/// `path` made absolute against `cwd` and lexically normalized.
fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() { path.to_path_buf() } else { cwd.join(path) };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn import_path(config: &ProjectConfig, dir: &Path) -> String {
    let rel = dir.strip_prefix(&config.root).unwrap_or(dir);
    let segments: Vec<_> = rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
    if segments.is_empty() {
        config.module.clone()
    } else {
        format!("{}/{}", config.module, segments.join("/"))
    }
}

// ---- File discovery ----

fn skipped_dir_name(name: &str) -> bool {
    name == "testdata" || name == "vendor" || name.starts_with('.') || name.starts_with('_')
}

/// Whether a path relative to the root lies in a skipped or excluded directory.
fn in_skipped_dir(rel_dir: &Path, config: &ProjectConfig) -> bool {
    let hidden = rel_dir.components().any(|c| skipped_dir_name(&c.as_os_str().to_string_lossy()));
    hidden || config.exclude.iter().any(|excluded| rel_dir.starts_with(excluded))
}

fn is_source_file(path: &Path, tests: bool) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if name.starts_with('.') || name.starts_with('_') {
        return false;
    }
    if path.extension().is_none_or(|ext| ext != SOURCE_EXT) {
        return false;
    }
    tests || !name.ends_with(TEST_SUFFIX)
}

type DirFiles = BTreeMap<PathBuf, BTreeMap<PathBuf, String>>;

/// Every loadable source file under the root, grouped by directory, with its text.
fn collect_files(
    config: &ProjectConfig,
    overlay: &BTreeMap<PathBuf, String>,
    tests: bool,
) -> Result<DirFiles, LoadError> {
    let mut files = DirFiles::new();
    let walker = WalkDir::new(&config.root).sort_by_file_name().into_iter().filter_entry(|entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let rel = entry.path().strip_prefix(&config.root).unwrap_or(entry.path());
        !in_skipped_dir(rel, config)
    });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| config.root.clone());
            LoadError::io(path, e.into())
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_source_file(path, tests) {
            continue;
        }
        let text = match overlay.get(path) {
            Some(text) => text.clone(),
            None => std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?,
        };
        let dir = path.parent().unwrap_or(&config.root).to_path_buf();
        files.entry(dir).or_default().insert(path.to_path_buf(), text);
    }

    for (path, text) in overlay {
        let Ok(rel) = path.strip_prefix(&config.root) else {
            continue;
        };
        let rel_dir = rel.parent().unwrap_or(Path::new(""));
        if !is_source_file(path, tests) || in_skipped_dir(rel_dir, config) {
            continue;
        }
        let dir = path.parent().unwrap_or(&config.root).to_path_buf();
        files.entry(dir).or_default().insert(path.clone(), text.clone());
    }

    Ok(files)
}

// ---- Parsing ----

fn parse_unit(path: PathBuf, source: String, next_id: &mut u32) -> Result<SourceUnit, LoadError> {
    match parse_source(&source, *next_id) {
        Ok((file, next)) => {
            *next_id = next;
            Ok(SourceUnit::new(path, source, file))
        }
        Err(err) => {
            let pos = LineIndex::new(&source).position(err.span.start);
            Err(LoadError::Syntax { path, line: pos.line, column: pos.column, msg: err.msg, span: err.span })
        }
    }
}

/// Parse one directory into its package, plus an external test package if
/// any `_test.go` file declares one.
fn build_modules(
    dir: &Path,
    import_path: &str,
    files: BTreeMap<PathBuf, String>,
    next_id: &mut u32,
) -> Result<Vec<Module>, LoadError> {
    let mut primary: Option<(String, Vec<SourceUnit>)> = None;
    let mut external: Option<(String, Vec<SourceUnit>)> = None;

    for (path, source) in files {
        let is_test = path.to_string_lossy().ends_with(TEST_SUFFIX);
        let unit = parse_unit(path, source, next_id)?;
        let name = unit.file.package.name.clone();

        let is_external = is_test
            && match &primary {
                Some((primary_name, _)) => name == format!("{primary_name}_test"),
                None => name.ends_with("_test"),
            };
        let slot = if is_external { &mut external } else { &mut primary };
        if let Some((existing, units)) = slot.as_mut() {
            if *existing != name {
                return Err(LoadError::PackageClash {
                    dir: dir.to_path_buf(),
                    first: existing.clone(),
                    second: name,
                });
            }
            units.push(unit);
        } else {
            *slot = Some((name, vec![unit]));
        }
    }

    // A `foo_test` package seen before any file of `foo` was classified as external.
    if let (Some((primary_name, _)), Some((external_name, _))) = (&primary, &external) {
        if *external_name != format!("{primary_name}_test") {
            return Err(LoadError::PackageClash {
                dir: dir.to_path_buf(),
                first: primary_name.clone(),
                second: external_name.clone(),
            });
        }
    }

    let mut modules = Vec::new();
    if let Some((name, units)) = primary {
        debug!(path = import_path, files = units.len(), "package");
        modules.push(Module::new(import_path.to_string(), name, dir.to_path_buf(), units));
    }
    if let Some((name, units)) = external {
        let path = format!("{import_path}_test");
        debug!(path = %path, files = units.len(), "external test package");
        modules.push(Module::new(path, name, dir.to_path_buf(), units));
    }
    Ok(modules)
}
