//! Relocation of references to one package-level symbol.
//!
//! A run takes a loaded `Project` and a `RewriteRequest` and, module by
//! module, finds the references to the `from` symbol (`locate`, `classify`),
//! replaces them with references to `to` (`rewrite`), fixes up each edited
//! unit's imports (`reconcile`) and hands the final text to a `Sink`.

pub mod classify;
pub mod driver;
pub mod imports;
pub mod locate;
pub mod reconcile;
pub mod rewrite;
pub mod sink;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::loader::{Project, assumed_name};

pub use driver::relocate;
pub use sink::{BufferedSink, MemorySink, PrintSink, Sink};

/// Where a symbol lives, as seen from the module being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModulePath {
    /// The module under processing.
    Local,
    Path(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRef {
    pub module: ModulePath,
    pub name: String,
}

impl SymbolRef {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self { module: ModulePath::Path(path.into()), name: name.into() }
    }

    /// Parse `import/path.Name`, splitting at the last `.`.
    pub fn parse(text: &str) -> Option<Self> {
        let (path, name) = text.rsplit_once('.')?;
        if path.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(path, name))
    }

    /// Re-express this reference from inside module `module_path`.
    pub fn relative_to(&self, module_path: &str) -> SymbolRef {
        let module = match &self.module {
            ModulePath::Path(path) if path == module_path => ModulePath::Local,
            other => other.clone(),
        };
        SymbolRef { module, name: self.name.clone() }
    }

    pub fn is_local(&self) -> bool {
        self.module == ModulePath::Local
    }

    pub fn path(&self) -> Option<&str> {
        match &self.module {
            ModulePath::Local => None,
            ModulePath::Path(path) => Some(path),
        }
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            ModulePath::Local => write!(f, "{}", self.name),
            ModulePath::Path(path) => write!(f, "{path}.{}", self.name),
        }
    }
}

/// The whole semantic input of a run.
#[derive(Debug, Clone)]
pub struct RewriteRequest {
    pub from: SymbolRef,
    pub to: SymbolRef,
    /// Alias to use when the destination's default name is already taken.
    pub to_alias_override: Option<String>,
}

impl RewriteRequest {
    pub fn new(from: SymbolRef, to: SymbolRef) -> Self {
        Self { from, to, to_alias_override: None }
    }

    pub fn with_alias_override(mut self, alias: impl Into<String>) -> Self {
        self.to_alias_override = Some(alias.into());
        self
    }
}

/// One replaced reference, positioned in the original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub line_text: String,
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{} {}", self.file.display(), self.line, self.column, self.line_text)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub edits: Vec<Edit>,
    /// Units handed to the sink, in processing order.
    pub modified: Vec<PathBuf>,
}

/// Package clause names of the loaded modules, by import path.
#[derive(Debug, Clone, Default)]
pub struct PackageNames {
    names: HashMap<String, String>,
}

impl PackageNames {
    pub fn of(project: &Project) -> Self {
        let names = project.modules.iter().map(|m| (m.path.clone(), m.name.clone())).collect();
        Self { names }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.names.get(path).map(String::as_str)
    }

    /// Name an unaliased import of `path` binds in a file.
    pub fn implicit_alias(&self, path: &str) -> String {
        self.get(path).unwrap_or_else(|| assumed_name(path)).to_string()
    }
}

impl FromIterator<(String, String)> for PackageNames {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { names: iter.into_iter().collect() }
    }
}
