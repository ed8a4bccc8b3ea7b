//! Per-unit view of the imports: which alias names which path.

use std::collections::BTreeMap;

use tracing::warn;

use crate::parser::ast::SourceFile;

use super::PackageNames;

/// Alias to import path for one source unit. Blank (`_`) imports bind no
/// alias; dot imports are kept aside since they bind no alias either.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    by_alias: BTreeMap<String, String>,
    dot: Vec<String>,
    blank: Vec<String>,
}

impl ImportTable {
    pub fn build(file: &SourceFile, names: &PackageNames) -> Self {
        let mut table = Self::default();
        for spec in file.imports.iter().flat_map(|d| &d.node.specs) {
            let spec = &spec.node;
            if spec.is_blank() {
                table.blank.push(spec.path.clone());
                continue;
            }
            if spec.is_dot() {
                table.dot.push(spec.path.clone());
                continue;
            }
            let alias = match &spec.name {
                Some(name) => name.name.clone(),
                None => names.implicit_alias(&spec.path),
            };
            if let Err(existing) = table.insert(&alias, &spec.path) {
                warn!(alias = %alias, path = %spec.path, existing = %existing, "alias imported twice");
            }
        }
        table
    }

    /// Bind `alias` to `path`. Rebinding to the same path is a no-op; to a
    /// different path it fails with the path already bound.
    pub fn insert(&mut self, alias: &str, path: &str) -> Result<(), String> {
        match self.by_alias.get(alias) {
            Some(existing) if existing == path => Ok(()),
            Some(existing) => Err(existing.clone()),
            None => {
                self.by_alias.insert(alias.to_string(), path.to_string());
                Ok(())
            }
        }
    }

    pub fn path_of(&self, alias: &str) -> Option<&str> {
        self.by_alias.get(alias).map(String::as_str)
    }

    /// An alias under which `path` is usable as a qualifier.
    pub fn alias_of(&self, path: &str) -> Option<&str> {
        self.by_alias.iter().find(|(_, p)| *p == path).map(|(alias, _)| alias.as_str())
    }

    /// Whether the unit imports `path` in any form.
    pub fn imports(&self, path: &str) -> bool {
        self.alias_of(path).is_some() || self.dot.iter().any(|p| p == path) || self.blank.iter().any(|p| p == path)
    }
}
