//! Finding the target symbol, once per run and then per module.

use tracing::debug;

use crate::diagnostics::RelocateError;
use crate::loader::Module;
use crate::resolve::SymbolId;

use super::imports::ImportTable;
use super::{PackageNames, SymbolRef};

/// The `from` symbol resolved against the whole project, before any module
/// is processed, so every module matches against the same identity.
#[derive(Debug, Clone)]
pub struct Target {
    pub path: String,
    pub name: String,
    /// `None` when the module is not loaded or does not declare the name.
    pub symbol: Option<SymbolId>,
}

impl Target {
    pub fn resolve(modules: &[Module], from: &SymbolRef) -> Self {
        let path = from.path().unwrap_or_default().to_string();
        let symbol = modules.iter().find(|m| m.path == path).and_then(|m| m.scope.get(&from.name)).copied();
        debug!(path = %path, name = %from.name, found = symbol.is_some(), "target");
        Self { path, name: from.name.clone(), symbol }
    }
}

/// How a module relates to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locate {
    /// The symbol is known; match by identity.
    Resolved { symbol: SymbolId, local: bool },
    /// The symbol is not known; match by name.
    Unresolved { local: bool },
    /// The module cannot refer to the target.
    NotApplicable,
}

/// Decide how `module` should be searched. `from` is relative to `module`.
pub fn locate(
    module: &Module,
    target: &Target,
    from: &SymbolRef,
    names: &PackageNames,
) -> Result<Locate, RelocateError> {
    if from.is_local() {
        return match module.scope.get(&from.name) {
            Some(symbol) => Ok(Locate::Resolved { symbol: *symbol, local: true }),
            None if module.complete => {
                Err(RelocateError::TargetNotFound { module: module.path.clone(), name: from.name.clone() })
            }
            None => Ok(Locate::Unresolved { local: true }),
        };
    }

    let imported = module.units.iter().any(|unit| ImportTable::build(&unit.file, names).imports(&target.path));
    if !imported {
        return Ok(Locate::NotApplicable);
    }
    Ok(match target.symbol {
        Some(symbol) => Locate::Resolved { symbol, local: false },
        None => Locate::Unresolved { local: false },
    })
}
