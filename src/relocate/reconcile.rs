//! Choosing the alias a qualified replacement is written with, and the
//! import it may need.

use tracing::debug;

use crate::diagnostics::RelocateError;
use crate::loader::SourceUnit;
use crate::parser::ast::{Ident, ImportSpec};
use crate::span::Span;

use super::PackageNames;
use super::imports::ImportTable;

/// Outcome of alias selection for one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasPlan {
    pub alias: String,
    /// Import to register when the unit does not import the destination yet.
    pub added: Option<ImportSpec>,
}

/// Pick the alias under which `unit` refers to `dest_path`.
///
/// An existing import of the destination wins. Otherwise the destination's
/// short name is used, unless the unit already binds it to another path; then
/// `alias_override` is used, and without one the unit is in conflict.
pub fn choose_alias(
    unit: &SourceUnit,
    table: &ImportTable,
    dest_path: &str,
    names: &PackageNames,
    alias_override: Option<&str>,
) -> Result<AliasPlan, RelocateError> {
    if let Some(alias) = table.alias_of(dest_path) {
        debug!(file = %unit.path.display(), alias, "reusing existing import");
        return Ok(AliasPlan { alias: alias.to_string(), added: None });
    }

    let implicit = names.implicit_alias(dest_path);
    let alias = match table.path_of(&implicit) {
        None => implicit.clone(),
        Some(existing) => match alias_override {
            Some(alias) => {
                if let Some(taken) = table.path_of(alias) {
                    return Err(conflict(unit, alias, taken));
                }
                debug!(file = %unit.path.display(), alias, existing, "default alias taken, using override");
                alias.to_string()
            }
            None => return Err(conflict(unit, &implicit, existing)),
        },
    };

    let name = (alias != implicit).then(|| Ident::synthetic(alias.clone(), Span::dummy()));
    Ok(AliasPlan { alias, added: Some(ImportSpec { name, path: dest_path.to_string() }) })
}

/// Conflicts are reported at the unit's package clause.
fn conflict(unit: &SourceUnit, alias: &str, existing: &str) -> RelocateError {
    let name_start = unit.file.package.span.start;
    let at = unit.source[..name_start].rfind("package").unwrap_or(name_start);
    let pos = unit.lines.position(at);
    RelocateError::AliasConflict {
        file: unit.path.clone(),
        line: pos.line,
        column: pos.column,
        alias: alias.to_string(),
        existing: existing.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::PathBuf;

    fn unit(src: &str) -> SourceUnit {
        let (file, _) = parse_source(src, 0).unwrap();
        SourceUnit::new(PathBuf::from("p/main.go"), src.to_string(), file)
    }

    fn plan(src: &str, dest: &str, alias_override: Option<&str>) -> Result<AliasPlan, RelocateError> {
        let names: PackageNames = [("ex/pkg3".to_string(), "pkg3".to_string())].into_iter().collect();
        let u = unit(src);
        let table = ImportTable::build(&u.file, &names);
        choose_alias(&u, &table, dest, &names, alias_override)
    }

    #[test]
    fn existing_import_is_reused() {
        let got = plan("package p\nimport p3 \"ex/pkg3\"\n", "ex/pkg3", None).unwrap();
        assert_eq!(got, AliasPlan { alias: "p3".into(), added: None });
    }

    #[test]
    fn free_default_alias_adds_unnamed_import() {
        let got = plan("package p\nimport \"fmt\"\n", "ex/pkg3", None).unwrap();
        assert_eq!(got.alias, "pkg3");
        let added = got.added.unwrap();
        assert_eq!(added.path, "ex/pkg3");
        assert!(added.name.is_none());
    }

    #[test]
    fn collision_without_override_is_a_conflict() {
        let err = plan("// header\npackage p\n\nimport pkg3 \"ex/other/pkg3\"\n", "ex/pkg3", None).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r#"p/main.go:2:1: package name "pkg3" conflicted with import "ex/other/pkg3"; please set --to-pkg-name"#);
    }

    #[test]
    fn collision_with_override_adds_named_import() {
        let got = plan("package p\nimport pkg3 \"ex/other/pkg3\"\n", "ex/pkg3", Some("pkg3alt")).unwrap();
        assert_eq!(got.alias, "pkg3alt");
        assert_eq!(got.added.unwrap().name.unwrap().name, "pkg3alt");
    }

    #[test]
    fn override_must_itself_be_free() {
        let src = "package p\nimport (\n\tpkg3 \"ex/other/pkg3\"\n\talt \"ex/alt\"\n)\n";
        let err = plan(src, "ex/pkg3", Some("alt")).unwrap_err();
        match err {
            RelocateError::AliasConflict { alias, existing, .. } => {
                assert_eq!(alias, "alt");
                assert_eq!(existing, "ex/alt");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn unloaded_destination_assumes_name_from_path() {
        let got = plan("package p\n", "ex/far/v2", None).unwrap();
        assert_eq!(
            got,
            AliasPlan { alias: "far".into(), added: Some(ImportSpec { name: None, path: "ex/far/v2".into() }) }
        );
    }
}
