mod common;

use std::fs;

use common::*;
use refmove::diagnostics::LoadError;
use refmove::loader::{LoadOptions, load};

#[test]
fn example_project_modules() {
    let project = example_project();
    let loaded = load(&LoadOptions::new(pattern(&project, "pkg1"))).unwrap();

    let paths: Vec<&str> = loaded.modules.iter().map(|m| m.path.as_str()).collect();
    let expected: Vec<String> = ["collide", "keep", "noop", "other/pkg3", "pkg1", "pkg2", "pkg3"]
        .iter()
        .map(|rel| format!("{MODULE}/{rel}"))
        .collect();
    assert_eq!(paths, expected);
    assert_eq!(loaded.module_path, MODULE);
    assert_eq!(loaded.root, project.path());
    assert_eq!(loaded.package_name(&format!("{MODULE}/pkg1")), Some("main"));
    assert_eq!(loaded.package_name(&format!("{MODULE}/other/pkg3")), Some("pkg3"));

    let targeted: Vec<&str> = loaded.targeted().map(|m| m.path.as_str()).collect();
    assert_eq!(targeted, vec![format!("{MODULE}/pkg1")]);
}

#[test]
fn recursive_pattern_targets_subtree() {
    let project = example_project();
    let loaded = load(&LoadOptions::new(format!("{}/...", pattern(&project, "other")))).unwrap();
    let targeted: Vec<&str> = loaded.targeted().map(|m| m.path.as_str()).collect();
    assert_eq!(targeted, vec![format!("{MODULE}/other/pkg3")]);
}

#[test]
fn remote_uses_resolve_to_declarations() {
    let project = example_project();
    let loaded = load(&LoadOptions::new(pattern(&project, "pkg1"))).unwrap();

    let pkg2 = loaded.module(&format!("{MODULE}/pkg2")).unwrap();
    let t2 = pkg2.scope["T2"];
    let pkg1 = loaded.module(&format!("{MODULE}/pkg1")).unwrap();
    assert!(pkg1.units[0].uses.values().any(|symbol| *symbol == t2));
    assert!(pkg1.complete);
}

#[test]
fn test_files_follow_options_and_manifest() {
    let project = example_project();
    fs::write(project.path().join("pkg1/main_test.go"), "package main\n\nvar extra T1\n").unwrap();

    let units = |options: LoadOptions| {
        let loaded = load(&options).unwrap();
        loaded.module(&format!("{MODULE}/pkg1")).unwrap().units.len()
    };
    assert_eq!(units(LoadOptions::new(pattern(&project, "pkg1"))), 2);
    assert_eq!(units(LoadOptions::new(pattern(&project, "pkg1")).with_tests(false)), 1);

    fs::write(
        project.path().join("refmove.toml"),
        format!("[project]\nmodule = \"{MODULE}\"\ntests = false\nexclude = [\"collide\"]\n"),
    )
    .unwrap();
    assert_eq!(units(LoadOptions::new(pattern(&project, "pkg1"))), 1);
    assert_eq!(units(LoadOptions::new(pattern(&project, "pkg1")).with_tests(true)), 2);

    let loaded = load(&LoadOptions::new(pattern(&project, "pkg1"))).unwrap();
    assert!(loaded.module(&format!("{MODULE}/collide")).is_none());
}

#[test]
fn syntax_error_names_the_file() {
    let project = example_project();
    let path = project.path().join("noop/noop.go");
    let options = LoadOptions::new(pattern(&project, "noop")).with_overlay(&path, "package noop\n\nfunc {\n");
    match load(&options) {
        Err(LoadError::Syntax { path: at, line, .. }) => {
            assert_eq!(at, path);
            assert_eq!(line, 3);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a syntax error"),
    }
}

#[test]
fn unparsable_package_outside_pattern_is_skipped() {
    let project = example_project();
    let path = project.path().join("noop/noop.go");
    let options = LoadOptions::new(pattern(&project, "pkg1")).with_overlay(&path, "package noop\n\nfunc {\n");
    let loaded = load(&options).unwrap();
    assert!(loaded.module(&format!("{MODULE}/noop")).is_none());
    assert!(loaded.module(&format!("{MODULE}/pkg1")).is_some());
}

#[test]
fn no_root_above_pattern() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("lonely")).unwrap();
    let err = load(&LoadOptions::new(dir.path().join("lonely").display().to_string())).unwrap_err();
    assert!(matches!(err, LoadError::NoProjectRoot { .. }));
}
