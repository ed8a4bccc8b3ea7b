#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use walkdir::WalkDir;

use refmove::diagnostics::RelocateError;
use refmove::loader::LoadOptions;
use refmove::relocate::{MemorySink, Report, RewriteRequest, SymbolRef};

pub const MODULE: &str = "example.com/refmove/example";

pub fn refmove() -> Command {
    Command::new(env!("CARGO_BIN_EXE_refmove"))
}

fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/example")
}

/// A private copy of the example project, so tests may write to it.
pub fn example_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = fixture_root();
    for entry in WalkDir::new(&root) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(&root).unwrap();
        let dest = dir.path().join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).unwrap();
        } else {
            fs::copy(entry.path(), &dest).unwrap();
        }
    }
    dir
}

/// `name` in the example module at `pkg` (relative to the module root).
pub fn sym(pkg: &str, name: &str) -> SymbolRef {
    SymbolRef::new(format!("{MODULE}/{pkg}"), name)
}

pub fn pattern(project: &TempDir, pkg: &str) -> String {
    project.path().join(pkg).display().to_string()
}

pub fn read(project: &TempDir, rel: &str) -> String {
    fs::read_to_string(project.path().join(rel)).unwrap()
}

/// Run over package `pkg` of a fresh copy into a memory sink.
pub fn relocate_in(pkg: &str, request: &RewriteRequest) -> (TempDir, Result<(Report, MemorySink), RelocateError>) {
    let project = example_project();
    let options = LoadOptions::new(pattern(&project, pkg));
    let mut sink = MemorySink::new();
    let result = refmove::run(&options, request, &mut sink).map(|report| (report, sink));
    (project, result)
}
