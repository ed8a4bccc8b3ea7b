// Invariants of the relocation engine over generated projects.
//
// Projects are built in memory, so each case only pays for parsing and
// resolution:
//   PROPTEST_CASES=1000 cargo test --test properties

use std::path::PathBuf;

use proptest::prelude::*;
use refmove::lexer::lex;
use refmove::loader::{Module, Project, SourceUnit};
use refmove::parser::parse_source;
use refmove::relocate::{MemorySink, RewriteRequest, SymbolRef, relocate};
use refmove::resolve::{SymbolTable, resolve_project};

fn project(specs: &[(&str, String)]) -> Project {
    let mut next = 0;
    let mut modules = Vec::new();
    for (path, src) in specs {
        let (file, n) = parse_source(src, next).unwrap();
        next = n;
        let name = file.package.name.clone();
        let dir = PathBuf::from(path);
        let unit = SourceUnit::new(dir.join("x.go"), src.clone(), file);
        modules.push(Module::new(path.to_string(), name, dir, vec![unit]));
    }
    let mut symbols = SymbolTable::new();
    resolve_project(&mut modules, &mut symbols);
    Project { root: PathBuf::from("."), module_path: "ex".into(), modules, symbols }
}

fn exported_name() -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z0-9]{0,8}".prop_filter("must differ from the target", |s| s != "T")
}

#[test]
fn prop_lexer_never_panics() {
    proptest!(|(source in "\\PC{0,400}")| {
        let _ = lex(&source);
        let _ = parse_source(&source, 0);
    });
}

/// References to other members of the "from" package are never touched.
#[test]
fn prop_unrelated_names_produce_no_edits() {
    proptest!(|(name in exported_name(), uses in 1usize..5)| {
        let mut a = String::from("package a\n\nimport \"ex/b\"\n\n");
        for i in 0..uses {
            a.push_str(&format!("var v{i} b.{name}\n"));
        }
        let b = format!("package b\n\ntype T int\n\ntype {name} int\n");
        let mut p = project(&[("ex/a", a), ("ex/b", b)]);

        let request = RewriteRequest::new(SymbolRef::new("ex/b", "T"), SymbolRef::new("ex/c", "U"));
        let mut sink = MemorySink::new();
        let report = relocate(&mut p, &request, &mut sink).unwrap();
        prop_assert!(report.edits.is_empty());
        prop_assert!(sink.files.is_empty());
    });
}

/// Moving a local type away never rewrites the receivers of its methods.
#[test]
fn prop_receivers_are_never_replaced() {
    proptest!(|(methods in 0usize..5, uses in 1usize..5, pointer in any::<bool>())| {
        let star = if pointer { "*" } else { "" };
        let mut a = String::from("package a\n\nimport \"ex/b\"\n\ntype T int\n\n");
        for i in 0..methods {
            a.push_str(&format!("func (r {star}T) M{i}() {{}}\n"));
        }
        for j in 0..uses {
            a.push_str(&format!("var v{j} T\n"));
        }
        let b = String::from("package b\n\ntype U int\n");
        let mut p = project(&[("ex/a", a), ("ex/b", b)]);

        let request = RewriteRequest::new(SymbolRef::new("ex/a", "T"), SymbolRef::new("ex/b", "U"));
        let mut sink = MemorySink::new();
        let report = relocate(&mut p, &request, &mut sink).unwrap();
        prop_assert_eq!(report.edits.len(), uses);

        let out = sink.get("ex/a/x.go").unwrap();
        let receiver = format!("func (r {star}T) M");
        prop_assert_eq!(out.matches(receiver.as_str()).count(), methods);
        prop_assert_eq!(out.matches(" b.U\n").count(), uses);
        prop_assert!(out.contains("type T int"));
    });
}

/// Relocating a symbol onto itself leaves the text unchanged.
#[test]
fn prop_self_relocation_is_identity() {
    proptest!(|(uses in 1usize..6, local in any::<bool>())| {
        let mut a = String::from("package a\n\nimport \"ex/b\"\n\ntype L int\n\n");
        for j in 0..uses {
            let ty = if local { "L" } else { "b.T" };
            a.push_str(&format!("var v{j} []{ty}\n"));
        }
        a.push_str("var keep b.Other\n");
        let b = String::from("package b\n\ntype T int\n\ntype Other int\n");
        let source = a.clone();
        let mut p = project(&[("ex/a", a), ("ex/b", b)]);

        let target = if local { SymbolRef::new("ex/a", "L") } else { SymbolRef::new("ex/b", "T") };
        let request = RewriteRequest::new(target.clone(), target);
        let mut sink = MemorySink::new();
        let report = relocate(&mut p, &request, &mut sink).unwrap();
        prop_assert_eq!(report.edits.len(), uses);
        prop_assert_eq!(sink.get("ex/a/x.go"), Some(source.as_str()));
    });
}
