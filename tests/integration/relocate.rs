mod common;

use std::path::PathBuf;

use common::*;
use refmove::diagnostics::RelocateError;
use refmove::loader::LoadOptions;
use refmove::relocate::{BufferedSink, MemorySink, RewriteRequest};

const PKG1_MAIN: &str = include_str!("../fixtures/example/pkg1/main.go");

fn only_file(sink: &MemorySink) -> &str {
    assert_eq!(sink.files.len(), 1, "expected exactly one file, got {:?}", sink.files.keys());
    sink.files.values().next().unwrap()
}

#[test]
fn local_to_remote_keeps_receivers() {
    let request = RewriteRequest::new(sym("pkg1", "T1"), sym("pkg2", "T2"));
    let (project, result) = relocate_in("pkg1", &request);
    let (report, sink) = result.unwrap();

    assert_eq!(
        only_file(&sink),
        r#"package main

import (
	"fmt"

	"example.com/refmove/example/pkg2"
)

type T1 int

func (t *T1) Method1() {}
func (t T1) Method2()  {}

func main() {
	var t1 pkg2.T2
	fmt.Println(t1)

	var t2 pkg2.T2
	fmt.Println(t2)
}
"#
    );
    assert_eq!(report.edits.len(), 1);
    let edit = &report.edits[0];
    assert_eq!(edit.file, project.path().join("pkg1/main.go"));
    assert_eq!((edit.line, edit.column), (15, 9));
    assert_eq!(edit.line_text, "\tvar t1 T1");
}

#[test]
fn remote_to_local_prunes_import() {
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg1", "T1"));
    let (_project, result) = relocate_in("pkg1", &request);
    let (report, sink) = result.unwrap();

    assert_eq!(
        only_file(&sink),
        r#"package main

import (
	"fmt"
)

type T1 int

func (t *T1) Method1() {}
func (t T1) Method2()  {}

func main() {
	var t1 T1
	fmt.Println(t1)

	var t2 T1
	fmt.Println(t2)
}
"#
    );
    assert_eq!(report.edits.len(), 1);
    assert_eq!((report.edits[0].line, report.edits[0].column), (18, 9));
}

#[test]
fn remote_to_remote_swaps_imports() {
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg3", "T3"));
    let (_project, result) = relocate_in("pkg1", &request);
    let (_, sink) = result.unwrap();

    assert_eq!(
        only_file(&sink),
        r#"package main

import (
	"fmt"

	"example.com/refmove/example/pkg3"
)

type T1 int

func (t *T1) Method1() {}
func (t T1) Method2()  {}

func main() {
	var t1 T1
	fmt.Println(t1)

	var t2 pkg3.T3
	fmt.Println(t2)
}
"#
    );
}

#[test]
fn alias_collision_needs_override() {
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg3", "T3"));
    let (project, result) = relocate_in("collide", &request);
    match result {
        Err(RelocateError::AliasConflict { file, line, column, alias, existing }) => {
            assert_eq!(file, project.path().join("collide/collide.go"));
            assert_eq!((line, column), (1, 1));
            assert_eq!(alias, "pkg3");
            assert_eq!(existing, format!("{MODULE}/other/pkg3"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an alias conflict"),
    }
}

#[test]
fn alias_collision_with_override() {
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg3", "T3")).with_alias_override("pkg3alt");
    let (_project, result) = relocate_in("collide", &request);
    let (_, sink) = result.unwrap();

    assert_eq!(
        only_file(&sink),
        r#"package collide

import (
	"example.com/refmove/example/other/pkg3"
	pkg3alt "example.com/refmove/example/pkg3"
)

var Greeting = pkg3.Hello()

var Value pkg3alt.T3
"#
    );
}

#[test]
fn unrelated_module_is_untouched() {
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg3", "T3"));
    let (_project, result) = relocate_in("noop", &request);
    let (report, sink) = result.unwrap();
    assert!(report.edits.is_empty());
    assert!(report.modified.is_empty());
    assert!(sink.files.is_empty());
}

#[test]
fn same_source_and_destination_is_identity() {
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg2", "T2"));
    let (_project, result) = relocate_in("pkg1", &request);
    let (report, sink) = result.unwrap();
    assert_eq!(report.edits.len(), 1);
    assert_eq!(only_file(&sink), PKG1_MAIN);

    let request = RewriteRequest::new(sym("pkg1", "T1"), sym("pkg1", "T1"));
    let (_project, result) = relocate_in("pkg1", &request);
    let (_, sink) = result.unwrap();
    assert_eq!(only_file(&sink), PKG1_MAIN);
}

#[test]
fn import_stays_while_other_members_are_used() {
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg3", "T3"));
    let (_project, result) = relocate_in("keep", &request);
    let (_, sink) = result.unwrap();

    assert_eq!(
        only_file(&sink),
        r#"package keep

import (
	"example.com/refmove/example/pkg2"
	"example.com/refmove/example/pkg3"
)

var A pkg3.T3

var B pkg2.Other
"#
    );
}

#[test]
fn missing_local_target_is_fatal() {
    let request = RewriteRequest::new(sym("pkg1", "Missing"), sym("pkg2", "T2"));
    let (_project, result) = relocate_in("pkg1", &request);
    assert!(matches!(result, Err(RelocateError::TargetNotFound { ref name, .. }) if name == "Missing"));
}

#[test]
fn recursive_run_visits_modules_in_path_order() {
    let project = example_project();
    let options = LoadOptions::new(format!("{}/...", project.path().display()));
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg3", "T3")).with_alias_override("pkg3alt");
    let mut sink = MemorySink::new();
    let report = refmove::run(&options, &request, &mut sink).unwrap();

    let expected: Vec<PathBuf> = ["collide/collide.go", "keep/keep.go", "pkg1/main.go"]
        .iter()
        .map(|rel| project.path().join(rel))
        .collect();
    assert_eq!(report.modified, expected);
    assert_eq!(report.edits.len(), 3);
    // The override is only used where the default name is taken.
    assert!(sink.get(project.path().join("keep/keep.go")).unwrap().contains("var A pkg3.T3"));
}

#[test]
fn buffered_sink_writes_after_success() {
    let project = example_project();
    let options = LoadOptions::new(pattern(&project, "pkg1"));
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg3", "T3"));
    let mut sink = BufferedSink::new();
    refmove::run(&options, &request, &mut sink).unwrap();

    let written = read(&project, "pkg1/main.go");
    assert!(written.contains("var t2 pkg3.T3"));
    assert!(!written.contains("example/pkg2\""));
}

#[test]
fn buffered_sink_leaves_disk_alone_on_failure() {
    let project = example_project();
    let options = LoadOptions::new(format!("{}/...", project.path().display()));
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg3", "T3"));
    let mut sink = BufferedSink::new();
    let err = refmove::run(&options, &request, &mut sink).unwrap_err();
    assert!(matches!(err, RelocateError::AliasConflict { .. }));

    assert_eq!(read(&project, "pkg1/main.go"), PKG1_MAIN);
    assert_eq!(read(&project, "keep/keep.go"), include_str!("../fixtures/example/keep/keep.go"));
}

#[test]
fn overlay_replaces_disk_contents() {
    let project = example_project();
    let path = project.path().join("noop/noop.go");
    let options = LoadOptions::new(pattern(&project, "noop"))
        .with_overlay(&path, "package noop\n\nimport \"example.com/refmove/example/pkg2\"\n\nvar V pkg2.T2\n");
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg3", "T3"));
    let mut sink = MemorySink::new();
    refmove::run(&options, &request, &mut sink).unwrap();

    assert_eq!(
        sink.get(&path),
        Some("package noop\n\nimport \"example.com/refmove/example/pkg3\"\n\nvar V pkg3.T3\n")
    );
    assert!(read(&project, "noop/noop.go").contains("fmt.Println"));
}

#[test]
fn local_value_used_as_selector_base_is_relocated() {
    let project = example_project();
    let path = project.path().join("noop/noop.go");
    let source = "package noop

import \"fmt\"

type Counter struct{ N int }

func (c *Counter) Inc() { c.N++ }

var Default Counter

func Say() {
	Default.Inc()
	fmt.Println(Default.N)
}
";
    let options = LoadOptions::new(pattern(&project, "noop")).with_overlay(&path, source);
    let request = RewriteRequest::new(sym("noop", "Default"), sym("pkg2", "Shared"));
    let mut sink = MemorySink::new();
    let report = refmove::run(&options, &request, &mut sink).unwrap();

    let positions: Vec<(usize, usize)> = report.edits.iter().map(|e| (e.line, e.column)).collect();
    assert_eq!(positions, vec![(12, 2), (13, 14)]);
    assert_eq!(
        sink.get(&path),
        Some(
            r#"package noop

import (
	"fmt"

	"example.com/refmove/example/pkg2"
)

type Counter struct{ N int }

func (c *Counter) Inc() { c.N++ }

var Default Counter

func Say() {
	pkg2.Shared.Inc()
	fmt.Println(pkg2.Shared.N)
}
"#
        )
    );
}

#[test]
fn unparsable_package_outside_pattern_falls_back_to_names() {
    let project = example_project();
    let broken = project.path().join("pkg2/pkg2.go");
    let options = LoadOptions::new(pattern(&project, "pkg1")).with_overlay(&broken, "package pkg2\n\ntype T2 = \n");
    let request = RewriteRequest::new(sym("pkg2", "T2"), sym("pkg3", "T3"));
    let mut sink = MemorySink::new();
    let report = refmove::run(&options, &request, &mut sink).unwrap();

    assert_eq!(report.edits.len(), 1);
    let out = only_file(&sink);
    assert!(out.contains("\tvar t2 pkg3.T3\n"), "got:\n{out}");
    assert!(out.contains("\t\"example.com/refmove/example/pkg3\"\n"));
    assert!(!out.contains("example/pkg2\""));
}
