mod common;

use common::*;

fn args(project: &tempfile::TempDir, pkg: &str, from: &str, to: &str) -> Vec<String> {
    vec![
        "--from".into(),
        format!("{MODULE}/{from}"),
        "--to".into(),
        format!("{MODULE}/{to}"),
        pattern(project, pkg),
    ]
}

#[test]
fn prints_header_edits_and_files() {
    let project = example_project();
    let output = refmove().args(args(&project, "pkg1", "pkg2.T2", "pkg3.T3")).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();

    let header = format!(
        "dir:{}\nfrom package: \"{MODULE}/pkg2\", symbol:\"T2\"\nto   package: \"{MODULE}/pkg3\", symbol:\"T3\"\n\n",
        pattern(&project, "pkg1")
    );
    assert!(stdout.starts_with(&header), "got:\n{stdout}");
    let file = project.path().join("pkg1/main.go");
    assert!(stdout.contains(&format!("{}:18:9 \tvar t2 pkg2.T2\n", file.display())));
    assert!(stdout.contains(&format!("file: {}\npackage main\n", file.display())));
    assert!(stdout.contains("\tvar t2 pkg3.T3\n"));

    // Nothing is written without -w.
    assert!(read(&project, "pkg1/main.go").contains("pkg2.T2"));
}

#[test]
fn header_mentions_override() {
    let project = example_project();
    let output = refmove()
        .args(args(&project, "collide", "pkg2.T2", "pkg3.T3"))
        .args(["--to-pkg-name", "pkg3alt"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("symbol:\"T3\" (package name if duplication: \"pkg3alt\")\n\n"));
    assert!(stdout.contains("var Value pkg3alt.T3"));
}

#[test]
fn write_updates_files_in_place() {
    let project = example_project();
    let output = refmove().args(args(&project, "pkg1", "pkg1.T1", "pkg2.T2")).arg("-w").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("file: "));
    assert!(stdout.contains(":15:9 \tvar t1 T1"));
    let written = read(&project, "pkg1/main.go");
    assert!(written.contains("var t1 pkg2.T2"));
    assert!(written.contains("func (t *T1) Method1() {}"));
}

#[test]
fn json_report() {
    let project = example_project();
    let output = refmove().args(args(&project, "pkg1", "pkg2.T2", "pkg3.T3")).arg("--json").output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let edits = report["edits"].as_array().unwrap();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0]["line"], 18);
    assert_eq!(edits[0]["column"], 9);
    assert_eq!(edits[0]["line_text"], "\tvar t2 pkg2.T2");
    assert_eq!(report["modified"].as_array().unwrap().len(), 1);
}

#[test]
fn conflict_exits_nonzero() {
    let project = example_project();
    let output = refmove().args(args(&project, "collide", "pkg2.T2", "pkg3.T3")).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("please set --to-pkg-name"), "stderr: {stderr}");
}

#[test]
fn symbol_without_name_is_rejected() {
    let output = refmove().args(["--from", "nodot", "--to", "a/b.C"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("import/path.Name"));
}
