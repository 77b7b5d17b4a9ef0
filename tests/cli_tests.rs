use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn xtempl() -> Command {
    let exe = std::env::var("CARGO_BIN_EXE_xtempl").expect("xtempl binary path");
    Command::new(exe)
}

fn run_with_stdin(args: &[&str], input: &str) -> Output {
    let mut child = xtempl()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn xtempl");
    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for xtempl")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8(output.stdout.clone())
        .expect("stdout is UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is a JSON report"))
        .collect()
}

#[test]
fn stdin_json_reports_path_output_and_summary() {
    let output = run_with_stdin(&["compile", "--stdin", "--json"], "<x-card title=\"hi\"/>");
    assert!(output.status.success());

    let reports = json_lines(&output);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["path"], "<stdin>");
    assert_eq!(reports[0]["output"], "{{ template \"card\" dict \"title\" \"hi\" }}");
    assert_eq!(reports[0]["summary"]["components"], 1);
    assert_eq!(reports[0]["summary"]["child_blocks"], 0);
    assert!(reports[0].get("error").is_none());
}

#[test]
fn stdin_json_reports_errors_as_json() {
    let output = run_with_stdin(&["compile", "--stdin", "--json"], "<x-card>");
    assert!(!output.status.success());

    let reports = json_lines(&output);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["path"], "<stdin>");
    let error = reports[0]["error"].as_str().expect("error field");
    assert!(error.contains("<x-card> is never closed"), "error: {error}");
    assert!(reports[0].get("summary").is_none());
}

#[test]
fn file_json_report_carries_the_path() {
    let temp = TempDir::new().expect("tempdir");
    let file = temp.path().join("widget.html");
    fs::write(&file, "<x-badge label=\"New\"/>").expect("write template");

    let output = xtempl()
        .args(["compile", "--json"])
        .arg(&file)
        .output()
        .expect("run xtempl");
    assert!(output.status.success());

    let reports = json_lines(&output);
    assert_eq!(reports.len(), 1);
    let path = reports[0]["path"].as_str().expect("path field");
    assert!(path.ends_with("widget.html"), "path: {path}");
    assert_eq!(reports[0]["output"], "{{ template \"badge\" dict \"label\" \"New\" }}");
    assert_eq!(reports[0]["summary"]["components"], 1);
}

#[test]
fn directory_json_emits_one_report_per_file() {
    let temp = TempDir::new().expect("tempdir");
    let src = temp.path().join("views");
    let out = temp.path().join("build");
    fs::create_dir_all(&src).expect("create views dir");
    fs::write(src.join("good.html"), "<x-a/>").expect("write template");
    fs::write(src.join("bad.html"), "<x-b>").expect("write template");

    let output = xtempl()
        .args(["compile", "--json", "--out"])
        .arg(&out)
        .arg(&src)
        .output()
        .expect("run xtempl");
    // bad.html fails, so the run does.
    assert!(!output.status.success());

    let reports = json_lines(&output);
    assert_eq!(reports.len(), 2);

    let good = reports
        .iter()
        .find(|r| r["path"].as_str().map_or(false, |p| p.ends_with("good.html")))
        .expect("report for good.html");
    assert_eq!(good["summary"]["components"], 1);
    // Compiled text went to --out, not into the report.
    assert!(good.get("output").is_none());

    let bad = reports
        .iter()
        .find(|r| r["path"].as_str().map_or(false, |p| p.ends_with("bad.html")))
        .expect("report for bad.html");
    let error = bad["error"].as_str().expect("error field");
    assert!(error.contains("<x-b> is never closed"), "error: {error}");

    let written = fs::read_to_string(out.join("good.html")).expect("compiled file");
    assert_eq!(written, "{{ template \"a\" }}");
}
