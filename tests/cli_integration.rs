//! End-to-end tests running the lined binary in a scratch directory

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lined"));
    cmd.args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env("LINED_CONFIG", dir.join("config.toml"))
        .env("NO_COLOR", "1")
        .env_remove("LINED_LOG");
    cmd
}

fn lined(dir: &Path, args: &[&str]) -> Output {
    command(dir, args)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run lined")
}

fn lined_with_input(dir: &Path, args: &[&str], input: &str) -> Output {
    let mut child = command(dir, args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run lined");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_edit_session() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();

    assert!(lined(d, &["-cr", "f.txt"]).status.success());
    assert!(lined(d, &["-la", "f.txt", "hello"]).status.success());
    assert!(lined(d, &["-la", "f.txt", "world"]).status.success());

    let shown = lined(d, &["-sh", "f.txt"]);
    assert!(shown.status.success());
    assert_eq!(stdout(&shown), "1 |hello\n2 |world\n");

    assert!(lined(d, &["-lrp", "f.txt", "HI", "1"]).status.success());
    assert_eq!(fs::read_to_string(d.join("f.txt")).unwrap(), "HI\nworld");

    assert!(lined(d, &["-ldl", "f.txt", "1"]).status.success());
    let count = lined(d, &["-cl", "f.txt"]);
    assert_eq!(stdout(&count), "'f.txt' has 1 lines\n");

    let log = fs::read_to_string(d.join("editorback.log")).unwrap();
    assert_eq!(log.lines().count(), 5);
}

#[test]
fn test_subcommand_spelling() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();

    assert!(lined(d, &["cr", "g.txt"]).status.success());
    assert!(lined(d, &["la", "g.txt", "-dash first"]).status.success());
    let line = lined(d, &["lsh", "g.txt", "1"]);
    assert_eq!(stdout(&line), "-dash first\n");
}

#[test]
fn test_usage_errors_exit_with_one() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();

    assert_eq!(lined(d, &[]).status.code(), Some(1));
    assert_eq!(lined(d, &["-la", "f.txt"]).status.code(), Some(1));
    assert_eq!(lined(d, &["-bogus", "f.txt"]).status.code(), Some(1));
    assert_eq!(lined(d, &["--help"]).status.code(), Some(0));
}

#[test]
fn test_invalid_line_number() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    fs::write(d.join("f.txt"), "a\nb").unwrap();

    let out = lined(d, &["-ldl", "f.txt", "1x"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("invalid line number"));
    assert_eq!(fs::read_to_string(d.join("f.txt")).unwrap(), "a\nb");
}

#[test]
fn test_line_out_of_range() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    fs::write(d.join("f.txt"), "a\nb").unwrap();

    let out = lined(d, &["-lsh", "f.txt", "3"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("out of range"));

    let out = lined(d, &["-lin", "f.txt", "x", "0"]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(fs::read_to_string(d.join("f.txt")).unwrap(), "a\nb");
    assert!(!d.join("editorback.log").exists());
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let out = lined(dir.path(), &["-sh", "nope.txt"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("does not exist"));
}

#[test]
fn test_overwrite_prompt() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    fs::write(d.join("f.txt"), "keep").unwrap();

    let out = lined_with_input(d, &["-cr", "f.txt"], "x\nn\n");
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("already exists and will be overwritten"));
    assert!(stdout(&out).contains("Invalid input."));
    assert_eq!(fs::read_to_string(d.join("f.txt")).unwrap(), "keep");

    let out = lined_with_input(d, &["-cr", "f.txt"], "y\n");
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(d.join("f.txt")).unwrap(), "");

    fs::write(d.join("f.txt"), "again").unwrap();
    assert!(lined(d, &["-cr", "--yes", "f.txt"]).status.success());
    assert_eq!(fs::read_to_string(d.join("f.txt")).unwrap(), "");
}

#[test]
fn test_copy() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    fs::write(d.join("src.txt"), "one\ntwo\n").unwrap();

    assert!(lined(d, &["-cp", "src.txt", "dst.txt"]).status.success());
    assert_eq!(fs::read_to_string(d.join("dst.txt")).unwrap(), "one\ntwo\n");
    let log = fs::read_to_string(d.join("editorback.log")).unwrap();
    assert!(log.contains("File 'src.txt' copied to 'dst.txt' | Lines After = 3"));
}

#[test]
fn test_search_output() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    fs::write(d.join("f.txt"), "hello\nworld").unwrap();

    let out = lined(d, &["-sch", "f.txt", "l"]);
    assert_eq!(
        stdout(&out),
        "2 instance/s:\n1 |hello\n\n1 instance/s:\n2 |world\n\n3 instance/s found in the file.\n"
    );

    let out = lined(d, &["-schreg", "f.txt", "^W"]);
    assert_eq!(stdout(&out), "2 |world\n\n1 line matches found in the file.\n");

    let out = lined(d, &["-schreg", "f.txt", "("]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("invalid pattern"));
}

#[test]
fn test_replace_and_log() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    fs::write(d.join("f.txt"), "foo bar\nbaz foo").unwrap();
    fs::write(d.join("other.txt"), "x").unwrap();

    let out = lined(d, &["-rp", "f.txt", "foo", "qux"]);
    assert!(out.status.success());
    assert!(stdout(&out).ends_with("2 instances replaced in the file.\n"));
    assert_eq!(fs::read_to_string(d.join("f.txt")).unwrap(), "qux bar\nbaz qux");

    assert!(lined(d, &["-la", "other.txt", "y"]).status.success());

    let all = lined(d, &["-chlog"]);
    assert_eq!(stdout(&all).lines().count(), 2);

    let filtered = lined(d, &["-chlog", "f.txt"]);
    let shown = stdout(&filtered);
    assert_eq!(shown.lines().count(), 1);
    assert!(shown.contains("Instances of \"foo\" replaced by \"qux\" | Lines After = 2"));
}

#[test]
fn test_log_missing() {
    let dir = TempDir::new().unwrap();
    let out = lined(dir.path(), &["-chlog"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("does not exist"));
}

#[test]
fn test_config_limits_apply() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    fs::write(d.join("config.toml"), "[limits]\nmax_string_length = 4\n").unwrap();
    fs::write(d.join("f.txt"), "a").unwrap();

    let out = lined(d, &["-la", "f.txt", "toolong"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("too long (max 4)"));

    fs::write(d.join("config.toml"), "[log\n").unwrap();
    let out = lined(d, &["-cl", "f.txt"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Malformed config file"));
}
