use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn shell(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mini-shell"));
    cmd.current_dir(dir).env_remove("MINI_SHELL_CONFIG");
    cmd
}

fn run_line(dir: &Path, line: &str) -> Output {
    shell(dir).args(["-c", line]).output().expect("failed to run mini-shell")
}

fn run_stdin(dir: &Path, input: &str) -> Output {
    let mut child = shell(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn mini-shell");
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
fn pipeline_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_line(dir.path(), "echo hi | cat");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "hi\n");
}

#[test]
fn three_stage_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("words"), "b\na\nb\n").unwrap();
    let output = run_line(dir.path(), "cat words | sort | uniq");
    assert_eq!(stdout(&output), "a\nb\n");
}

#[test]
fn output_redirection_writes_file_only() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_line(dir.path(), "echo x > out.txt");
    assert_eq!(stdout(&output), "");
    assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "x\n");
}

#[test]
fn input_redirection_in_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.txt"), "one\ntwo\n").unwrap();
    let output = run_line(dir.path(), "cat < in.txt | wc -l");
    assert_eq!(stdout(&output).trim(), "2");
}

#[test]
fn sequence_continues_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_line(dir.path(), "false ; echo after");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "after\n");
}

#[test]
fn quoted_semicolon_is_one_argument() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_line(dir.path(), "echo \"a;b\"");
    assert_eq!(stdout(&output), "a;b\n");
}

#[test]
fn missing_command_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_line(dir.path(), "no-such-program-for-mini-shell arg; echo next");
    assert_eq!(
        stderr(&output),
        "no-such-program-for-mini-shell: command not found\n"
    );
    assert_eq!(stdout(&output), "next\n");
}

#[test]
fn failed_cd_keeps_directory() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_line(dir.path(), "cd /nonexistent/mini-shell ; pwd");
    assert!(stderr(&output).starts_with("cd: "));
    let cwd = fs::canonicalize(dir.path()).unwrap();
    assert_eq!(stdout(&output).trim_end(), cwd.to_string_lossy());
}

#[test]
fn cd_applies_to_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let output = run_line(dir.path(), "cd sub; pwd");
    let sub = fs::canonicalize(dir.path().join("sub")).unwrap();
    assert_eq!(stdout(&output).trim_end(), sub.to_string_lossy());
}

#[test]
fn prev_without_history() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_stdin(dir.path(), "prev\n");
    assert!(stdout(&output).contains("No previous command.\n"));
}

#[test]
fn prev_reruns_last_line() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_stdin(dir.path(), "echo again\nprev\n");
    let out = stdout(&output);
    assert_eq!(out.matches("again\n").count(), 3, "{out}");
}

#[test]
fn script_argument_runs_file() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script.sh");
    fs::write(&script, "echo first\n\necho second | cat\n").unwrap();
    let output = shell(dir.path()).arg(&script).output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "first\nsecond\n");
}

#[test]
fn source_builtin_runs_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lines"), "echo sourced\n").unwrap();
    let output = run_line(dir.path(), "source lines; echo done");
    assert_eq!(stdout(&output), "sourced\ndone\n");
}

#[test]
fn repl_greets_and_says_goodbye_at_eof() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_stdin(dir.path(), "echo hi\n");
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("Welcome to mini-shell.\n"), "{out}");
    assert!(out.contains("hi\n"));
    assert!(out.ends_with("Bye bye.\n"), "{out}");
}

#[test]
fn piped_input_still_shows_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_stdin(dir.path(), "echo hi\n");
    assert_eq!(
        stdout(&output),
        "Welcome to mini-shell.\nshell $ hi\nshell $ Bye bye.\n"
    );
}

#[test]
fn head_closing_the_pipe_ends_the_producer() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_line(dir.path(), "sh -c \"while :; do echo y; done\" | head -n 1");
    assert_eq!(stdout(&output), "y\n");
}

#[test]
fn builtin_extra_words_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let output = run_line(dir.path(), "cd sub extra; pwd; help x");
    let sub = fs::canonicalize(dir.path().join("sub")).unwrap();
    let out = stdout(&output);
    assert!(out.starts_with(&format!("{}\n", sub.display())), "{out}");
    assert!(out.contains("Built-in commands:"));
    assert_eq!(stderr(&output), "");
}

#[test]
fn repl_exit_stops_reading() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_stdin(dir.path(), "exit\necho late\n");
    let out = stdout(&output);
    assert!(out.ends_with("Bye bye.\n"));
    assert!(!out.contains("late"));
}

#[test]
fn builtin_inside_pipeline_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_line(dir.path(), "cd / | echo ok");
    assert_eq!(stdout(&output), "ok\n");
    assert_eq!(stderr(&output), "cd: builtin not supported in a pipeline\n");
}

#[test]
fn config_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("shell.toml");
    fs::write(&config, "farewell = \"Ciao.\"\n").unwrap();
    let output = shell(dir.path())
        .env("MINI_SHELL_CONFIG", &config)
        .args(["-c", "exit"])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "Ciao.\n");
}

#[test]
fn bad_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("shell.toml");
    fs::write(&config, "max_nesting = \"many\"\n").unwrap();
    let output = shell(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["-c", "exit"])
        .output()
        .unwrap();
    assert!(stderr(&output).contains("using defaults"));
    assert_eq!(stdout(&output), "Bye bye.\n");
}

#[test]
fn log_file_receives_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("shell.log");
    let output = shell(dir.path())
        .args(["--log-level", "debug", "--log-file"])
        .arg(&log)
        .args(["-c", "echo logged | cat"])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "logged\n");
    assert!(!fs::read_to_string(&log).unwrap().is_empty());
}
