//! End-to-end scenarios from spec §8. These spawn real child processes
//! and drive them through the live `SIGCHLD` reaper, so they live under
//! `tests/` rather than as unit tests — a real supervisor test suite
//! needs a live child, not a mock.

use rt_supervisor::{LaunchRequest, ProcessRunState, StreamSpec, Supervisor};
use std::io::{BufRead, Read, Write};
use std::thread::sleep;
use std::time::Duration;

fn request(file: &str, argv: &[&str], in_spec: StreamSpec, out_spec: StreamSpec, err_spec: StreamSpec) -> LaunchRequest {
    LaunchRequest {
        file: file.to_string(),
        argv: argv.iter().map(|s| s.to_string()).collect(),
        in_spec,
        out_spec,
        err_spec,
        user_id: None,
        cleanup_files: true,
        working_dir: None,
        env: None,
    }
}

#[test]
fn echo_roundtrip() {
    let supervisor = Supervisor::install();
    let mut process = supervisor
        .launch(request("cat", &["cat"], StreamSpec::ProcessIn, StreamSpec::ProcessOut, StreamSpec::ProcessErr))
        .expect("launch cat");

    process.stdin.as_mut().expect("stdin pipe").write_all(b"hello\n").unwrap();
    process.stdin = None; // closes the parent-side write end, sending EOF to cat

    let state = supervisor.retrieve_state(&process, true);
    assert_eq!(state.state, ProcessRunState::Done);
    assert_eq!(state.code, 0);

    let mut out = String::new();
    process.stdout.as_mut().unwrap().read_to_string(&mut out).unwrap();
    assert_eq!(out, "hello\n");
}

#[test]
fn exit_code_is_reported() {
    let supervisor = Supervisor::install();
    let process = supervisor
        .launch(request(
            "sh",
            &["sh", "-c", "exit 7"],
            StreamSpec::StandardIn,
            StreamSpec::StandardOut,
            StreamSpec::StandardErr,
        ))
        .expect("launch sh");

    let state = supervisor.retrieve_state(&process, true);
    assert_eq!(state.state, ProcessRunState::Done);
    assert_eq!(state.code, 7);
}

#[test]
fn signal_termination_is_reported() {
    let supervisor = Supervisor::install();
    let process = supervisor
        .launch(request(
            "sh",
            &["sh", "-c", "kill -TERM $$"],
            StreamSpec::StandardIn,
            StreamSpec::StandardOut,
            StreamSpec::StandardErr,
        ))
        .expect("launch sh");

    let state = supervisor.retrieve_state(&process, true);
    assert_eq!(state.state, ProcessRunState::Terminated);
    assert_eq!(state.code, libc::SIGTERM);
}

#[test]
fn non_blocking_poll_observes_running_then_done() {
    let supervisor = Supervisor::install();
    let process = supervisor
        .launch(request(
            "sh",
            &["sh", "-c", "sleep 0.2"],
            StreamSpec::StandardIn,
            StreamSpec::StandardOut,
            StreamSpec::StandardErr,
        ))
        .expect("launch sh");

    let first = supervisor.retrieve_state(&process, false);
    assert_eq!(first.state, ProcessRunState::Running);
    assert_eq!(first.code, 0);

    sleep(Duration::from_millis(500));
    let second = supervisor.retrieve_state(&process, false);
    assert_eq!(second.state, ProcessRunState::Done);
    assert_eq!(second.code, 0);
}

#[test]
fn working_dir_is_honored_on_launch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let canonical = dir.path().canonicalize().expect("canonicalize tempdir");

    let supervisor = Supervisor::install();
    let mut request = request(
        "sh",
        &["sh", "-c", "pwd"],
        StreamSpec::StandardIn,
        StreamSpec::ProcessOut,
        StreamSpec::StandardErr,
    );
    request.working_dir = Some(canonical.to_string_lossy().into_owned());
    let mut process = supervisor.launch(request).expect("launch sh");

    let state = supervisor.retrieve_state(&process, true);
    assert_eq!(state.state, ProcessRunState::Done);
    assert_eq!(state.code, 0);

    let mut out = String::new();
    process.stdout.as_mut().unwrap().read_to_string(&mut out).unwrap();
    assert_eq!(out.trim_end(), canonical.to_string_lossy());
}

#[test]
fn stderr_cross_wires_onto_stdout_pipe() {
    let supervisor = Supervisor::install();
    let mut process = supervisor
        .launch(request(
            "sh",
            &["sh", "-c", "echo out; echo err >&2"],
            StreamSpec::StandardIn,
            StreamSpec::ProcessOut,
            StreamSpec::ProcessOut,
        ))
        .expect("launch sh");

    assert!(process.stderr.is_none());

    let state = supervisor.retrieve_state(&process, true);
    assert_eq!(state.state, ProcessRunState::Done);

    let stdout = process.stdout.take().unwrap();
    let lines: Vec<String> = stdout.lines().map(|l| l.unwrap()).collect();
    assert_eq!(lines, vec!["out".to_string(), "err".to_string()]);
}
