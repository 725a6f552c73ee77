use branchbar_core::error::{Error, ErrorKind};
use branchbar_core::services::Result;
use std::io::Read;
use std::process::{Child, ChildStderr, ChildStdout, Command, Output, Stdio};
use std::str;
use std::thread;
use std::time::{Duration, Instant};

/// Wall-clock bound on every git invocation. A hung subprocess (network
/// fetch, credential prompt with no terminal) is killed rather than left to
/// block the caller indefinitely.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(20);

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub fn run_git_simple(cmd: Command, label: &str) -> Result<()> {
    let output = run_with_timeout(cmd)?;

    if !output.status.success() {
        let stderr = str::from_utf8(&output.stderr).unwrap_or("<non-utf8 stderr>");
        return Err(Error::command(failure_message(label, stderr)));
    }

    Ok(())
}

pub fn run_git_capture(cmd: Command, label: &str) -> Result<String> {
    let output = run_with_timeout(cmd)?;

    if !output.status.success() {
        let stderr = str::from_utf8(&output.stderr).unwrap_or("<non-utf8 stderr>");
        return Err(Error::command(failure_message(label, stderr)));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn failure_message(label: &str, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{label} failed")
    } else {
        format!("{label} failed: {stderr}")
    }
}

/// Runs `cmd` to completion, killing it when `COMMAND_TIMEOUT` elapses.
/// Output pipes are drained on separate threads while the child runs so a
/// chatty command cannot deadlock on a full pipe.
fn run_with_timeout(mut cmd: Command) -> Result<Output> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::new(ErrorKind::Io(e.kind())))?;

    let stdout = spawn_stdout_reader(child.stdout.take());
    let stderr = spawn_stderr_reader(child.stderr.take());

    let status = wait_with_deadline(&mut child)?;

    let stdout = stdout
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default();
    let stderr = stderr
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default();

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn wait_with_deadline(child: &mut Child) -> Result<std::process::ExitStatus> {
    let deadline = Instant::now() + COMMAND_TIMEOUT;
    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|e| Error::new(ErrorKind::Io(e.kind())))?
        {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::new(ErrorKind::Timeout(COMMAND_TIMEOUT.as_secs())));
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn spawn_stdout_reader(pipe: Option<ChildStdout>) -> Option<thread::JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn spawn_stderr_reader(pipe: Option<ChildStderr>) -> Option<thread::JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}
