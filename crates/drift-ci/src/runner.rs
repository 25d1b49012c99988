use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::Context;

use crate::debug;

/// Result of one terraform invocation. `plan_output` is populated only for
/// captured runs; the exit code is -1 when the child died to a signal.
pub struct RunOutcome {
    pub exit_code: i32,
    pub plan_output: String,
}

/// Terraform binary name, overridable for tfenv shims and tests.
pub fn resolve_binary() -> String {
    std::env::var("TERRAFORM_BINARY")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "terraform".to_string())
}

/// Run terraform with the given arguments. A captured run tees the child's
/// stdout and stderr to the parent's streams while collecting both; other
/// runs inherit the parent's stdio directly. An `Err` means the child never
/// ran at all.
pub fn run_terraform(
    binary: &str,
    args: &[String],
    terraform_version: &str,
    capture: bool,
) -> anyhow::Result<RunOutcome> {
    // PATH resolution up front; absolute overrides pass through untouched
    // and a missing binary falls through to the spawn error.
    let program = which::which(binary).unwrap_or_else(|_| PathBuf::from(binary));

    debug::log(format!("Executing: {} {}", binary, args.join(" ")));

    let mut command = Command::new(&program);
    command
        .args(args)
        .env("TFENV_TERRAFORM_VERSION", terraform_version);

    if !capture {
        let status = command
            .status()
            .with_context(|| format!("failed to run {binary}"))?;
        return Ok(RunOutcome {
            exit_code: status.code().unwrap_or(-1),
            plan_output: String::new(),
        });
    }

    let mut child = command
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to run {binary}"))?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || match stdout_pipe {
        Some(pipe) => tee(pipe, std::io::stdout()),
        None => Vec::new(),
    });
    let stderr_thread = std::thread::spawn(move || match stderr_pipe {
        Some(pipe) => tee(pipe, std::io::stderr()),
        None => Vec::new(),
    });

    let status = child
        .wait()
        .with_context(|| format!("failed to run {binary}"))?;

    // Stdout first, then stderr, matching what the server renders.
    let mut captured = stdout_thread.join().unwrap_or_default();
    captured.extend(stderr_thread.join().unwrap_or_default());

    Ok(RunOutcome {
        exit_code: status.code().unwrap_or(-1),
        plan_output: String::from_utf8_lossy(&captured).into_owned(),
    })
}

/// Copy `reader` into a buffer while mirroring every chunk to `mirror`.
/// Mirror failures are ignored; capture continues so the report still
/// carries the output.
fn tee<R: Read, W: Write>(mut reader: R, mut mirror: W) -> Vec<u8> {
    let mut captured = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                captured.extend_from_slice(&buf[..n]);
                let _ = mirror.write_all(&buf[..n]);
                let _ = mirror.flush();
            }
        }
    }
    captured
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
