// mkpkginfo-aio/src/process.rs
use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::Duration;

use mkpkginfo_common::error::{MkPkgInfoError, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};

/// Runs an external command to completion and captures its output.
///
/// The command is killed if it has not finished within `timeout`. Optional
/// `stdin` bytes are written before waiting. Non-zero exit statuses are
/// returned as-is for the caller to judge.
pub fn run_command<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_command_async(program, args, stdin, timeout))
}

async fn run_command_async<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<Output> {
    let rendered: Vec<String> = args
        .iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect();
    debug!("Running command: {} {:?}", program, rendered);

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.kill_on_drop(true);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd.spawn().map_err(|e| {
        error!("Failed to execute {}: {}", program, e);
        MkPkgInfoError::CommandExec(format!("{program}: {e}"))
    })?;

    if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(data).await?;
        drop(pipe);
    }

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            if !output.status.success() {
                debug!("Command {} failed with status: {}", program, output.status);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.trim().is_empty() {
                    debug!("Stderr:\n{}", stderr.trim());
                }
            } else {
                debug!("Command {} finished successfully.", program);
            }
            Ok(output)
        }
        Ok(Err(e)) => {
            error!("Failed waiting for {}: {}", program, e);
            Err(MkPkgInfoError::from(e))
        }
        Err(_) => {
            error!("{} did not finish within {:?}; killed", program, timeout);
            Err(MkPkgInfoError::Timeout(
                format!("{} {}", program, rendered.join(" ")),
                timeout.as_secs(),
            ))
        }
    }
}
