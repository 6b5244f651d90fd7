use anyhow::{Context, Result, bail};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command as TokioCommand;

/// Default budget for a single shell call.
pub const DEFAULT_TIMEOUT_MS: u64 = 1500;

pub async fn run_cmd_timeout_async(
    program: &str,
    args: &[&str],
    timeout_ms: u64,
) -> Result<Output> {
    let timeout = Duration::from_millis(timeout_ms);

    tokio::time::timeout(
        timeout,
        TokioCommand::new(program).args(args).kill_on_drop(true).output(),
    )
    .await
    .with_context(|| format!("Command timeout: {} {}", program, args.join(" ")))?
    .with_context(|| format!("Failed to execute: {}", program))
}

/// Runs a command and returns trimmed stdout, failing on a non-zero exit.
pub async fn run_stdout(program: &str, args: &[&str]) -> Result<String> {
    let out = run_cmd_timeout_async(program, args, DEFAULT_TIMEOUT_MS).await?;
    if !out.status.success() {
        bail!(
            "{} {} exited with {}: {}",
            program,
            args.join(" "),
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

/// Runs a command for its side effect only.
pub async fn run_checked(program: &str, args: &[&str]) -> Result<()> {
    run_stdout(program, args).await.map(|_| ())
}
