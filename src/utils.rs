// ABOUTME: Utility functions for tool discovery and child processes
// ABOUTME: Provides PATH checks, identifier sanitizing, and pg_dump/psql process plumbing

use crate::error::DumpError;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWrite};
use tokio::process::Command;
use which::which;

/// PostgreSQL client tools needed to produce an anonymized dump
pub const REQUIRED_TOOLS: [&str; 2] = ["psql", "pg_dump"];

/// Check that required PostgreSQL client tools are available
///
/// Verifies that `psql` (masking rule lookups and masked row export) and
/// `pg_dump` (DDL and sequence export) are installed and in PATH.
///
/// # Errors
///
/// Returns [`DumpError::MissingTools`] with installation instructions if any
/// tool is missing.
///
/// # Examples
///
/// ```
/// # use pg_dump_anon::utils::check_required_tools;
/// # use anyhow::Result;
/// # fn example() -> Result<()> {
/// check_required_tools()?;
/// # Ok(())
/// # }
/// ```
pub fn check_required_tools() -> Result<()> {
    let missing: Vec<String> = REQUIRED_TOOLS
        .iter()
        .filter(|tool| which(tool).is_err())
        .map(|tool| tool.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(DumpError::MissingTools(missing).into());
    }

    Ok(())
}

/// Sanitize an identifier (table name, schema name, etc.) for display
///
/// Removes control characters and limits length to prevent log injection attacks
/// and ensure readable error messages.
///
/// **Note**: This is for display purposes only. It does not make an identifier
/// safe to splice into SQL.
///
/// # Examples
///
/// ```
/// # use pg_dump_anon::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("public.customers"), "public.customers");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
///
/// let long_name = "a".repeat(200);
/// assert_eq!(sanitize_identifier(&long_name).len(), 100);
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Turn raw bytes into a command-line argument without re-encoding them
///
/// Identifiers and SQL recovered from a dump are in the dump's encoding, which
/// need not be UTF-8. On unix the bytes are passed through untouched.
#[cfg(unix)]
pub fn arg_from_bytes(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(bytes).to_os_string()
}

/// Turn raw bytes into a command-line argument
///
/// Windows arguments are UTF-16, so bytes that are not UTF-8 cannot be
/// passed through and are replaced.
#[cfg(not(unix))]
pub fn arg_from_bytes(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Build a `--flag=value` argument from a raw byte value
pub fn flag_arg(flag: &str, value: &[u8]) -> OsString {
    let mut arg = Vec::with_capacity(flag.len() + 1 + value.len());
    arg.extend_from_slice(flag.as_bytes());
    arg.push(b'=');
    arg.extend_from_slice(value);
    arg_from_bytes(&arg)
}

/// Strip leading and trailing ASCII whitespace
pub fn trim_bytes(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |pos| pos + 1);
    &bytes[start..end]
}

/// Run a client tool to completion and return its standard output
///
/// Standard input is inherited so that password prompts keep working.
pub async fn run_captured(program: &str, args: &[OsString], envs: &[(String, String)]) -> Result<Vec<u8>> {
    tracing::debug!("Running {} with {} argument(s)", program, args.len());

    let output = Command::new(program)
        .args(args)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to execute {}. Is PostgreSQL client installed?", program))?;

    if !output.status.success() {
        return Err(DumpError::ToolFailed {
            tool: program.to_string(),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        }
        .into());
    }

    Ok(output.stdout)
}

/// Run a client tool and copy its standard output into `out` as it is produced
///
/// Nothing is buffered beyond the copy window, so arbitrarily large exports
/// pass through. Standard error is drained concurrently and reported if the
/// tool exits with a nonzero status. If `out` stops accepting data the tool
/// is killed and the write error is returned.
///
/// Returns the number of bytes written to `out`.
pub async fn run_streamed(
    program: &str,
    args: &[OsString],
    envs: &[(String, String)],
    out: &mut (dyn AsyncWrite + Unpin + Send),
) -> Result<u64> {
    tracing::debug!("Streaming {} with {} argument(s)", program, args.len());

    let mut child = Command::new(program)
        .args(args)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to execute {}. Is PostgreSQL client installed?", program))?;

    let mut stdout = child
        .stdout
        .take()
        .with_context(|| format!("Failed to capture {} output", program))?;
    let mut stderr = child
        .stderr
        .take()
        .with_context(|| format!("Failed to capture {} diagnostics", program))?;

    let stderr_reader = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr.read_to_end(&mut buf).await.map(|_| buf)
    });

    let copied = match tokio::io::copy(&mut stdout, out).await {
        Ok(copied) => copied,
        Err(err) => {
            stderr_reader.abort();
            if let Err(kill_err) = child.kill().await {
                tracing::debug!("Failed to stop {}: {}", program, kill_err);
            }
            return Err(err).with_context(|| format!("Failed to write {} output", program));
        }
    };

    let status = child
        .wait()
        .await
        .with_context(|| format!("Failed to wait for {}", program))?;

    let diagnostics = stderr_reader
        .await
        .context("Diagnostics reader panicked")?
        .with_context(|| format!("Failed to read {} diagnostics", program))?;

    if !status.success() {
        return Err(DumpError::ToolFailed {
            tool: program.to_string(),
            status: status.code(),
            stderr: String::from_utf8_lossy(&diagnostics).trim_end().to_string(),
        }
        .into());
    }

    Ok(copied)
}
