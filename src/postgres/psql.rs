// ABOUTME: Wrapper for the psql client used for catalog lookups and masked row export
// ABOUTME: Defines the QueryTool seam so the dump pipeline can run against fakes

use crate::config::QueryOptions;
use crate::utils;
use anyhow::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use tokio::io::AsyncWrite;

/// Query collaborator used by the dump pipeline
///
/// Statements and results are raw bytes in the client encoding, so names and
/// values recovered from a non-UTF-8 dump go back to the server unchanged.
#[async_trait]
pub trait QueryTool: Send + Sync {
    /// Run one statement and return its bare result
    ///
    /// Trailing line breaks are removed. An empty result means no rows or a
    /// NULL value.
    async fn query(&self, sql: &[u8]) -> Result<Vec<u8>>;

    /// Run one statement and stream its whole output into `out`
    ///
    /// Returns the number of bytes written.
    async fn copy_out(&self, sql: &[u8], out: &mut (dyn AsyncWrite + Unpin + Send)) -> Result<u64>;
}

/// The `psql` command-line client
#[derive(Debug, Clone)]
pub struct Psql {
    options: QueryOptions,
}

impl Psql {
    pub fn new(options: QueryOptions) -> Self {
        Self { options }
    }

    fn command_args(&self, sql: &[u8]) -> Vec<OsString> {
        let mut args = vec![utils::flag_arg("--command", sql)];
        args.extend(self.options.args().iter().map(OsString::from));
        args
    }
}

#[async_trait]
impl QueryTool for Psql {
    async fn query(&self, sql: &[u8]) -> Result<Vec<u8>> {
        let output = utils::run_captured("psql", &self.command_args(sql), &self.options.envs()).await?;
        Ok(trim_result(&output).to_vec())
    }

    async fn copy_out(&self, sql: &[u8], out: &mut (dyn AsyncWrite + Unpin + Send)) -> Result<u64> {
        utils::run_streamed("psql", &self.command_args(sql), &self.options.envs(), out).await
    }
}

/// Strip the line terminator psql appends to a result
fn trim_result(output: &[u8]) -> &[u8] {
    output
        .strip_suffix(b"\r\n")
        .or_else(|| output.strip_suffix(b"\n"))
        .unwrap_or(output)
}
