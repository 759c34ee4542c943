// ABOUTME: In-memory pg_dump and psql stand-ins for unit tests
// ABOUTME: Record every invocation and answer from canned responses

use crate::config::{DumpArgs, DumpConfig};
use crate::dump::DumpTool;
use crate::error::DumpError;
use crate::postgres::QueryTool;
use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use std::ffi::OsString;
use std::sync::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Configuration for the given command line, program name excluded
pub(crate) fn config(argv: &[&str]) -> DumpConfig {
    let mut full = vec!["pg_dump_anon"];
    full.extend_from_slice(argv);
    DumpConfig::from_args(&DumpArgs::try_parse_from(full).unwrap())
}

fn tool_failure(tool: &str) -> anyhow::Error {
    DumpError::ToolFailed {
        tool: tool.to_string(),
        status: Some(1),
        stderr: "server closed the connection unexpectedly".to_string(),
    }
    .into()
}

enum Reply {
    Text(Vec<u8>),
    Fail,
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

/// Answers statements whose text contains a registered fragment
#[derive(Default)]
pub(crate) struct FakeQueryTool {
    replies: Vec<(Vec<u8>, Reply)>,
    log: Mutex<Vec<Vec<u8>>>,
}

impl FakeQueryTool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reply with `text`, for both `query` and `copy_out`
    pub(crate) fn respond(mut self, fragment: &str, text: impl AsRef<[u8]>) -> Self {
        self.replies
            .push((fragment.as_bytes().to_vec(), Reply::Text(text.as_ref().to_vec())));
        self
    }

    pub(crate) fn fail_on(mut self, fragment: &str) -> Self {
        self.replies.push((fragment.as_bytes().to_vec(), Reply::Fail));
        self
    }

    /// Every statement received, in order, decoded for easy assertions
    pub(crate) fn queries(&self) -> Vec<String> {
        self.raw_queries()
            .iter()
            .map(|sql| String::from_utf8_lossy(sql).into_owned())
            .collect()
    }

    /// Every statement received, in order, byte for byte
    pub(crate) fn raw_queries(&self) -> Vec<Vec<u8>> {
        self.log.lock().unwrap().clone()
    }

    fn reply(&self, sql: &[u8]) -> Result<Vec<u8>> {
        self.log.lock().unwrap().push(sql.to_vec());
        match self.replies.iter().find(|(fragment, _)| contains(sql, fragment)) {
            Some((_, Reply::Text(text))) => Ok(text.clone()),
            Some((_, Reply::Fail)) => Err(tool_failure("psql")),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl QueryTool for FakeQueryTool {
    async fn query(&self, sql: &[u8]) -> Result<Vec<u8>> {
        self.reply(sql)
    }

    async fn copy_out(&self, sql: &[u8], out: &mut (dyn AsyncWrite + Unpin + Send)) -> Result<u64> {
        let text = self.reply(sql)?;
        out.write_all(&text).await?;
        Ok(text.len() as u64)
    }
}

/// Answers pg_dump invocations whose arguments contain every registered flag
#[derive(Default)]
pub(crate) struct FakeDumpTool {
    replies: Vec<(Vec<String>, Reply)>,
    log: Mutex<Vec<Vec<String>>>,
}

impl FakeDumpTool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, flags: &[&str], text: impl AsRef<[u8]>) -> Self {
        self.replies.push((
            flags.iter().map(|f| f.to_string()).collect(),
            Reply::Text(text.as_ref().to_vec()),
        ));
        self
    }

    pub(crate) fn fail_on(mut self, flags: &[&str]) -> Self {
        self.replies
            .push((flags.iter().map(|f| f.to_string()).collect(), Reply::Fail));
        self
    }

    /// Arguments of every invocation, in order, decoded for easy assertions
    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.log.lock().unwrap().clone()
    }

    fn reply(&self, args: &[OsString]) -> Result<Vec<u8>> {
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        let matched = self
            .replies
            .iter()
            .find(|(flags, _)| flags.iter().all(|flag| args.contains(flag)));
        let reply = match matched {
            Some((_, Reply::Text(text))) => Ok(text.clone()),
            Some((_, Reply::Fail)) => Err(tool_failure("pg_dump")),
            None => Ok(Vec::new()),
        };
        self.log.lock().unwrap().push(args);
        reply
    }
}

#[async_trait]
impl DumpTool for FakeDumpTool {
    async fn dump(&self, args: &[OsString]) -> Result<Vec<u8>> {
        self.reply(args)
    }

    async fn dump_into(&self, args: &[OsString], out: &mut (dyn AsyncWrite + Unpin + Send)) -> Result<u64> {
        let text = self.reply(args)?;
        out.write_all(&text).await?;
        Ok(text.len() as u64)
    }
}
