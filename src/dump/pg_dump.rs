// ABOUTME: Wrapper for the pg_dump command used for DDL and sequence export
// ABOUTME: Defines the DumpTool seam and the section flags shared by both DDL phases

use crate::postgres::Identifier;
use crate::utils;
use anyhow::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use tokio::io::AsyncWrite;

/// Export collaborator used by the dump pipeline
#[async_trait]
pub trait DumpTool: Send + Sync {
    /// Run pg_dump and return its whole output, byte for byte
    ///
    /// The output is in the dump's encoding, which need not be UTF-8.
    async fn dump(&self, args: &[OsString]) -> Result<Vec<u8>>;

    /// Run pg_dump and stream its output into `out`
    ///
    /// Returns the number of bytes written.
    async fn dump_into(&self, args: &[OsString], out: &mut (dyn AsyncWrite + Unpin + Send)) -> Result<u64>;
}

/// The `pg_dump` command-line tool
#[derive(Debug, Clone, Copy, Default)]
pub struct PgDump;

#[async_trait]
impl DumpTool for PgDump {
    async fn dump(&self, args: &[OsString]) -> Result<Vec<u8>> {
        utils::run_captured("pg_dump", args, &[]).await
    }

    async fn dump_into(&self, args: &[OsString], out: &mut (dyn AsyncWrite + Unpin + Send)) -> Result<u64> {
        utils::run_streamed("pg_dump", args, &[], out).await
    }
}

/// pg_dump section selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Object definitions needed before data is loaded
    PreData,
    /// Indexes, constraints, and triggers created after data is loaded
    PostData,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::PreData => write!(f, "pre-data"),
            Section::PostData => write!(f, "post-data"),
        }
    }
}

/// Flags exporting one DDL section without the anonymizer's own objects
///
/// Security labels hold the masking rules, so they are never exported.
/// `options` (connection and object filters) are appended last.
pub fn section_args(section: Section, excluded_schemas: &[Identifier], options: Vec<String>) -> Vec<OsString> {
    let mut args = vec![
        OsString::from(format!("--section={}", section)),
        OsString::from("--no-security-labels"),
    ];
    args.extend(
        excluded_schemas
            .iter()
            .map(|schema| utils::flag_arg("--exclude-schema", schema.as_bytes())),
    );
    args.extend(options.into_iter().map(OsString::from));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_args() {
        let args = section_args(
            Section::PostData,
            &["anon".into(), "mask".into()],
            vec!["--dbname=shop".to_string()],
        );
        assert_eq!(
            args,
            [
                "--section=post-data",
                "--no-security-labels",
                "--exclude-schema=anon",
                "--exclude-schema=mask",
                "--dbname=shop",
            ]
        );
    }

    #[tokio::test]
    #[ignore]
    async fn test_dump_pre_data_live_database() {
        let url = std::env::var("TEST_DATABASE_URL").unwrap();
        let args = section_args(Section::PreData, &[], vec![format!("--dbname={}", url)]);

        let ddl = PgDump.dump(&args).await.unwrap();
        assert!(String::from_utf8_lossy(&ddl).contains("PostgreSQL database dump"));
    }
}
