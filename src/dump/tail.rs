// ABOUTME: Sequence state and post-data DDL, written after the data phase
// ABOUTME: Indexes, constraints, and triggers come last so bulk loads stay valid and fast

use super::filter::ExtensionFilter;
use super::pg_dump::{section_args, DumpTool, Section};
use crate::config::ExportOptions;
use crate::postgres::{self, Identifier, QueryTool};
use crate::utils;
use anyhow::{Context, Result};
use std::ffi::OsString;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Write the current value of every exported sequence
///
/// Sequences are listed from the catalog, outside `excluded_schemas`. When
/// object filters are active only sequences in `declared` (those defined by
/// the pre-data DDL) are kept, so no `setval` targets a sequence the dump
/// never created. Nothing is written when no sequence is left.
///
/// Returns the number of sequences exported.
pub async fn dump_sequences(
    client: &dyn QueryTool,
    tool: &dyn DumpTool,
    options: &ExportOptions,
    excluded_schemas: &[Identifier],
    declared: &[Identifier],
    out: &mut (dyn AsyncWrite + Unpin + Send),
) -> Result<usize> {
    let mut sequences = postgres::list_sequences(client, excluded_schemas).await?;
    if options.has_object_filters() {
        sequences.retain(|seq| declared.contains(seq));
    }

    if sequences.is_empty() {
        tracing::info!("No sequences to dump");
        return Ok(0);
    }

    tracing::info!("Dumping state of {} sequence(s)...", sequences.len());

    let mut args = vec![OsString::from("--data-only")];
    args.extend(
        sequences
            .iter()
            .map(|seq| utils::flag_arg("--table", seq.as_bytes())),
    );
    args.extend(options.sequence_args().into_iter().map(OsString::from));

    tool.dump_into(&args, out)
        .await
        .context("Failed to dump sequence state")?;

    tracing::info!("✓ Sequence state dumped");
    Ok(sequences.len())
}

/// Write the post-data section without the anonymizer's own objects
pub async fn dump_post_data(
    tool: &dyn DumpTool,
    options: &ExportOptions,
    excluded_schemas: &[Identifier],
    filter: &ExtensionFilter,
    out: &mut (dyn AsyncWrite + Unpin + Send),
) -> Result<()> {
    tracing::info!("Dumping post-data section...");

    let raw = tool
        .dump(&section_args(
            Section::PostData,
            excluded_schemas,
            options.section_args(),
        ))
        .await
        .context("Failed to dump post-data section")?;

    out.write_all(&filter.apply(&raw))
        .await
        .context("Failed to write post-data section")?;

    tracing::info!("✓ Post-data section dumped");
    Ok(())
}
