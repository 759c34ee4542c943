// ABOUTME: Streams masked table rows into the dump as COPY blocks
// ABOUTME: One table at a time, in discovery order, straight from psql into the output

use crate::error::DumpError;
use crate::postgres::{self, Identifier, QueryTool};
use crate::utils::sanitize_identifier;
use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// What the data phase wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataSummary {
    pub tables: usize,
    pub bytes: u64,
}

/// Write a `COPY ... FROM STDIN` block of masked rows for every table
///
/// For each table the masking filters are looked up, then psql runs
/// `COPY (SELECT <filters> FROM ONLY <table>) TO STDOUT WITH CSV` and its
/// output is copied into `out` before the next table starts. `ONLY` keeps rows
/// of inheritance children and partitions out of their parent's block, since
/// those children get a block of their own.
///
/// # Errors
///
/// The first table that cannot be exported aborts the phase with
/// [`DumpError::TableExport`] naming it. Blocks already written stay in `out`.
pub async fn stream_masked_data(
    client: &dyn QueryTool,
    tables: &[Identifier],
    out: &mut (dyn AsyncWrite + Unpin + Send),
) -> Result<DataSummary> {
    let mut summary = DataSummary::default();

    for (idx, table) in tables.iter().enumerate() {
        tracing::info!(
            "Exporting masked data {}/{}: {}",
            idx + 1,
            tables.len(),
            sanitize_identifier(&table.to_string())
        );

        let bytes = copy_table(client, table, out)
            .await
            .with_context(|| DumpError::TableExport {
                table: sanitize_identifier(&table.to_string()),
            })?;

        summary.tables += 1;
        summary.bytes += bytes;
    }

    Ok(summary)
}

async fn copy_table(
    client: &dyn QueryTool,
    table: &Identifier,
    out: &mut (dyn AsyncWrite + Unpin + Send),
) -> Result<u64> {
    let filters = postgres::mask_filters(client, table).await?;

    let header: [&[u8]; 3] = [b"COPY ", table.as_bytes(), b" FROM STDIN WITH CSV;\n"];
    out.write_all(&header.concat())
        .await
        .context("Failed to write COPY header")?;

    let query: [&[u8]; 5] = [
        b"COPY (SELECT ",
        &filters,
        b" FROM ONLY ",
        table.as_bytes(),
        b") TO STDOUT WITH CSV",
    ];
    let bytes = client.copy_out(&query.concat(), out).await?;

    out.write_all(b"\\.\n\n")
        .await
        .context("Failed to write COPY terminator")?;

    Ok(bytes)
}
