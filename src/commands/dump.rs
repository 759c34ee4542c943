// ABOUTME: Anonymized dump command assembling every phase into one SQL script
// ABOUTME: Guard, pre-data DDL, masked data, sequence state, then post-data DDL

use crate::config::{DumpConfig, ExportOptions, OutputTarget};
use crate::dump::{self, DumpTool, ExtensionFilter, PgDump};
use crate::postgres::{self, Psql, QueryTool};
use crate::utils;
use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Name written in the dump banner
pub const PRODUCT_NAME: &str = "PostgreSQL Anonymizer";

/// What an anonymized dump contained
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub anon_version: String,
    /// Tables that received a data load
    pub tables: usize,
    /// Tables whose DDL was dumped but whose data was excluded
    pub tables_without_data: usize,
    pub sequences: usize,
    /// Bytes of masked row data
    pub data_bytes: u64,
}

/// Anonymized dump command
///
/// Checks that `psql` and `pg_dump` are on PATH, then runs
/// [`anonymized_dump`] with the real client tools.
///
/// # Errors
///
/// This function will return an error if:
/// - A required client tool is missing
/// - The anon extension is not installed
/// - Any pg_dump or psql invocation fails
/// - The output cannot be written
///
/// # Examples
///
/// ```no_run
/// # use anyhow::Result;
/// # use clap::Parser;
/// # use pg_dump_anon::commands::dump;
/// # use pg_dump_anon::config::{DumpArgs, DumpConfig};
/// # async fn example() -> Result<()> {
/// let args = DumpArgs::parse_from(["pg_dump_anon", "-h", "localhost", "-f", "shop.sql", "shop"]);
/// let summary = dump(&DumpConfig::from_args(&args)).await?;
/// println!("{} table(s) exported", summary.tables);
/// # Ok(())
/// # }
/// ```
pub async fn dump(config: &DumpConfig) -> Result<DumpSummary> {
    utils::check_required_tools()?;

    let psql = Psql::new(config.query.clone());
    anonymized_dump(&PgDump, &psql, &config.export, &config.output).await
}

/// Produce an anonymized dump with the given collaborators
///
/// Nothing is written, and no output file is created, unless the anon
/// extension is installed. When a later phase fails, the output produced so
/// far is flushed before the error is returned.
pub async fn anonymized_dump(
    tool: &dyn DumpTool,
    client: &dyn QueryTool,
    options: &ExportOptions,
    output: &OutputTarget,
) -> Result<DumpSummary> {
    tracing::info!("Checking for the anon extension...");
    let version = postgres::anon_version(client).await?;
    tracing::info!("✓ anon extension {} is installed", version);

    let mut out = open_output(output).await?;
    let written = write_anonymized_dump(tool, client, options, &version, out.as_mut()).await;
    // Whatever was written before a failure is kept
    let flushed = out.flush().await.context("Failed to flush dump output");
    let summary = written?;
    flushed?;

    tracing::info!(
        "✅ Anonymized dump complete: {} table(s) with data, {} without, {} sequence(s), {} byte(s) of masked data",
        summary.tables,
        summary.tables_without_data,
        summary.sequences,
        summary.data_bytes
    );
    Ok(summary)
}

/// Write the banner and the four dump phases, in order, into `out`
///
/// Pre-data DDL comes first, then one COPY block per table in DDL order, then
/// sequence values, and finally indexes, constraints, and triggers. Replaying
/// the script in that order loads into an empty database.
pub async fn write_anonymized_dump(
    tool: &dyn DumpTool,
    client: &dyn QueryTool,
    options: &ExportOptions,
    anon_version: &str,
    out: &mut (dyn AsyncWrite + Unpin + Send),
) -> Result<DumpSummary> {
    let excluded_schemas = dump::excluded_schemas(client).await?;
    let filter = ExtensionFilter::anonymizer()?;

    out.write_all(banner(anon_version).as_bytes())
        .await
        .context("Failed to write dump banner")?;

    // Step 1: DDL
    tracing::info!("Step 1/4: Dumping schema...");
    let pre_data = dump::dump_pre_data(tool, options, &excluded_schemas, &filter).await?;
    out.write_all(&pre_data.ddl)
        .await
        .context("Failed to write pre-data section")?;
    out.write_all(b"\n").await?;

    // Step 2: masked rows
    tracing::info!(
        "Step 2/4: Exporting masked data for {} table(s)...",
        pre_data.data_tables.len()
    );
    let data = dump::stream_masked_data(client, &pre_data.data_tables, out).await?;

    // Step 3: sequence values
    tracing::info!("Step 3/4: Dumping sequence state...");
    let sequences = dump::dump_sequences(
        client,
        tool,
        options,
        &excluded_schemas,
        &pre_data.sequences,
        out,
    )
    .await?;

    // Step 4: indexes, constraints, triggers
    tracing::info!("Step 4/4: Dumping post-data section...");
    dump::dump_post_data(tool, options, &excluded_schemas, &filter, out).await?;

    Ok(DumpSummary {
        anon_version: anon_version.to_string(),
        tables: data.tables,
        tables_without_data: pre_data.tables.len() - pre_data.data_tables.len(),
        sequences,
        data_bytes: data.bytes,
    })
}

fn banner(anon_version: &str) -> String {
    format!(
        "--\n-- Dump generated by {} {}\n--\n",
        PRODUCT_NAME, anon_version
    )
}

async fn open_output(target: &OutputTarget) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
    match target {
        OutputTarget::Stdout => Ok(Box::new(BufWriter::new(tokio::io::stdout()))),
        OutputTarget::File(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}
