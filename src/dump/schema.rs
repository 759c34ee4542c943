// ABOUTME: Pre-data DDL export with the anonymizer's objects removed
// ABOUTME: Also determines which of the defined tables get a data load

use super::filter::ExtensionFilter;
use super::pg_dump::{section_args, DumpTool, Section};
use super::tables::{discover_sequences, discover_tables};
use crate::config::ExportOptions;
use crate::postgres::{self, Identifier, QueryTool, ANON_SCHEMA};
use anyhow::{Context, Result};

/// Schemas left out of every DDL section: the extension schema and,
/// when configured, the mask schema
pub async fn excluded_schemas(client: &dyn QueryTool) -> Result<Vec<Identifier>> {
    let mut schemas = vec![Identifier::from(ANON_SCHEMA)];
    if let Some(mask) = postgres::mask_schema(client).await? {
        if mask != ANON_SCHEMA {
            schemas.push(mask);
        }
    }
    Ok(schemas)
}

/// The pre-data section and what was recovered from it
#[derive(Debug, Clone, Default)]
pub struct PreData {
    /// Filtered DDL, ready to be written out, in the dump's encoding
    pub ddl: Vec<u8>,
    /// Every table created by the DDL, in order of appearance
    pub tables: Vec<Identifier>,
    /// Tables that get a data load, in the same order
    pub data_tables: Vec<Identifier>,
    /// Sequences declared by the DDL
    pub sequences: Vec<Identifier>,
}

/// Export the pre-data section and discover its tables
///
/// When `--exclude-table-data` patterns are set, pg_dump is run a second time
/// with those patterns as `--exclude-table`; the tables left in that export are
/// the ones that get data.
pub async fn dump_pre_data(
    tool: &dyn DumpTool,
    options: &ExportOptions,
    excluded_schemas: &[Identifier],
    filter: &ExtensionFilter,
) -> Result<PreData> {
    tracing::info!("Dumping pre-data section...");

    let raw = tool
        .dump(&section_args(
            Section::PreData,
            excluded_schemas,
            options.section_args(),
        ))
        .await
        .context("Failed to dump pre-data section")?;
    let ddl = filter.apply(&raw).into_owned();

    let tables = discover_tables(&ddl)?;
    let sequences = discover_sequences(&ddl)?;
    tracing::info!("Found {} table(s) in pre-data section", tables.len());

    let data_tables = if options.has_excluded_table_data() {
        let discovery = tool
            .dump(&section_args(
                Section::PreData,
                excluded_schemas,
                options.data_discovery_args(),
            ))
            .await
            .context("Failed to list tables for data export")?;
        let with_data = discover_tables(&discovery)?;
        tables
            .iter()
            .filter(|table| with_data.contains(table))
            .cloned()
            .collect()
    } else {
        tables.clone()
    };

    tracing::info!("✓ Pre-data section dumped");
    Ok(PreData {
        ddl,
        tables,
        data_tables,
        sequences,
    })
}
