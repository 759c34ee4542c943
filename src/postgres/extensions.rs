// ABOUTME: Catalog lookups for the PostgreSQL Anonymizer extension
// ABOUTME: Checks the extension is installed and reads mask schema, masking filters, and sequences

use super::identifier::Identifier;
use super::psql::QueryTool;
use crate::error::DumpError;
use crate::utils::trim_bytes;
use anyhow::{Context, Result};

/// Schema holding the anon extension's own objects
pub const ANON_SCHEMA: &str = "anon";

/// Return the installed version of the anon extension
///
/// # Errors
///
/// Returns [`DumpError::ExtensionNotInstalled`] when the extension is absent,
/// or the psql failure when the database cannot be queried at all.
pub async fn anon_version(client: &dyn QueryTool) -> Result<String> {
    let version = client
        .query(b"SELECT extversion FROM pg_catalog.pg_extension WHERE extname = 'anon';")
        .await
        .context("Failed to query installed extensions")?;

    let version = String::from_utf8_lossy(trim_bytes(&version)).into_owned();
    if version.is_empty() {
        return Err(DumpError::ExtensionNotInstalled.into());
    }

    Ok(version)
}

/// Return the schema where masking views live, if the setting is defined
pub async fn mask_schema(client: &dyn QueryTool) -> Result<Option<Identifier>> {
    let schema = client
        .query(b"SELECT pg_catalog.current_setting('anon.maskschema', true);")
        .await
        .context("Failed to read anon.maskschema")?;

    let schema = trim_bytes(&schema);
    Ok((!schema.is_empty()).then(|| Identifier::new(schema)))
}

/// Return the column list that masks the rows of `table`
///
/// A table without masking rules gets `*`, i.e. every column unmasked.
pub async fn mask_filters(client: &dyn QueryTool, table: &Identifier) -> Result<Vec<u8>> {
    let parts: [&[u8]; 3] = [
        b"SELECT anon.mask_filters(",
        &quote_literal(table.as_bytes()),
        b"::REGCLASS);",
    ];
    let filters = client
        .query(&parts.concat())
        .await
        .with_context(|| format!("Failed to get masking filters for {}", table))?;

    let filters = trim_bytes(&filters);
    if filters.is_empty() {
        return Ok(b"*".to_vec());
    }
    Ok(filters.to_vec())
}

/// List every sequence outside the extension schemas, schema-qualified and quoted
pub async fn list_sequences(client: &dyn QueryTool, excluded_schemas: &[Identifier]) -> Result<Vec<Identifier>> {
    let mut query = b"SELECT pg_catalog.quote_ident(sequence_schema) || '.' || pg_catalog.quote_ident(sequence_name) \
                      FROM information_schema.sequences "
        .to_vec();
    if !excluded_schemas.is_empty() {
        let excluded: Vec<Vec<u8>> = excluded_schemas
            .iter()
            .map(|schema| quote_literal(schema.as_bytes()))
            .collect();
        query.extend_from_slice(b"WHERE sequence_schema NOT IN (");
        query.extend_from_slice(&excluded.join(&b", "[..]));
        query.extend_from_slice(b") ");
    }
    query.extend_from_slice(b"ORDER BY sequence_schema, sequence_name;");

    let output = client
        .query(&query)
        .await
        .context("Failed to list sequences")?;

    Ok(output
        .split(|&b| b == b'\n')
        .map(trim_bytes)
        .filter(|line| !line.is_empty())
        .map(Identifier::new)
        .collect())
}

/// Render `value` as a SQL string literal
pub fn quote_literal(value: &[u8]) -> Vec<u8> {
    let mut literal = Vec::with_capacity(value.len() + 2);
    literal.push(b'\'');
    for &byte in value {
        if byte == b'\'' {
            literal.push(b'\'');
        }
        literal.push(byte);
    }
    literal.push(b'\'');
    literal
}
