// ABOUTME: PostgreSQL query collaborator module
// ABOUTME: Exports the psql wrapper and PostgreSQL Anonymizer catalog lookups

pub mod extensions;
pub mod identifier;
pub mod psql;

pub use extensions::{anon_version, list_sequences, mask_filters, mask_schema, ANON_SCHEMA};
pub use identifier::Identifier;
pub use psql::{Psql, QueryTool};
