// ABOUTME: Anonymized dump phases built on pg_dump and psql
// ABOUTME: Schema export, table discovery, masked data streaming, and tail export

pub mod data;
pub mod filter;
pub mod pg_dump;
pub mod schema;
pub mod tables;
pub mod tail;

pub use data::{stream_masked_data, DataSummary};
pub use filter::{ExtensionFilter, EXCLUDED_EXTENSIONS};
pub use pg_dump::{DumpTool, PgDump, Section};
pub use schema::{dump_pre_data, excluded_schemas, PreData};
pub use tables::{discover_sequences, discover_tables};
pub use tail::{dump_post_data, dump_sequences};
