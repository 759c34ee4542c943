// ABOUTME: Command implementations
// ABOUTME: Exports the anonymized dump command

pub mod dump;

pub use dump::{anonymized_dump, dump, write_anonymized_dump, DumpSummary, PRODUCT_NAME};
