// ABOUTME: Error taxonomy for anonymized dumps
// ABOUTME: Distinguishes environment, precondition, and collaborator failures

use thiserror::Error;

/// Failures that abort an anonymized dump
///
/// Every variant is fatal. Output already written before the failure is not
/// rolled back, so a failure after the banner leaves an incomplete script.
#[derive(Debug, Error)]
pub enum DumpError {
    /// Required PostgreSQL client tools are not on PATH
    #[error(
        "Missing required PostgreSQL client tools: {}\n\
         \n\
         Please install PostgreSQL client tools:\n\
         - Ubuntu/Debian: sudo apt-get install postgresql-client\n\
         - macOS: brew install postgresql\n\
         - RHEL/CentOS: sudo yum install postgresql",
        .0.join(", ")
    )]
    MissingTools(Vec<String>),

    /// The anon extension is not installed in the target database
    #[error("Anon extension is not installed in this database.")]
    ExtensionNotInstalled,

    /// pg_dump or psql exited with a nonzero status
    #[error("{tool} failed ({}): {stderr}", status_label(.status))]
    ToolFailed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Exporting the masked rows of one table failed
    #[error("Failed to export masked data for table {table}")]
    TableExport { table: String },
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}
