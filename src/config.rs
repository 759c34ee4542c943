// ABOUTME: Command-line configuration for anonymized dumps
// ABOUTME: Builds the immutable pg_dump and psql option sets from parsed flags

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Flags accepted by `pg_dump_anon`
///
/// This is the subset of `pg_dump` options that make sense for an anonymized
/// plain-text dump. `-h` is the host, as in `pg_dump`, so help is `--help` only.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "pg_dump_anon")]
#[command(about = "Export a PostgreSQL database as an anonymized SQL dump", long_about = None)]
#[command(version, disable_help_flag = true)]
pub struct DumpArgs {
    /// Database to dump (name or connection string)
    #[arg(short = 'd', long = "dbname", value_name = "DBNAME")]
    pub dbname: Option<String>,

    /// Database server host or socket directory
    #[arg(short = 'h', long = "host", value_name = "HOSTNAME")]
    pub host: Option<String>,

    /// Database server port number
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<String>,

    /// Connect as specified database user
    #[arg(short = 'U', long = "username", value_name = "NAME")]
    pub username: Option<String>,

    /// Never prompt for password
    #[arg(short = 'w', long = "no-password")]
    pub no_password: bool,

    /// Force password prompt
    #[arg(short = 'W', long = "password")]
    pub password: bool,

    /// Dump the data in encoding ENCODING
    #[arg(short = 'E', long = "encoding", value_name = "ENCODING")]
    pub encoding: Option<String>,

    /// Dump the specified schema(s) only
    #[arg(short = 'n', long = "schema", value_name = "PATTERN")]
    pub schemas: Vec<String>,

    /// Do NOT dump the specified schema(s)
    #[arg(short = 'N', long = "exclude-schema", value_name = "PATTERN")]
    pub exclude_schemas: Vec<String>,

    /// Dump the specified table(s) only
    #[arg(short = 't', long = "table", value_name = "PATTERN")]
    pub tables: Vec<String>,

    /// Do NOT dump the specified table(s)
    #[arg(short = 'T', long = "exclude-table", value_name = "PATTERN")]
    pub exclude_tables: Vec<String>,

    /// Do NOT dump data for the specified table(s)
    #[arg(long = "exclude-table-data", value_name = "PATTERN")]
    pub exclude_table_data: Vec<String>,

    /// Output file name (defaults to standard output)
    #[arg(short = 'f', long = "file", value_name = "FILENAME")]
    pub file: Option<PathBuf>,

    /// Log progress on standard error
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Print help
    #[arg(long = "help", action = ArgAction::Help)]
    pub help: Option<bool>,

    /// Database to dump
    #[arg(value_name = "DBNAME")]
    pub positional_dbname: Option<String>,
}

/// Where the anonymized dump is written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Stdout,
    File(PathBuf),
}

/// Options forwarded to every `pg_dump` invocation
///
/// Kept as separate groups because the sequence export must not receive the
/// object filters: a `--table` pattern there would pull unmasked table data
/// into the dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    connection: Vec<String>,
    encoding: Option<String>,
    object_filters: Vec<String>,
    exclude_table_data: Vec<String>,
}

impl ExportOptions {
    /// Flags for a DDL section export: connection, encoding, and object filters
    pub fn section_args(&self) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(self.object_filters.iter().cloned());
        args
    }

    /// Flags for discovering which tables get data
    ///
    /// Same as [`section_args`](Self::section_args), with every
    /// `--exclude-table-data` pattern turned into `--exclude-table` so that
    /// pg_dump resolves the patterns itself.
    pub fn data_discovery_args(&self) -> Vec<String> {
        let mut args = self.section_args();
        args.extend(
            self.exclude_table_data
                .iter()
                .map(|pattern| format!("--exclude-table={}", pattern)),
        );
        args
    }

    /// Flags for the sequence state export
    pub fn sequence_args(&self) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(
            self.exclude_table_data
                .iter()
                .map(|pattern| format!("--exclude-table-data={}", pattern)),
        );
        args
    }

    /// True when schema or table include/exclude patterns were given
    pub fn has_object_filters(&self) -> bool {
        !self.object_filters.is_empty()
    }

    pub fn has_excluded_table_data(&self) -> bool {
        !self.exclude_table_data.is_empty()
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = self.connection.clone();
        if let Some(encoding) = &self.encoding {
            args.push(format!("--encoding={}", encoding));
        }
        args
    }
}

/// Options forwarded to every `psql` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    args: Vec<String>,
    client_encoding: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            args: PSQL_FORMAT_FLAGS.iter().map(|f| f.to_string()).collect(),
            client_encoding: None,
        }
    }
}

/// Output shaping that makes psql print bare values
const PSQL_FORMAT_FLAGS: [&str; 4] = ["--quiet", "--tuples-only", "--no-align", "--no-psqlrc"];

impl QueryOptions {
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Environment for psql
    ///
    /// The requested dump encoding is applied as the client encoding, so the
    /// streamed rows match the `SET client_encoding` line of the pre-data DDL.
    pub fn envs(&self) -> Vec<(String, String)> {
        self.client_encoding
            .iter()
            .map(|encoding| ("PGCLIENTENCODING".to_string(), encoding.clone()))
            .collect()
    }
}

/// Complete, immutable configuration of one anonymized dump run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpConfig {
    pub export: ExportOptions,
    pub query: QueryOptions,
    pub output: OutputTarget,
}

impl DumpConfig {
    /// Map parsed flags onto the pg_dump and psql option sets
    ///
    /// Connection flags go to both tools. Encoding and object filters only
    /// make sense for pg_dump. `-d/--dbname` wins over a positional DBNAME.
    pub fn from_args(args: &DumpArgs) -> Self {
        let mut connection = Vec::new();

        if args.dbname.is_some() && args.positional_dbname.is_some() {
            tracing::warn!("Both --dbname and a positional DBNAME were given; using --dbname");
        }
        if let Some(dbname) = args.dbname.as_ref().or(args.positional_dbname.as_ref()) {
            connection.push(format!("--dbname={}", dbname));
        }
        if let Some(host) = &args.host {
            connection.push(format!("--host={}", host));
        }
        if let Some(port) = &args.port {
            connection.push(format!("--port={}", port));
        }
        if let Some(username) = &args.username {
            connection.push(format!("--username={}", username));
        }
        if args.no_password {
            connection.push("--no-password".to_string());
        }
        if args.password {
            connection.push("--password".to_string());
        }

        let mut object_filters = Vec::new();
        let patterns: [(&str, &Vec<String>); 4] = [
            ("--schema", &args.schemas),
            ("--exclude-schema", &args.exclude_schemas),
            ("--table", &args.tables),
            ("--exclude-table", &args.exclude_tables),
        ];
        for (flag, values) in patterns {
            object_filters.extend(values.iter().map(|v| format!("{}={}", flag, v)));
        }

        let export = ExportOptions {
            connection: connection.clone(),
            encoding: args.encoding.clone(),
            object_filters,
            exclude_table_data: args.exclude_table_data.clone(),
        };

        let mut query = QueryOptions::default();
        query.args.extend(connection);
        query.client_encoding = args.encoding.clone();

        let output = match &args.file {
            Some(path) => OutputTarget::File(path.clone()),
            None => OutputTarget::Stdout,
        };

        Self {
            export,
            query,
            output,
        }
    }
}
