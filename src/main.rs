// ABOUTME: CLI entry point for pg_dump_anon
// ABOUTME: Parses pg_dump-style flags and writes an anonymized SQL dump

use clap::Parser;
use pg_dump_anon::commands;
use pg_dump_anon::config::{DumpArgs, DumpConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = DumpArgs::parse();

    // Logs go to stderr, stdout may be the dump itself
    let default_level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = DumpConfig::from_args(&args);
    commands::dump(&config).await?;
    Ok(())
}
