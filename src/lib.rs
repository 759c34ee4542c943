// ABOUTME: Library module for pg_dump_anon
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod dump;
pub mod error;
pub mod postgres;
pub mod utils;

#[cfg(test)]
mod testing;
