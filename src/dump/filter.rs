// ABOUTME: Removes anonymizer extension statements from pg_dump DDL text
// ABOUTME: Line-pattern filter matched against pg_dump's plain-format phrasing

use anyhow::{Context, Result};
use regex::bytes::Regex;
use std::borrow::Cow;

/// Extensions whose installation must never appear in an anonymized dump
///
/// `anon` is the masking engine itself, `pgcrypto` and `tsm_system_rows`
/// are installed alongside it.
pub const EXCLUDED_EXTENSIONS: [&str; 3] = ["anon", "pgcrypto", "tsm_system_rows"];

/// Line filter for extension statements in plain-format DDL
///
/// pg_dump has no switch to leave an extension out of a dump, so the
/// statements are removed from the text. For each extension `ext` the
/// following lines are deleted wherever they start a line:
///
/// | pattern                                     | pg_dump emits it for         |
/// |---------------------------------------------|------------------------------|
/// | `-- Name: ext; Type: EXTENSION;...`         | TOC comment of the extension |
/// | `CREATE EXTENSION IF NOT EXISTS ext ...`    | the extension itself         |
/// | `-- Name: EXTENSION ext; Type: COMMENT;...` | TOC comment of its comment   |
/// | `COMMENT ON EXTENSION ext ...`              | the comment on the extension |
///
/// TOC comments of other objects that happen to share an extension's name,
/// such as a table `public.anon`, are kept.
///
/// The DDL is handled as bytes in the dump's encoding. Lines that are not
/// valid UTF-8 are matched and passed through unchanged.
///
/// These patterns match pg_dump's output from PostgreSQL 10 onwards. A pg_dump
/// that phrases these statements differently defeats the filter.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    patterns: Vec<Regex>,
}

impl ExtensionFilter {
    /// Build a filter for the given extension names
    pub fn new(extensions: &[&str]) -> Result<Self> {
        let mut patterns = Vec::with_capacity(extensions.len() * 4);

        for extension in extensions {
            let ext = regex::escape(extension);
            for line in [
                format!("-- Name: {}; Type: EXTENSION;", ext),
                format!("CREATE EXTENSION IF NOT EXISTS {} ", ext),
                format!("-- Name: EXTENSION {}; Type: COMMENT;", ext),
                format!("COMMENT ON EXTENSION {} ", ext),
            ] {
                let pattern = format!(r"(?m-u)^{}.*(?:\n|$)", line);
                let regex = Regex::new(&pattern)
                    .with_context(|| format!("Invalid exclusion pattern for extension '{}'", extension))?;
                patterns.push(regex);
            }
        }

        Ok(Self { patterns })
    }

    /// Filter for the extensions listed in [`EXCLUDED_EXTENSIONS`]
    pub fn anonymizer() -> Result<Self> {
        Self::new(&EXCLUDED_EXTENSIONS)
    }

    /// Remove every matching line from `ddl`
    pub fn apply<'a>(&self, ddl: &'a [u8]) -> Cow<'a, [u8]> {
        let mut filtered = Cow::Borrowed(ddl);
        for regex in &self.patterns {
            let replaced = match regex.replace_all(&filtered, &b""[..]) {
                Cow::Owned(text) => Some(text),
                Cow::Borrowed(_) => None,
            };
            if let Some(text) = replaced {
                filtered = Cow::Owned(text);
            }
        }
        filtered
    }
}
