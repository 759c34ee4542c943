// ABOUTME: Raw identifier bytes as pg_dump and psql render them
// ABOUTME: Names stay in the dump's encoding so they round-trip into SQL unchanged

use std::fmt;

/// A table, sequence, or schema name, possibly qualified and quoted
///
/// The bytes are kept exactly as the server produced them in the client
/// encoding of the dump, e.g. `public.customers`, `"Sales"."Order Lines"`, or
/// a LATIN1 `public.caf\xE9`. Display is lossy and only meant for logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Vec<u8>);

impl Identifier {
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        Self(name.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier(\"{}\")", self.0.escape_ascii())
    }
}
