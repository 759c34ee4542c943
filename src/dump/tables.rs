// ABOUTME: Recovers the tables and sequences defined by pre-data DDL text
// ABOUTME: Discovery order follows the DDL so data loads replay in a foreign-key-safe order

use crate::postgres::Identifier;
use anyhow::{Context, Result};
use regex::bytes::Regex;

/// A possibly schema-qualified identifier, quoted or bare, in any encoding
const QUALIFIED_NAME: &str = r#"(?:"(?:[^"]|"")+"|[^\s".(]+)(?:\.(?:"(?:[^"]|"")+"|[^\s".(]+))?"#;

/// List the tables created by `ddl`, in order of appearance
///
/// Matches `CREATE TABLE` and `CREATE UNLOGGED TABLE` statements at the start
/// of a line. Foreign tables, views, and sequences are not tables with data
/// of their own and are never returned. Each table is listed once, with its
/// name exactly as pg_dump wrote it.
pub fn discover_tables(ddl: &[u8]) -> Result<Vec<Identifier>> {
    let re = Regex::new(&format!(
        r"(?mx-u)
        ^CREATE\ (?:UNLOGGED\ )?TABLE\ # CREATE [UNLOGGED] TABLE keyword
        ({})                            # table name, optionally schema-qualified
        (?:\ |$)                        # end of name
        ",
        QUALIFIED_NAME
    ))
    .context("Failed to compile table discovery pattern")?;

    Ok(unique_captures(&re, ddl))
}

/// List the sequences defined by `ddl`, in order of appearance
///
/// Covers standalone `CREATE SEQUENCE` statements and the `SEQUENCE NAME`
/// clause pg_dump writes for identity columns.
pub fn discover_sequences(ddl: &[u8]) -> Result<Vec<Identifier>> {
    let re = Regex::new(&format!(
        r"(?mx-u)
        (?:^CREATE\ SEQUENCE\ |^\s*SEQUENCE\ NAME\ )
        ({})
        (?:\s|$)
        ",
        QUALIFIED_NAME
    ))
    .context("Failed to compile sequence discovery pattern")?;

    Ok(unique_captures(&re, ddl))
}

fn unique_captures(re: &Regex, text: &[u8]) -> Vec<Identifier> {
    let mut names: Vec<Identifier> = Vec::new();
    for caps in re.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            let name = Identifier::new(name.as_bytes());
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRE_DATA: &str = r#"
SET statement_timeout = 0;
SELECT pg_catalog.set_config('search_path', '', false);

CREATE SCHEMA sales;

CREATE TYPE public.mood AS ENUM (
    'sad',
    'happy'
);

CREATE FUNCTION public.touch() RETURNS trigger
    LANGUAGE plpgsql
    AS $$ BEGIN RETURN NEW; END $$;

--
-- Name: customers; Type: TABLE; Schema: public; Owner: postgres
--

CREATE TABLE public.customers (
    id integer NOT NULL,
    email text
);

CREATE SEQUENCE public.customers_id_seq
    AS integer
    START WITH 1
    INCREMENT BY 1
    NO MINVALUE
    NO MAXVALUE
    CACHE 1;

CREATE UNLOGGED TABLE public.sessions (
    token text
);

CREATE TABLE sales."Order Lines" (
    id bigint NOT NULL,
    customer_id integer
);

ALTER TABLE sales."Order Lines" ALTER COLUMN id ADD GENERATED ALWAYS AS IDENTITY (
    SEQUENCE NAME sales."Order Lines_id_seq"
    START WITH 1
    INCREMENT BY 1
    NO MINVALUE
    NO MAXVALUE
    CACHE 1
);

CREATE TABLE public.typed OF public.mood_holder (
    note text
);

CREATE VIEW public.customer_emails AS
 SELECT customers.email
   FROM public.customers;

CREATE MATERIALIZED VIEW public.stats AS
 SELECT count(*) AS count
   FROM public.customers
  WITH NO DATA;

CREATE FOREIGN TABLE public.remote_orders (
    id integer
)
SERVER remote;

CREATE TABLE public.empty (
);
"#;

    #[test]
    fn test_discovers_tables_in_ddl_order() {
        let tables = discover_tables(PRE_DATA.as_bytes()).unwrap();

        assert_eq!(
            tables,
            [
                "public.customers",
                "public.sessions",
                "sales.\"Order Lines\"",
                "public.typed",
                "public.empty",
            ]
        );
    }

    #[test]
    fn test_ignores_views_foreign_tables_and_sequences() {
        let tables = discover_tables(PRE_DATA.as_bytes()).unwrap();

        for absent in [
            "public.customer_emails",
            "public.stats",
            "public.remote_orders",
            "public.customers_id_seq",
        ] {
            assert!(!tables.iter().any(|t| *t == absent), "{}", absent);
        }
    }

    #[test]
    fn test_no_tables_is_not_an_error() {
        let ddl = b"SET client_encoding = 'UTF8';\nCREATE SCHEMA empty;\n";
        assert!(discover_tables(ddl).unwrap().is_empty());
        assert!(discover_tables(b"").unwrap().is_empty());
    }

    #[test]
    fn test_unqualified_and_quoted_names() {
        let ddl = b"CREATE TABLE plain (\n);\nCREATE TABLE \"we\"\"ird\".\"x.y\" (\n);\n";
        let tables = discover_tables(ddl).unwrap();

        assert_eq!(tables, ["plain", "\"we\"\"ird\".\"x.y\""]);
    }

    #[test]
    fn test_each_table_listed_once() {
        let ddl = b"CREATE TABLE public.a (\n);\nCREATE TABLE public.a (\n);\n";
        assert_eq!(discover_tables(ddl).unwrap().len(), 1);
    }

    #[test]
    fn test_statement_must_start_the_line() {
        let ddl = b"COMMENT ON TABLE public.a IS 'CREATE TABLE public.fake (';\n";
        assert!(discover_tables(ddl).unwrap().is_empty());
    }

    #[test]
    fn test_discovers_sequences_and_identity_sequences() {
        let sequences = discover_sequences(PRE_DATA.as_bytes()).unwrap();
        assert_eq!(
            sequences,
            ["public.customers_id_seq", "sales.\"Order Lines_id_seq\""]
        );
    }

    #[test]
    fn test_names_in_non_utf8_encoding() {
        let ddl = b"CREATE TABLE public.caf\xE9 (\n    label text DEFAULT '\xE9t\xE9'::text\n);\n\
CREATE TABLE \"R\xE9sum\xE9\".\"Ann\xE9e\" (\n);\n\
CREATE SEQUENCE public.caf\xE9_id_seq\n    AS integer;\n";

        let tables = discover_tables(ddl).unwrap();
        assert_eq!(
            tables,
            [
                Identifier::new(b"public.caf\xE9".to_vec()),
                Identifier::new(b"\"R\xE9sum\xE9\".\"Ann\xE9e\"".to_vec()),
            ]
        );

        let sequences = discover_sequences(ddl).unwrap();
        assert_eq!(sequences, [Identifier::new(b"public.caf\xE9_id_seq".to_vec())]);
    }
}
