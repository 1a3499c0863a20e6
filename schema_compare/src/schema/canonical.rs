//! Definition canonicalizer
//!
//! Normalizes DDL and routine definition text so that two environments can be
//! compared without tripping over ownership, grants, comments or whitespace.
//! This is purely textual: it never parses SQL, so a noise pattern that
//! happens to sit inside a string literal is stripped as well.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::provider::DatabaseKind;

static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"--[^\r\n]*").unwrap());
static GRANT_REVOKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:GRANT|REVOKE)\s[^;]*;?").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static PG_ALTER_OWNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bALTER\s[^;]*?\bOWNER\s+TO\s+[^;]+;?").unwrap());
static PG_OWNER_TO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bOWNER\s+TO\s+\S+").unwrap());
static PG_SECURITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSECURITY\s+(?:DEFINER|INVOKER)\b").unwrap());

static MYSQL_DEFINER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\bDEFINER\s*=\s*(?:`[^`]*`|'[^']*'|"[^"]*"|[^\s@]+)(?:@(?:`[^`]*`|'[^']*'|"[^"]*"|\S+))?"#,
    )
    .unwrap()
});
static MYSQL_SQL_SECURITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSQL\s+SECURITY\s+(?:DEFINER|INVOKER)\b").unwrap());
static MYSQL_AUTO_INCREMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bAUTO_INCREMENT\s*=\s*\d+").unwrap());

/// Dialect-aware text normalizer.
///
/// One instance is built per comparison run and applied to both sides.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    kind: DatabaseKind,
    ignore_ownership: bool,
    schema_prefixes: Vec<Regex>,
}

impl Canonicalizer {
    pub fn new(kind: DatabaseKind, ignore_ownership: bool) -> Self {
        Self {
            kind,
            ignore_ownership,
            schema_prefixes: Vec::new(),
        }
    }

    /// Strip qualification with any of these schema names.
    ///
    /// Pass the names of both sides so the same rules apply to each.
    pub fn with_schemas<'a, I>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for schema in schemas {
            let schema = schema.trim();
            if schema.is_empty() {
                continue;
            }
            let escaped = regex::escape(schema);
            // The bare form needs a non-word character (or the start) before it,
            // which also works for names like `my-schema` or `$app`.
            let pattern = format!(r#"(?i)(?:"{0}"|`{0}`|(^|[^\w]){0})\."#, escaped);
            // The escaped name cannot make the pattern invalid.
            if let Ok(regex) = Regex::new(&pattern) {
                self.schema_prefixes.push(regex);
            }
        }
        self
    }

    pub fn ignores_ownership(&self) -> bool {
        self.ignore_ownership
    }

    /// Canonical form of `text`.
    ///
    /// The rules are applied until the text stops changing, because removing
    /// one pattern can expose another (`-public.-` becomes `--`). That makes
    /// the result idempotent.
    pub fn canonicalize(&self, text: &str) -> String {
        let mut current = self.apply_rules(text);
        loop {
            let next = self.apply_rules(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// Equality of two texts after canonicalization
    pub fn equivalent(&self, a: &str, b: &str) -> bool {
        self.canonicalize(a) == self.canonicalize(b)
    }

    fn apply_rules(&self, text: &str) -> String {
        let mut text = text.to_string();

        if self.ignore_ownership {
            text = BLOCK_COMMENT.replace_all(&text, " ").into_owned();
            text = LINE_COMMENT.replace_all(&text, " ").into_owned();

            match self.kind {
                DatabaseKind::Postgres => {
                    text = PG_ALTER_OWNER.replace_all(&text, " ").into_owned();
                    text = PG_OWNER_TO.replace_all(&text, " ").into_owned();
                    text = PG_SECURITY.replace_all(&text, " ").into_owned();
                }
                DatabaseKind::MySql => {
                    text = MYSQL_DEFINER.replace_all(&text, " ").into_owned();
                    text = MYSQL_SQL_SECURITY.replace_all(&text, " ").into_owned();
                    text = MYSQL_AUTO_INCREMENT.replace_all(&text, " ").into_owned();
                }
            }

            text = GRANT_REVOKE.replace_all(&text, " ").into_owned();

            for prefix in &self.schema_prefixes {
                text = prefix.replace_all(&text, "${1}").into_owned();
            }
        }

        WHITESPACE.replace_all(&text, " ").trim().to_string()
    }
}
