use regex::Regex;
use serde::Serialize;
use std::fmt::Display;
use std::sync::LazyLock;

static QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["'`]"#).expect("Hardcode regex pattern"));
static WHITESPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("Hardcode regex pattern"));
static INVALID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("Hardcode regex pattern"));

/// A normalized schema name: uppercase ASCII letters, digits and underscores, at most 30 characters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Longest identifier accepted by the target schema.
    pub const MAX_LENGTH: usize = 30;
    /// Name given to a column whose header cell is empty.
    pub const COLUMN_FALLBACK: &'static str = "COL";
    /// Name given to a table when no usable hint is available.
    pub const TABLE_FALLBACK: &'static str = "DYNAMIC_TABLE";

    /// Sanitizes a header cell; empty or absent input becomes [`Identifier::COLUMN_FALLBACK`].
    pub fn column(raw: Option<&str>) -> Self {
        Self::sanitize(raw, Self::COLUMN_FALLBACK)
    }

    /// Sanitizes a table-name hint; empty or absent input becomes [`Identifier::TABLE_FALLBACK`].
    pub fn table(raw: Option<&str>) -> Self {
        Self::sanitize(raw, Self::TABLE_FALLBACK)
    }

    /// Trims, strips quotes, turns whitespace runs and then every other invalid
    /// character into `_`, uppercases and truncates.
    pub fn sanitize(raw: Option<&str>, fallback: &str) -> Self {
        let raw = raw.map(str::trim).unwrap_or_default();
        let unquoted = QUOTES.replace_all(raw, "");
        let joined = WHITESPACES.replace_all(&unquoted, "_");
        let cleaned = INVALID.replace_all(&joined, "_");
        let name: String = cleaned.to_ascii_uppercase().chars().take(Self::MAX_LENGTH).collect();
        if name.is_empty() {
            Identifier(fallback.to_owned())
        } else {
            Identifier(name)
        }
    }

    /// Wraps a name read back from the schema, only uppercased.
    pub fn existing(name: &str) -> Self {
        Identifier(name.to_uppercase())
    }

    /// Derives `<name>_<n>`, shortening the base so the result keeps within [`Identifier::MAX_LENGTH`].
    pub fn with_suffix(&self, n: usize) -> Self {
        let suffix = format!("_{}", n);
        let keep = Self::MAX_LENGTH.saturating_sub(suffix.len()).min(self.0.len());
        Identifier(format!("{}{}", &self.0[..keep], suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier as a double-quoted SQL identifier.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
