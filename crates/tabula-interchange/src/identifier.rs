//! Identifier checks and quoting

use tabula_core::{Result, TabulaError};

/// Words that may never be used as a table or column name.
///
/// Compared against the uppercase form of the candidate.
pub const RESERVED_KEYWORDS: [&str; 4] = ["SELECT", "DROP", "INSERT", "DELETE"];

/// What an identifier names, used in validation messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Table,
    Column,
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierKind::Table => write!(f, "table"),
            IdentifierKind::Column => write!(f, "column"),
        }
    }
}

/// True unless `name` is a reserved keyword (case-insensitive).
///
/// Empty names and names with quotes or spaces pass; quoting makes them
/// safe to embed.
pub fn is_safe(name: &str) -> bool {
    let upper = name.to_uppercase();
    !RESERVED_KEYWORDS.contains(&upper.as_str())
}

/// Reject reserved keywords with a validation error
pub fn validate_identifier(kind: IdentifierKind, name: &str) -> Result<()> {
    if is_safe(name) {
        Ok(())
    } else {
        tracing::warn!(%kind, name, "rejected reserved identifier");
        Err(TabulaError::Validation(format!(
            "Invalid {} name: {}",
            kind, name
        )))
    }
}

/// Wrap `name` in double quotes, doubling any embedded quote
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("SELECT")]
    #[case("select")]
    #[case("Drop")]
    #[case("insert")]
    #[case("dElEtE")]
    fn reserved_keywords_are_unsafe(#[case] name: &str) {
        assert!(!is_safe(name));
    }

    #[rstest]
    #[case("")]
    #[case("orders")]
    #[case("update")]
    #[case("select_me")]
    #[case("my table")]
    #[case("a\"b")]
    #[case(" select")]
    fn everything_else_is_safe(#[case] name: &str) {
        assert!(is_safe(name));
    }

    #[test]
    fn validation_message_names_the_kind() {
        let err = validate_identifier(IdentifierKind::Table, "select").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid table name: select");
        let err = validate_identifier(IdentifierKind::Column, "DROP").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid column name: DROP");
        assert!(validate_identifier(IdentifierKind::Column, "Make").is_ok());
    }

    #[rstest]
    #[case("id", "\"id\"")]
    #[case("", "\"\"")]
    #[case("my table", "\"my table\"")]
    #[case("a\"b", "\"a\"\"b\"")]
    #[case("t\"; DROP TABLE x; --", "\"t\"\"; DROP TABLE x; --\"")]
    fn quoting_doubles_embedded_quotes(#[case] name: &str, #[case] quoted: &str) {
        assert_eq!(quote_identifier(name), quoted);
    }
}
