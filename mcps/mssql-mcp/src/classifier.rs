//! Statement classifier
//!
//! Decides the shape of a raw SQL string from its text alone: read or write,
//! single statement or not. No tokenization is attempted. Any `;` anywhere
//! marks the text as multi-statement, including one inside a string literal
//! or trailing the statement, and anything that does not start with `SELECT`
//! is a write.

/// Statement separator
const SEPARATOR: char = ';';

/// Leading keyword of a read statement
const READ_KEYWORD: &str = "SELECT";

/// Read or write intent of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Read => "read",
            StatementKind::Write => "write",
        }
    }
}

/// Verdict of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: StatementKind,
    pub is_single_statement: bool,
}

/// Classify a raw SQL string. Total: every input gets a verdict.
pub fn classify(raw_sql: &str) -> Classification {
    let trimmed = raw_sql.trim();

    let kind = if starts_with_keyword(trimmed, READ_KEYWORD) {
        StatementKind::Read
    } else {
        StatementKind::Write
    };

    Classification {
        kind,
        is_single_statement: !trimmed.contains(SEPARATOR),
    }
}

/// Case-insensitive prefix match. Not word-bounded: `SELECTED` matches `SELECT`.
fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.get(..keyword.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
}
