//! FROM-clause table reference scan
//!
//! A heuristic, not a parser. Only the text between the first `FROM` and the
//! earliest following clause keyword is inspected; JOIN targets or subqueries
//! outside that window are never seen. Keyword searches are case-insensitive
//! substring matches with no word boundaries.
//!
//! Without a `FROM` the window starts at byte 3, so the target of
//! `INSERT INTO` or `UPDATE` still falls inside it.

const FROM_KEYWORD: &str = "FROM";

/// Window start when the statement has no `FROM`
const NO_FROM_OFFSET: usize = 3;

/// Keywords that end the FROM window
const CLAUSE_KEYWORDS: [&str; 6] = ["WHERE", "GROUP BY", "ORDER BY", "HAVING", "LIMIT", "OFFSET"];

/// Identifier delimiters stripped from each token
const DELIMITERS: [char; 4] = ['[', ']', '"', '`'];

/// A dotted identifier found in the FROM window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: String,
}

impl TableReference {
    /// Build a reference from an already delimiter-stripped token.
    ///
    /// Three or more parts name a database in the first part.
    fn from_token(token: &str) -> Self {
        let parts: Vec<&str> = token.split('.').collect();
        let table = parts[parts.len() - 1].to_string();

        match parts.len() {
            1 => Self {
                database: None,
                schema: None,
                table,
            },
            2 => Self {
                database: None,
                schema: Some(parts[0].to_string()),
                table,
            },
            n => Self {
                database: Some(parts[0].to_string()),
                schema: Some(parts[n - 2].to_string()),
                table,
            },
        }
    }
}

/// Every token of the FROM window as a [`TableReference`].
///
/// Aliases and keywords inside the window come back as single-part references;
/// callers only act on the `database` qualifier.
pub fn from_clause_references(sql: &str) -> Vec<TableReference> {
    from_window(sql)
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(strip_delimiters)
        .filter(|token| !token.is_empty())
        .map(|token| TableReference::from_token(&token))
        .collect()
}

/// Text after the first `FROM` (or after [`NO_FROM_OFFSET`]), cut at the
/// earliest clause keyword
fn from_window(sql: &str) -> &str {
    // ASCII upper-casing keeps byte offsets aligned with `sql`
    let upper = sql.to_ascii_uppercase();
    let offset = upper
        .find(FROM_KEYWORD)
        .map_or(NO_FROM_OFFSET, |index| index + FROM_KEYWORD.len());

    let Some(start) = (offset..=sql.len()).find(|&index| sql.is_char_boundary(index)) else {
        return "";
    };

    let rest = &upper[start..];
    let end = CLAUSE_KEYWORDS
        .iter()
        .filter_map(|keyword| rest.find(keyword))
        .min()
        .map_or(sql.len(), |offset| start + offset);

    &sql[start..end]
}

fn strip_delimiters(token: &str) -> String {
    token
        .chars()
        .filter(|c| !DELIMITERS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}
