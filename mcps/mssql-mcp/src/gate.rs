//! Access policy gate
//!
//! Turns a classified statement plus the process-wide [`PolicyConfig`] into an
//! [`AccessDecision`]. Pure: no I/O, no shared mutable state, never executes SQL.
//! Checks run in a fixed order and the first failure wins.

use thiserror::Error;

use crate::classifier::{classify, StatementKind};
use crate::tables::from_clause_references;

/// Permissions the gate enforces, fixed for the lifetime of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    allow_multi_database: bool,
    allow_write: bool,
    pinned_database: String,
}

impl PolicyConfig {
    /// Build a policy. The pinned database is required unless multi-database
    /// mode is on.
    pub fn new(
        allow_multi_database: bool,
        allow_write: bool,
        pinned_database: impl Into<String>,
    ) -> Result<Self, PolicyConfigError> {
        let pinned_database = pinned_database.into().trim().to_string();
        if !allow_multi_database && pinned_database.is_empty() {
            return Err(PolicyConfigError::MissingPinnedDatabase);
        }

        Ok(Self {
            allow_multi_database,
            allow_write,
            pinned_database,
        })
    }

    pub fn allow_multi_database(&self) -> bool {
        self.allow_multi_database
    }

    pub fn allow_write(&self) -> bool {
        self.allow_write
    }

    pub fn pinned_database(&self) -> &str {
        &self.pinned_database
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyConfigError {
    #[error("a pinned database (DB_INITIAL_CATALOG) is required when DB_ALLOW_MULTI is disabled")]
    MissingPinnedDatabase,
}

/// A raw SQL string with its optional target database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRequest {
    sql: String,
    database: Option<String>,
}

impl StatementRequest {
    /// Trims the statement and rejects it when nothing is left.
    pub fn new(raw_sql: &str, database: Option<&str>) -> Result<Self, EmptyStatement> {
        let sql = raw_sql.trim();
        if sql.is_empty() {
            return Err(EmptyStatement);
        }

        Ok(Self {
            sql: sql.to_string(),
            database: database.map(str::to_string),
        })
    }

    /// The trimmed statement
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("SQL statement must not be empty.")]
pub struct EmptyStatement;

/// Why a request was turned away
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenialKind {
    #[error("Multiple SQL statements in a single request are not allowed.")]
    MultiStatementNotAllowed,

    #[error("{}", wrong_kind_message(.expected))]
    WrongOperationKind { expected: StatementKind },

    #[error("Method not allowed in current configuration. Set DB_ALLOW_WRITE to 'true' to allow this method.")]
    WriteNotAllowed,

    #[error("Method not allowed in current configuration. Set DB_ALLOW_MULTI to 'true' to allow this method.")]
    MultiDatabaseNotAllowed,

    #[error("SQL statement targets database '{database}', which is not allowed. Only '{pinned}' is permitted unless DB_ALLOW_MULTI is enabled.")]
    CrossDatabaseReferenceDetected { database: String, pinned: String },
}

fn wrong_kind_message(expected: &StatementKind) -> &'static str {
    match expected {
        StatementKind::Read => "Only SELECT queries are supported in this method.",
        StatementKind::Write => "Only non-SELECT queries are supported in this method.",
    }
}

impl DenialKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DenialKind::MultiStatementNotAllowed => "multi_statement_not_allowed",
            DenialKind::WrongOperationKind { .. } => "wrong_operation_kind",
            DenialKind::WriteNotAllowed => "write_not_allowed",
            DenialKind::MultiDatabaseNotAllowed => "multi_database_not_allowed",
            DenialKind::CrossDatabaseReferenceDetected { .. } => {
                "cross_database_reference_detected"
            }
        }
    }
}

/// An admitted statement, ready for the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Trimmed SQL, otherwise unchanged
    pub sql: String,
    /// Database to switch to before running; `None` keeps the connection default
    pub database: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Admitted(Admission),
    Denied(DenialKind),
}

impl AccessDecision {
    /// Admission as a `Result`, for `?` at the call site
    pub fn into_result(self) -> Result<Admission, DenialKind> {
        match self {
            AccessDecision::Admitted(admission) => Ok(admission),
            AccessDecision::Denied(denial) => Err(denial),
        }
    }

    pub fn is_admitted(&self) -> bool {
        matches!(self, AccessDecision::Admitted(_))
    }
}

/// Decide whether `request` may run as a statement of `expected` kind.
pub fn evaluate(
    request: &StatementRequest,
    expected: StatementKind,
    policy: &PolicyConfig,
) -> AccessDecision {
    match check(request, expected, policy) {
        Ok(database) => AccessDecision::Admitted(Admission {
            sql: request.sql().to_string(),
            database,
        }),
        Err(denial) => AccessDecision::Denied(denial),
    }
}

fn check(
    request: &StatementRequest,
    expected: StatementKind,
    policy: &PolicyConfig,
) -> Result<Option<String>, DenialKind> {
    let classification = classify(request.sql());

    if !classification.is_single_statement {
        return Err(DenialKind::MultiStatementNotAllowed);
    }

    if classification.kind != expected {
        return Err(DenialKind::WrongOperationKind { expected });
    }

    // Independent of which database is targeted
    if expected == StatementKind::Write && !policy.allow_write {
        return Err(DenialKind::WriteNotAllowed);
    }

    let database = resolve_database(request.database(), policy);

    if !policy.allow_multi_database {
        check_database_references(request.sql(), &policy.pinned_database)?;
    }

    Ok(database)
}

/// Effective target database for a request.
///
/// In multi-database mode the caller's choice wins, falling back to the pinned
/// database (if any). Otherwise the pinned database is always used.
pub fn resolve_database(requested: Option<&str>, policy: &PolicyConfig) -> Option<String> {
    let pinned = Some(policy.pinned_database.as_str()).filter(|db| !db.is_empty());

    if !policy.allow_multi_database {
        return pinned.map(str::to_string);
    }

    requested
        .map(str::trim)
        .filter(|db| !db.is_empty())
        .or(pinned)
        .map(str::to_string)
}

/// Listing every database on the server needs multi-database mode.
pub fn check_database_listing(policy: &PolicyConfig) -> Result<(), DenialKind> {
    if policy.allow_multi_database {
        Ok(())
    } else {
        Err(DenialKind::MultiDatabaseNotAllowed)
    }
}

fn check_database_references(sql: &str, pinned: &str) -> Result<(), DenialKind> {
    let pinned_upper = pinned.to_uppercase();

    for reference in from_clause_references(sql) {
        if let Some(database) = reference.database {
            if database.to_uppercase() != pinned_upper {
                return Err(DenialKind::CrossDatabaseReferenceDetected {
                    database,
                    pinned: pinned.to_string(),
                });
            }
        }
    }

    Ok(())
}
