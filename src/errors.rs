use thiserror::Error;

/// Errors produced by the data layer
///
/// Per-file and per-record problems are contained at the smallest scope
/// (a bad record is skipped, a bad file fails only its own load); only a
/// fully unobtainable catalog index propagates to the caller as fatal.
#[derive(Error, Debug)]
pub enum DataError {
    /// No backend produced the resource. Recoverable: callers degrade to
    /// empty/zero rather than failing the surrounding operation.
    #[error("resource `{name}` not found (tried: {attempted:?})")]
    MissingResource { name: String, attempted: Vec<String> },

    /// Parsed JSON lacked the required shape. The offending file is
    /// skipped; the rest of the catalog is unaffected.
    #[error("malformed document `{name}`: {reason}")]
    MalformedDocument { name: String, reason: String },

    /// An import payload was empty or unusable. Surfaced to the user as
    /// an actionable message, never auto-retried.
    #[error("import rejected: {0}")]
    ImportValidation(String),

    /// Key-value store / connection pool plumbing failure
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl DataError {
    /// Builds a MalformedDocument error for a named resource
    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        DataError::MalformedDocument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
