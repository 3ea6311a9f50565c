//! Unified error types for sheet-audit.
//!
//! Three tiers of failure exist in the analysis pipeline:
//!
//! - **Input problems** (a malformed address, a broken merged region) are not
//!   errors at all. They are recorded as [`BuildIssue`](crate::model::BuildIssue)
//!   values and the offending item is skipped.
//! - **Resource problems** (workbook too large, parse took too long) abort the
//!   run with a [`AuditError::Resource`] carrying an actionable message.
//! - **Ambiguity** (non-unique composite keys) is reported as a warning on the
//!   diff result.
//!
//! Everything that does surface as an [`AuditError`] has a distinct,
//! human-readable message describing cause and remedy.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for sheet-audit operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AuditError {
    /// Errors while building the cell index and dependency graph
    #[error("Failed to build model: {context}")]
    Build {
        context: String,
        #[source]
        source: BuildErrorKind,
    },

    /// The input exceeded a configured resource limit
    #[error("Workbook too large or complex: {context}")]
    Resource {
        context: String,
        #[source]
        source: ResourceErrorKind,
    },

    /// A risk detector failed
    #[error("Risk detection failed: {context}")]
    Detector {
        context: String,
        #[source]
        source: DetectorErrorKind,
    },

    /// Errors while matching rows between two versions
    #[error("Version matching failed: {context}")]
    Matching {
        context: String,
        #[source]
        source: MatchingErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Specific build error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BuildErrorKind {
    #[error("Workbook contains no sheets")]
    EmptyWorkbook,

    #[error("Invalid cell address '{0}' (expected A1 notation such as B12)")]
    InvalidAddress(String),

    #[error("Invalid range '{0}' (expected A1:B2 notation)")]
    InvalidRange(String),

    #[error("Invalid workbook snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Specific resource error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ResourceErrorKind {
    #[error(
        "parsing exceeded {limit:?} (stopped after {elapsed:?}); split the workbook or raise \
         builder.timeout_secs"
    )]
    TimeoutExceeded { elapsed: Duration, limit: Duration },

    #[error(
        "workbook has more than {limit} non-empty cells (reached {count}); remove unused \
         sheets or raise builder.max_cells"
    )]
    CellLimitExceeded { count: usize, limit: usize },
}

/// Specific detector error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DetectorErrorKind {
    #[error("Detector '{detector}' could not process {location}: {reason}")]
    Failed {
        detector: String,
        location: String,
        reason: String,
    },

    #[error("Detector '{0}' is not registered")]
    UnknownDetector(String),
}

/// Specific matching error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MatchingErrorKind {
    #[error("Sheet '{0}' does not exist in either version")]
    UnknownSheet(String),

    #[error("No key columns configured for sheet '{0}'")]
    NoKeyColumns(String),

    #[error("Invalid key column '{0}' (expected a column letter such as A or BC)")]
    InvalidKeyColumn(String),

    #[error("Invalid fuzzy threshold: {0} (must be 0.0-1.0)")]
    InvalidThreshold(f64),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for sheet-audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl AuditError {
    /// Create a build error with context
    pub fn build(context: impl Into<String>, source: BuildErrorKind) -> Self {
        Self::Build {
            context: context.into(),
            source,
        }
    }

    /// Create a build error for an address that failed to parse
    pub fn invalid_address(address: impl Into<String>) -> Self {
        Self::build("address parsing", BuildErrorKind::InvalidAddress(address.into()))
    }

    /// Create a build error for a range that failed to parse
    pub fn invalid_range(range: impl Into<String>) -> Self {
        Self::build("range parsing", BuildErrorKind::InvalidRange(range.into()))
    }

    /// Create a resource error with context
    pub fn resource(context: impl Into<String>, source: ResourceErrorKind) -> Self {
        Self::Resource {
            context: context.into(),
            source,
        }
    }

    /// Create a resource error for a parse that ran past its deadline
    pub fn timeout(elapsed: Duration, limit: Duration) -> Self {
        Self::resource(
            "File too complex for analysis",
            ResourceErrorKind::TimeoutExceeded { elapsed, limit },
        )
    }

    /// Create a resource error for a workbook with too many cells
    pub fn cell_limit(count: usize, limit: usize) -> Self {
        Self::resource(
            "File too large for analysis",
            ResourceErrorKind::CellLimitExceeded { count, limit },
        )
    }

    /// Create a detector error
    pub fn detector(context: impl Into<String>, source: DetectorErrorKind) -> Self {
        Self::Detector {
            context: context.into(),
            source,
        }
    }

    /// Create a matching error
    pub fn matching(context: impl Into<String>, source: MatchingErrorKind) -> Self {
        Self::Matching {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error came from a resource limit rather than bad data.
    #[must_use]
    pub const fn is_resource_limit(&self) -> bool {
        matches!(self, Self::Resource { .. })
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::build(
            "JSON deserialization",
            BuildErrorKind::InvalidSnapshot(err.to_string()),
        )
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// The context string is prepended to the error's existing context,
/// creating a chain that shows the path through the code.
///
/// ```ignore
/// use sheet_audit::error::ErrorContext;
///
/// let workbook = Workbook::from_json_str(&content)
///     .with_context(|| format!("loading snapshot {}", path.display()))?;
/// ```
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, evaluated only on error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<AuditError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
fn add_context_to_error(err: AuditError, new_ctx: &str) -> AuditError {
    match err {
        AuditError::Build {
            context: existing,
            source,
        } => AuditError::Build {
            context: chain_context(new_ctx, &existing),
            source,
        },
        AuditError::Resource {
            context: existing,
            source,
        } => AuditError::Resource {
            context: chain_context(new_ctx, &existing),
            source,
        },
        AuditError::Detector {
            context: existing,
            source,
        } => AuditError::Detector {
            context: chain_context(new_ctx, &existing),
            source,
        },
        AuditError::Matching {
            context: existing,
            source,
        } => AuditError::Matching {
            context: chain_context(new_ctx, &existing),
            source,
        },
        AuditError::Io {
            path,
            message,
            source,
        } => AuditError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        AuditError::Config(msg) => AuditError::Config(chain_context(new_ctx, &msg)),
        AuditError::Validation(msg) => AuditError::Validation(chain_context(new_ctx, &msg)),
    }
}

/// Chain two context strings together as "`new`: `existing`".
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}
