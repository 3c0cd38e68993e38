//! Core error types and the bulk-apply combinator.

use thiserror::Error;

/// Errors produced by the table engine.
///
/// Every public operation returns `Result<T, Error>`; the engine never
/// panics on bad input. Diagnostic context is captured as owned strings at
/// construction time, so a stored failure stays readable after the state
/// that produced it has moved on.
#[derive(Debug, Error)]
pub enum Error {
    /// A value failed the strict type check for its kind.
    #[error("validation failed for {kind}: {message}")]
    Validation {
        /// Display name of the value kind.
        kind: String,
        /// What was wrong with the value.
        message: String,
    },

    /// A value could not be coerced to the requested kind.
    #[error("cannot convert to {kind}: {message}")]
    Conversion {
        /// Display name of the target kind.
        kind: String,
        /// Why the coercion failed.
        message: String,
    },

    /// A reference points at a missing table, attribute, or identifier
    /// value, or an identifier uniqueness rule was violated.
    #[error("referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    /// A structural rule of a table was violated (blank or duplicate
    /// attribute name, second identifier, unknown attribute, bad index).
    #[error("structural error: {0}")]
    Structural(String),

    /// Table, row, or attribute lookup miss.
    #[error("not found: {0}")]
    NotFound(String),

    /// The reference graph contains a multi-table cycle.
    #[error("reference cycle detected among tables: {0}")]
    CycleDetected(String),

    /// Storage collaborator failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Aggregated failures from a bulk operation.
    #[error("{failed} of {total} operations failed")]
    Aggregate {
        /// Number of failed items.
        failed: usize,
        /// Number of items attempted.
        total: usize,
        /// The individual failures, in input order.
        errors: Vec<Error>,
    },
}

impl Error {
    /// Build a validation error for the given kind.
    pub fn validation(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Build a conversion error for the given target kind.
    pub fn conversion(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Conversion {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Failure handling policy for bulk operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Stop at the first failing item and return its error.
    HaltOnFirst,
    /// Run every item and aggregate all failures into one error.
    CollectAll,
}

/// Apply an operation to every item, honoring the failure mode.
///
/// With [`FailureMode::HaltOnFirst`] the first failure is returned and the
/// remaining items are not visited. With [`FailureMode::CollectAll`] every
/// item runs and the failures are folded into [`Error::Aggregate`].
pub fn apply_all<T, F>(
    items: impl IntoIterator<Item = T>,
    mode: FailureMode,
    mut op: F,
) -> Result<(), Error>
where
    F: FnMut(T) -> Result<(), Error>,
{
    match mode {
        FailureMode::HaltOnFirst => {
            for item in items {
                op(item)?;
            }
            Ok(())
        }
        FailureMode::CollectAll => {
            let mut errors = Vec::new();
            let mut total = 0usize;
            for item in items {
                total += 1;
                if let Err(e) = op(item) {
                    errors.push(e);
                }
            }
            if errors.is_empty() {
                Ok(())
            } else {
                Err(Error::Aggregate {
                    failed: errors.len(),
                    total,
                    errors,
                })
            }
        }
    }
}
