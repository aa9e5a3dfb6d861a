//! Diagnostics returned by lifecycle operations.
//!
//! Diagnostics accumulate: commit warnings, cleanup warnings and the terminal
//! error of an operation all end up in the same list, in the order they
//! happened.

use std::fmt;

use crate::error::{ErrorKind, LifecycleError};

/// Summary of warnings returned by a commit.
pub const COMMIT_WARNING_SUMMARY: &str = "Config Commit Warning";

/// Summary of errors collected while clearing and unlocking.
pub const CLEAR_WARNING_SUMMARY: &str = "Config Clear/Unlock Warning";

/// Path to an attribute of a resource record, e.g. `family.inet.address`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Path to a top-level attribute.
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Path to a nested attribute.
    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.0.push(name.into());
        self
    }

    /// Path components.
    pub fn components(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Reported, does not stop the operation.
    Warning,
    /// Terminal for the operation.
    Error,
}

/// A single reported condition.
#[derive(Debug)]
pub enum Diagnostic {
    /// Non-fatal condition.
    Warning {
        /// Short title.
        summary: String,
        /// Full message.
        detail: String,
    },
    /// Terminal failure.
    Error(LifecycleError),
}

impl Diagnostic {
    /// Severity of the diagnostic.
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::Warning { .. } => Severity::Warning,
            Diagnostic::Error(_) => Severity::Error,
        }
    }

    /// Short title.
    pub fn summary(&self) -> &str {
        match self {
            Diagnostic::Warning { summary, .. } => summary,
            Diagnostic::Error(e) => e.summary(),
        }
    }

    /// Full message.
    pub fn detail(&self) -> String {
        match self {
            Diagnostic::Warning { detail, .. } => detail.clone(),
            Diagnostic::Error(e) => e.to_string(),
        }
    }

    /// Attribute the diagnostic is scoped to, if any.
    pub fn field(&self) -> Option<&FieldPath> {
        match self {
            Diagnostic::Warning { .. } => None,
            Diagnostic::Error(e) => e.field(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field() {
            Some(field) => write!(f, "{} ({}): {}", self.summary(), field, self.detail()),
            None => write!(f, "{}: {}", self.summary(), self.detail()),
        }
    }
}

/// Ordered list of diagnostics.
#[derive(Debug, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning.
    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.0.push(Diagnostic::Warning {
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    /// Adds one warning per item, all with the same summary.
    pub fn append_warnings<I, E>(&mut self, summary: &str, warnings: I)
    where
        I: IntoIterator<Item = E>,
        E: fmt::Display,
    {
        for w in warnings {
            self.add_warning(summary, w.to_string());
        }
    }

    /// Adds an error.
    pub fn add_error(&mut self, error: LifecycleError) {
        self.0.push(Diagnostic::Error(error));
    }

    /// Returns true if any error was added.
    pub fn has_error(&self) -> bool {
        self.0.iter().any(|d| d.severity() == Severity::Error)
    }

    /// Errors, in order.
    pub fn errors(&self) -> impl Iterator<Item = &LifecycleError> {
        self.0.iter().filter_map(|d| match d {
            Diagnostic::Error(e) => Some(e),
            Diagnostic::Warning { .. } => None,
        })
    }

    /// Warnings, in order.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity() == Severity::Warning)
    }

    /// Kind of the first error, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.errors().next().map(LifecycleError::kind)
    }

    /// All diagnostics, in order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the list.
    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path() {
        let path = FieldPath::root("family_inet").child("address");
        assert_eq!(path.to_string(), "family_inet.address");
        assert_eq!(path.components().len(), 2);
    }

    #[test]
    fn test_diagnostics_accumulate() {
        let mut diags = Diagnostics::new();
        diags.append_warnings(COMMIT_WARNING_SUMMARY, ["w1", "w2"]);
        assert!(!diags.has_error());

        diags.add_error(LifecycleError::commit("commit failed"));
        diags.add_warning(CLEAR_WARNING_SUMMARY, "unlock failed");

        assert!(diags.has_error());
        assert_eq!(diags.len(), 4);
        assert_eq!(diags.warnings().count(), 3);
        assert_eq!(diags.error_kind(), Some(ErrorKind::Commit));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::Error(LifecycleError::staging(
            crate::error::StagePhase::Set,
            Some(FieldPath::root("name")),
            "empty name",
        ));
        assert_eq!(diag.to_string(), "Config Set Error (name): empty name");

        let warn = Diagnostic::Warning {
            summary: COMMIT_WARNING_SUMMARY.to_string(),
            detail: "statement has no effect".to_string(),
        };
        assert_eq!(
            warn.to_string(),
            "Config Commit Warning: statement has no effect"
        );
    }
}
