//! Issue collection for recoverable data problems.
//!
//! Assembly never aborts on bad records. Every repair, fallback and skip is
//! recorded as a [`DiagnosticIssue`] carrying:
//!
//! - a [`Severity`] (Warning, Error)
//! - an [`IssueKind`] naming the class of problem
//! - an optional entity reference (e.g. a bus or link name)
//! - an optional source row for file-based records
//!
//! # Example
//!
//! ```
//! use mcg_core::diagnostics::{Diagnostics, IssueKind};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning(IssueKind::BoundInconsistency, "p_nom_max below p_nom_min");
//! diag.add_error_with_entity(
//!     IssueKind::UnresolvableReference,
//!     "bus 'XX_EL' not found",
//!     "XX_pv",
//! );
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use serde::{Deserialize, Serialize};

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Repaired or defaulted, processing continued
    Warning,
    /// Record dropped or stage failed
    Error,
}

/// Class of a diagnostic issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A bus reference could not be resolved to any existing bus.
    UnresolvableReference,
    /// Two raw bus names canonicalize to the same name.
    CanonicalizationConflict,
    /// A link efficiency was absent, non-numeric or negative.
    IllPosedEfficiency,
    /// Capacity bounds were not ordered and have been clamped.
    BoundInconsistency,
    /// A bus with positive demand has no reachable supply.
    StructuralInfeasibilityRisk,
    /// The dispatch solver failed or returned no usable solution.
    SolverFailure,
    /// A malformed or incomplete input record.
    InvalidRecord,
    /// Network-wide structural problems.
    Structure,
    /// Scenario targets that could not be applied.
    Scenario,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::UnresolvableReference => "unresolvable_reference",
            IssueKind::CanonicalizationConflict => "canonicalization_conflict",
            IssueKind::IllPosedEfficiency => "ill_posed_efficiency",
            IssueKind::BoundInconsistency => "bound_inconsistency",
            IssueKind::StructuralInfeasibilityRisk => "structural_infeasibility_risk",
            IssueKind::SolverFailure => "solver_failure",
            IssueKind::InvalidRecord => "invalid_record",
            IssueKind::Structure => "structure",
            IssueKind::Scenario => "scenario",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic issue encountered during an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    pub kind: IssueKind,
    /// Human-readable description of the issue
    pub message: String,
    /// Source row (1-based, header excluded) for file-based records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// Offending entity (e.g. "DE_EL", "DE_chp_1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(severity: Severity, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            row: None,
            entity: None,
        }
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.kind, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        if let Some(row) = self.row {
            write!(f, " at row {}", row)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for an operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw issue directly
    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    // =========================================================================
    // Warning Methods
    // =========================================================================

    pub fn add_warning(&mut self, kind: IssueKind, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, kind, message));
    }

    pub fn add_warning_at_row(&mut self, kind: IssueKind, message: &str, row: usize) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, kind, message).with_row(row));
    }

    pub fn add_warning_with_entity(&mut self, kind: IssueKind, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, kind, message).with_entity(entity));
    }

    // =========================================================================
    // Error Methods
    // =========================================================================

    pub fn add_error(&mut self, kind: IssueKind, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, kind, message));
    }

    pub fn add_error_at_row(&mut self, kind: IssueKind, message: &str, row: usize) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, kind, message).with_row(row));
    }

    pub fn add_error_with_entity(&mut self, kind: IssueKind, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, kind, message).with_entity(entity));
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    /// Get issues filtered by kind
    pub fn issues_of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    /// Issues whose entity matches `entity` exactly.
    pub fn issues_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues
            .iter()
            .filter(move |i| i.entity.as_deref() == Some(entity))
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    // =========================================================================
    // Utility Methods
    // =========================================================================

    /// Merge another diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn clear(&mut self) {
        self.issues.clear();
    }

    pub fn summary(&self) -> String {
        let warnings = self.warning_count();
        let errors = self.error_count();

        match (warnings, errors) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (0, e) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (w, e) => format!(
                "{} warning{}, {} error{}",
                w,
                if w == 1 { "" } else { "s" },
                e,
                if e == 1 { "" } else { "s" }
            ),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.add_warning(IssueKind::InvalidRecord, "test warning");
        diag.add_error(IssueKind::InvalidRecord, "test error");
        diag.add_warning_at_row(IssueKind::BoundInconsistency, "row warning", 42);

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.len(), 3);
        assert!(diag.has_errors());
        assert!(diag.has_warnings());
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.add_warning_at_row(IssueKind::IllPosedEfficiency, "efficiency defaulted", 47);
        diag.add_error_with_entity(IssueKind::UnresolvableReference, "bus missing", "DE_pv");

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"warning\""));
        assert!(json.contains("\"ill_posed_efficiency\""));
        assert!(json.contains("\"row\": 47"));
        assert!(json.contains("\"entity\": \"DE_pv\""));

        let parsed: Diagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, diag);
    }

    #[test]
    fn test_diagnostic_issue_display() {
        let issue = DiagnosticIssue::new(
            Severity::Error,
            IssueKind::CanonicalizationConflict,
            "collides with DE_EL",
        )
        .with_entity("de_el")
        .with_row(3);

        let display = format!("{}", issue);
        assert!(display.contains("error"));
        assert!(display.contains("canonicalization_conflict"));
        assert!(display.contains("de_el"));
        assert!(display.contains("row 3"));
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");

        diag.add_warning(IssueKind::Scenario, "warning");
        assert_eq!(diag.summary(), "1 warning");

        diag.add_error(IssueKind::Scenario, "error");
        assert_eq!(diag.summary(), "1 warning, 1 error");

        diag.add_warning(IssueKind::Scenario, "another warning");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
    }

    #[test]
    fn test_issues_of_kind_and_entity() {
        let mut diag = Diagnostics::new();
        diag.add_warning_with_entity(IssueKind::IllPosedEfficiency, "absent", "chp_1");
        diag.add_warning_with_entity(IssueKind::BoundInconsistency, "clamped", "chp_1");
        diag.add_error(IssueKind::IllPosedEfficiency, "negative");

        assert_eq!(diag.issues_of_kind(IssueKind::IllPosedEfficiency).count(), 2);
        assert_eq!(diag.issues_for("chp_1").count(), 2);
        assert_eq!(diag.issues_for("chp_2").count(), 0);
    }

    #[test]
    fn test_diagnostics_merge() {
        let mut diag1 = Diagnostics::new();
        diag1.add_warning(IssueKind::InvalidRecord, "warning 1");

        let mut diag2 = Diagnostics::new();
        diag2.add_error(IssueKind::SolverFailure, "error 1");

        diag1.merge(diag2);
        assert_eq!(diag1.warning_count(), 1);
        assert_eq!(diag1.error_count(), 1);
    }
}
