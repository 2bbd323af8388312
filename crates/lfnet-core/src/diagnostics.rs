//! Collection of recoverable issues met while resolving contingencies and actions.
//!
//! Unknown element ids are not fatal: the element may live in another network
//! instance. They are logged and recorded here so the caller can report them.
//!
//! ```
//! use lfnet_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("contingency", "branch not found in this network", "L7");
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.summary(), "1 warning");
//! ```

use serde::Serialize;

use crate::error::TopoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Element skipped, analysis continued
    Warning,
    /// Input rejected
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g. "contingency", "action")
    pub category: String,
    pub message: String,
    /// Element id the issue refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
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
        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    /// Record a rejected input, keeping the element id when the error carries one.
    pub fn add_topo_error(&mut self, category: &str, error: &TopoError) {
        let issue = DiagnosticIssue::new(Severity::Error, category, error.to_string());
        let issue = match error {
            TopoError::UnknownElement { id, .. } => issue.with_entity(id.clone()),
            _ => issue,
        };
        self.issues.push(issue);
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn issues_by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn summary(&self) -> String {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        match (self.warning_count(), self.error_count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{w} warning{}", plural(w)),
            (0, e) => format!("{e} error{}", plural(e)),
            (w, e) => format!("{w} warning{}, {e} error{}", plural(w), plural(e)),
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
    fn test_summary_counts() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");
        diag.add_warning_with_entity("contingency", "unknown branch", "L1");
        diag.add_topo_error("action", &TopoError::unknown_branch("T4"));
        diag.add_warning_with_entity("action", "unknown switch", "S2");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
        assert_eq!(diag.issues_by_category("action").count(), 2);
        assert_eq!(diag.issues[1].entity.as_deref(), Some("T4"));
    }

    #[test]
    fn test_serialization_skips_missing_entity() {
        let mut diag = Diagnostics::new();
        diag.add(DiagnosticIssue::new(Severity::Error, "action", "no tap changer"));
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"error\""));
        assert!(!json.contains("entity"));
    }

    #[test]
    fn test_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Warning, "contingency", "skipped").with_entity("L3");
        assert_eq!(issue.to_string(), "[warning:contingency] skipped (L3)");
    }
}
