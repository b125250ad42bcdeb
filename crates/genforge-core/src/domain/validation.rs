//! Validation findings and results.
//!
//! Findings are plain data. A result is valid exactly when it carries no
//! critical errors; warnings only lower the score.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Finding category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Syntax,
    Import,
    Type,
    Runtime,
    React,
    Dependency,
    Structure,
}

impl ErrorCategory {
    /// Category-level advice surfaced in `ValidationResult::suggestions`.
    pub fn suggestion(self) -> &'static str {
        match self {
            Self::Syntax => "Check generated files for unbalanced brackets and stray markdown fences.",
            Self::Import => "Import every hook, icon and router component a file uses.",
            Self::Type => "Prefer precise TypeScript types over `any`.",
            Self::Runtime => "Avoid browser APIs that are unsafe or break at runtime.",
            Self::React => "Follow JSX conventions: className, htmlFor and function event handlers.",
            Self::Dependency => "List every imported package in package.json and use react-router-dom for routing.",
            Self::Structure => "Regenerate truncated or placeholder sections with complete code.",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Syntax => "SYNTAX",
            Self::Import => "IMPORT",
            Self::Type => "TYPE",
            Self::Runtime => "RUNTIME",
            Self::React => "REACT",
            Self::Dependency => "DEPENDENCY",
            Self::Structure => "STRUCTURE",
        };
        f.write_str(s)
    }
}

/// Finding severity. Only `Error` makes a file set invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// One problem found in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub category: ErrorCategory,
    pub file: String,
    pub message: String,
    pub fix: String,
    pub severity: Severity,
    pub auto_fixable: bool,
    /// 1-based line of the first occurrence, when known.
    pub line: Option<usize>,
}

impl ValidationFinding {
    pub fn error(
        category: ErrorCategory,
        file: impl Into<String>,
        message: impl Into<String>,
        fix: impl Into<String>,
    ) -> Self {
        Self {
            category,
            file: file.into(),
            message: message.into(),
            fix: fix.into(),
            severity: Severity::Error,
            auto_fixable: false,
            line: None,
        }
    }

    pub fn warning(
        category: ErrorCategory,
        file: impl Into<String>,
        message: impl Into<String>,
        fix: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(category, file, message, fix)
        }
    }

    pub fn fixable(mut self, auto_fixable: bool) -> Self {
        self.auto_fixable = auto_fixable;
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Score deductions applied by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorePenalties {
    pub max_score: f32,
    pub critical: f32,
    pub warning: f32,
}

impl Default for ScorePenalties {
    fn default() -> Self {
        Self {
            max_score: 100.0,
            critical: 20.0,
            warning: 5.0,
        }
    }
}

/// Outcome of validating a file set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// `0..=penalties.max_score`.
    pub score: f32,
    pub critical_errors: Vec<ValidationFinding>,
    pub warnings: Vec<ValidationFinding>,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    /// Build a result from raw findings. `valid` is derived, never set directly.
    pub fn from_findings(findings: Vec<ValidationFinding>, penalties: &ScorePenalties) -> Self {
        let categories: BTreeSet<ErrorCategory> = findings.iter().map(|f| f.category).collect();
        let (critical_errors, warnings): (Vec<_>, Vec<_>) =
            findings.into_iter().partition(ValidationFinding::is_critical);

        let deduction = critical_errors.len() as f32 * penalties.critical
            + warnings.len() as f32 * penalties.warning;
        let score = (penalties.max_score - deduction).clamp(0.0, penalties.max_score);

        Self {
            valid: critical_errors.is_empty(),
            score,
            critical_errors,
            warnings,
            suggestions: categories
                .into_iter()
                .map(|c| c.suggestion().to_string())
                .collect(),
        }
    }

    /// A clean result with the maximum score.
    pub fn clean(penalties: &ScorePenalties) -> Self {
        Self::from_findings(Vec::new(), penalties)
    }

    /// Paths with at least one critical error, sorted.
    pub fn files_with_errors(&self) -> BTreeSet<String> {
        self.critical_errors.iter().map(|f| f.file.clone()).collect()
    }

    pub fn findings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.critical_errors.iter().chain(self.warnings.iter())
    }

    pub fn has_auto_fixable(&self) -> bool {
        self.findings().any(|f| f.auto_fixable)
    }
}
