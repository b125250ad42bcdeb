//! Static validator for generated file sets.
//!
//! Pure and synchronous: the same files always produce the same result. This
//! is pattern-level analysis over text, not a type checker.
//!
//! Per script file: the rule table, delimiter balance, a JSX tag balance
//! warning and the import cross-check. Style files only get brace balance,
//! `.json` files must parse, and when the set carries a `package.json` every
//! bare import must be listed in it.

pub mod imports;
pub mod rules;
pub mod scanner;

use std::collections::BTreeSet;

use genforge_state::FileOperation;

use crate::domain::{ErrorCategory, ScorePenalties, ValidationFinding, ValidationResult};
use scanner::{balance, code_only, BalanceReport, ScanMode};

pub use imports::{missing_imports, MissingImport};
pub use rules::{Rule, RuleScope, RULES};
pub use scanner::{scan, Region, Unterminated};

#[derive(Debug, Clone, Default)]
pub struct Validator {
    penalties: ScorePenalties,
}

impl Validator {
    pub fn new(penalties: ScorePenalties) -> Self {
        Self { penalties }
    }

    pub fn penalties(&self) -> &ScorePenalties {
        &self.penalties
    }

    /// Validate a whole file set. Delete operations are skipped.
    pub fn validate(&self, files: &[FileOperation]) -> ValidationResult {
        let mut findings = Vec::new();
        for file in files.iter().filter(|f| !f.is_delete()) {
            findings.extend(validate_file(file));
        }
        findings.extend(check_dependencies(files));
        ValidationResult::from_findings(findings, &self.penalties)
    }
}

/// Findings for a single file, independent of the rest of the set.
pub fn validate_file(file: &FileOperation) -> Vec<ValidationFinding> {
    let ext = file.extension().unwrap_or_default();
    if ext == "json" {
        return check_json(file).into_iter().collect();
    }
    match ScanMode::for_path(&file.path) {
        Some(ScanMode::Script) => validate_script(file, &ext),
        Some(ScanMode::Style) => validate_style(file),
        None => Vec::new(),
    }
}

fn validate_script(file: &FileOperation, ext: &str) -> Vec<ValidationFinding> {
    let path = file.path.as_str();
    let source = file.content.as_str();
    if source.trim().is_empty() {
        return vec![ValidationFinding::warning(
            ErrorCategory::Structure,
            path,
            "File is empty",
            "Generate the file contents or remove the file",
        )];
    }

    let is_jsx = ext == "tsx" || ext == "jsx";
    let code = code_only(source, ScanMode::Script);

    let mut findings = rules::apply_rules(path, source, &code, is_jsx);

    let report = balance(source, ScanMode::Script);
    findings.extend(balance_findings(path, &report));
    if is_jsx && !report.jsx_balanced() {
        findings.push(ValidationFinding::warning(
            ErrorCategory::React,
            path,
            format!(
                "JSX tags look unbalanced ({} opened, {} closed)",
                report.jsx_open, report.jsx_close
            ),
            "Close every JSX element or use a self-closing tag",
        ));
    }

    findings.extend(
        missing_imports(source, &code)
            .iter()
            .map(|m| imports::missing_import_finding(path, m)),
    );
    findings
}

fn validate_style(file: &FileOperation) -> Vec<ValidationFinding> {
    let report = balance(&file.content, ScanMode::Style);
    let mut findings = Vec::new();
    if !report.braces.is_balanced() {
        findings.push(delimiter_finding(&file.path, "braces", &report.braces));
    }
    if let Some(open) = report.unterminated {
        findings.push(unterminated_finding(&file.path, open));
    }
    findings
}

fn balance_findings(path: &str, report: &BalanceReport) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    for (name, counts) in [
        ("braces", &report.braces),
        ("parentheses", &report.parens),
        ("brackets", &report.brackets),
    ] {
        if !counts.is_balanced() {
            findings.push(delimiter_finding(path, name, counts));
        }
    }
    if let Some(open) = report.unterminated {
        findings.push(unterminated_finding(path, open));
    }
    findings
}

fn delimiter_finding(path: &str, name: &str, counts: &scanner::DelimiterCounts) -> ValidationFinding {
    ValidationFinding::error(
        ErrorCategory::Syntax,
        path,
        format!(
            "Unbalanced {name}: {} opened, {} closed",
            counts.open, counts.close
        ),
        format!("Close every open {name} or remove the stray closer"),
    )
    // Only missing closers can be appended mechanically.
    .fixable(counts.open > counts.close)
}

fn unterminated_finding(path: &str, open: Unterminated) -> ValidationFinding {
    ValidationFinding::error(
        ErrorCategory::Syntax,
        path,
        format!("Unterminated {open}"),
        format!("Close the {open}"),
    )
}

fn check_json(file: &FileOperation) -> Option<ValidationFinding> {
    let err = serde_json::from_str::<serde_json::Value>(&file.content).err()?;
    Some(
        ValidationFinding::error(
            ErrorCategory::Syntax,
            &file.path,
            format!("Invalid JSON: {err}"),
            "Fix the JSON syntax",
        )
        .at_line(err.line()),
    )
}

/// Packages listed in a `package.json` dependency table, `None` if it does not parse.
pub fn declared_packages(package_json: &str) -> Option<BTreeSet<String>> {
    let value: serde_json::Value = serde_json::from_str(package_json).ok()?;
    let mut names = BTreeSet::new();
    for table in ["dependencies", "devDependencies", "peerDependencies"] {
        if let Some(deps) = value.get(table).and_then(|d| d.as_object()) {
            names.extend(deps.keys().cloned());
        }
    }
    Some(names)
}

fn check_dependencies(files: &[FileOperation]) -> Vec<ValidationFinding> {
    let Some(manifest) = files
        .iter()
        .find(|f| !f.is_delete() && (f.path == "package.json" || f.path.ends_with("/package.json")))
    else {
        return Vec::new();
    };
    // An unparsable manifest is already reported by the JSON check.
    let Some(declared) = declared_packages(&manifest.content) else {
        return Vec::new();
    };

    let mut findings = Vec::new();
    for file in files.iter().filter(|f| !f.is_delete()) {
        if ScanMode::for_path(&file.path) != Some(ScanMode::Script) {
            continue;
        }
        let mut reported = BTreeSet::new();
        for statement in imports::parse_imports(&file.content) {
            let Some(package) = imports::package_name(&statement.module) else {
                continue;
            };
            if !declared.contains(package) && reported.insert(package.to_string()) {
                findings.push(ValidationFinding::warning(
                    ErrorCategory::Dependency,
                    &file.path,
                    format!("Package `{package}` is imported but not listed in package.json"),
                    format!("Add `{package}` to dependencies"),
                ));
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(files: Vec<FileOperation>) -> ValidationResult {
        Validator::default().validate(&files)
    }

    #[test]
    fn clean_component_scores_max() {
        let result = validate(vec![FileOperation::create(
            "src/components/Hero.tsx",
            "import { useState } from 'react';\n\n\
             export default function Hero() {\n  const [open, setOpen] = useState(false);\n  \
             return (\n    <section className=\"p-4\">\n      <button onClick={() => setOpen(!open)}>Toggle</button>\n    </section>\n  );\n}\n",
        )]);
        assert!(result.valid, "{result:?}");
        assert_eq!(result.score, 100.0);
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn style_files_only_check_braces() {
        let result = validate(vec![FileOperation::create("src/index.css", ".a { color: red; ")]);
        assert!(!result.valid);
        assert_eq!(result.critical_errors.len(), 1);
        assert!(result.critical_errors[0].auto_fixable);
    }

    #[test]
    fn invalid_json_is_critical() {
        let result = validate(vec![FileOperation::create("package.json", "{ \"name\": ")]);
        assert!(!result.valid);
        assert_eq!(result.critical_errors[0].category, ErrorCategory::Syntax);
    }

    #[test]
    fn unlisted_package_is_a_dependency_warning() {
        let result = validate(vec![
            FileOperation::create(
                "package.json",
                r#"{"dependencies": {"react": "^18.2.0", "lucide-react": "^0.300.0"}}"#,
            ),
            FileOperation::create(
                "src/App.tsx",
                "import { motion } from 'framer-motion';\nimport { Menu } from 'lucide-react';\n\
                 import Hero from './Hero';\nexport default function App() { return <motion.div><Menu /><Hero /></motion.div>; }\n",
            ),
        ]);
        assert!(result.valid, "{result:?}");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].category, ErrorCategory::Dependency);
        assert!(result.warnings[0].message.contains("framer-motion"));
    }

    #[test]
    fn empty_script_is_a_warning() {
        let result = validate(vec![FileOperation::create("src/a.ts", "  \n")]);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn deletes_and_unknown_files_are_skipped() {
        let result = validate(vec![
            FileOperation::delete("src/Old.tsx"),
            FileOperation::create("README.md", "```\n{ unbalanced\n"),
        ]);
        assert!(result.valid);
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn jsx_mismatch_is_only_a_warning() {
        let result = validate(vec![FileOperation::create(
            "src/A.tsx",
            "export default function A() { return (<div><span>hi</div>); }\n",
        )]);
        assert!(result.valid);
        assert_eq!(result.warnings[0].category, ErrorCategory::React);
    }
}
