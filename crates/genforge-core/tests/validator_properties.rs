//! Validator properties over hand-written file sets.

use genforge_core::repair::apply_auto_fixes;
use genforge_core::validator::scanner::{balance, ScanMode};
use genforge_core::{ErrorCategory, FileOperation, Validator};

fn corpus() -> Vec<Vec<FileOperation>> {
    vec![
        vec![FileOperation::create(
            "a.tsx",
            "export default function A(){ return <div>{useState(0)}</div> }",
        )],
        vec![FileOperation::create("src/A.tsx", "function A(){ return (<div>")],
        vec![FileOperation::create(
            "src/App.tsx",
            "import { useState } from 'react';\n\nexport default function App() {\n  const [n, setN] = useState(0);\n  return <button onClick={() => setN(n + 1)}>{n}</button>;\n}\n",
        )],
        vec![
            FileOperation::create("src/index.css", "body { margin: 0; }\n.a { color: red; "),
            FileOperation::create("package.json", "{ \"dependencies\": { \"react\": \"18\" } }"),
        ],
        vec![FileOperation::create(
            "src/Todo.tsx",
            "export default function Todo() {\n  // TODO: finish\n  return <p>x</p>;\n}\n",
        )],
        vec![FileOperation::create("src/broken.json", "{ \"a\": ")],
    ]
}

#[test]
fn valid_iff_no_critical_errors() {
    let validator = Validator::default();
    for files in corpus() {
        let result = validator.validate(&files);
        assert_eq!(result.valid, result.critical_errors.is_empty(), "{files:?}");
        assert!((0.0..=100.0).contains(&result.score));
    }
}

#[test]
fn clean_file_gets_max_score() {
    let files = vec![FileOperation::create(
        "src/util.ts",
        "export const greet = (name: string) => `hello ${name}`;\n",
    )];
    let result = Validator::default().validate(&files);
    assert!(result.valid);
    assert_eq!(result.score, 100.0);
    assert!(result.suggestions.is_empty());
}

#[test]
fn unimported_hook_is_one_critical_import_error() {
    let files = vec![FileOperation::create(
        "a.tsx",
        "export default function A(){ return <div>{useState(0)}</div> }",
    )];
    let result = Validator::default().validate(&files);
    assert!(!result.valid);
    assert_eq!(result.critical_errors.len(), 1);
    assert_eq!(result.critical_errors[0].category, ErrorCategory::Import);
    assert!(result.critical_errors[0].message.contains("useState"));
}

#[test]
fn missing_closers_are_syntax_errors_and_brace_fix_balances() {
    let mut files = vec![FileOperation::create("src/A.tsx", "function A(){ return (<div>")];
    let validator = Validator::default();
    let result = validator.validate(&files);
    assert!(!result.valid);
    assert!(result
        .critical_errors
        .iter()
        .any(|e| e.category == ErrorCategory::Syntax && e.auto_fixable));

    let patches = apply_auto_fixes(&mut files, &result);
    assert!(!patches.is_empty());
    let report = balance(&files[0].content, ScanMode::Script);
    assert!(report.braces.is_balanced());
    assert!(report.parens.is_balanced());
}

#[test]
fn style_files_only_check_braces() {
    let files = vec![FileOperation::create("src/index.css", ".a { color: red; ")];
    let result = Validator::default().validate(&files);
    assert_eq!(result.critical_errors.len(), 1);
    assert_eq!(result.critical_errors[0].category, ErrorCategory::Syntax);
}

#[test]
fn todo_comment_is_a_warning_only() {
    let files = vec![FileOperation::create(
        "src/Todo.tsx",
        "export default function Todo() {\n  // TODO: finish\n  return <p>x</p>;\n}\n",
    )];
    let result = Validator::default().validate(&files);
    assert!(result.valid);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.score, 95.0);
}

#[test]
fn undeclared_package_is_a_dependency_warning() {
    let files = vec![
        FileOperation::create("package.json", "{ \"dependencies\": { \"react\": \"18\" } }"),
        FileOperation::create(
            "src/App.tsx",
            "import { useState } from 'react';\nimport { motion } from 'framer-motion';\n\nexport default function App() {\n  const [n] = useState(0);\n  return <motion.div>{n}</motion.div>;\n}\n",
        ),
    ];
    let result = Validator::default().validate(&files);
    assert!(result.valid);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.category == ErrorCategory::Dependency && w.message.contains("framer-motion")));
}

#[test]
fn deleted_files_are_not_validated() {
    let files = vec![FileOperation::delete("src/A.tsx")];
    let result = Validator::default().validate(&files);
    assert!(result.valid);
    assert_eq!(result.score, 100.0);
}
