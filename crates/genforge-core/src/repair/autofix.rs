//! Deterministic fixes.
//!
//! Each fix resolves one finding kind without a model call and returns the
//! new content only when it changed something.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use genforge_state::FileOperation;

use crate::domain::{ErrorCategory, ValidationResult};
use crate::validator::imports::{missing_imports, parse_imports};
use crate::validator::scanner::{balance, code_only, ScanMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchKind {
    MarkdownFence,
    Import,
    Delimiters,
    AiRewrite,
}

/// One change applied to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub file: String,
    pub kind: PatchKind,
    pub description: String,
}

/// Drop markdown fence lines (```` ``` ```` and ```` ```tsx ````).
pub fn strip_markdown_fences(content: &str) -> Option<String> {
    let mut removed = false;
    let kept: Vec<&str> = content
        .lines()
        .filter(|line| {
            let fence = line.trim_start().starts_with("```");
            removed |= fence;
            !fence
        })
        .collect();
    if !removed {
        return None;
    }
    let mut out = kept.join("\n");
    if content.ends_with('\n') {
        out.push('\n');
    }
    Some(out)
}

/// Add imports for known symbols used without one.
///
/// Symbols are merged into an existing `{ ... }` import from the same module,
/// added beside a default import (`import D, { .. }`), or inserted as a new
/// import line after the last existing import. Namespace and `import type`
/// statements are never extended.
pub fn fix_missing_imports(content: &str, mode: ScanMode) -> Option<(String, Vec<String>)> {
    let code = code_only(content, mode);
    let missing = missing_imports(content, &code);
    if missing.is_empty() {
        return None;
    }

    let mut by_module: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for m in &missing {
        by_module.entry(m.module.clone()).or_default().push(m.symbol.clone());
    }

    let mut out = content.to_string();
    for (module, symbols) in &by_module {
        out = add_named_imports(&out, module, symbols);
    }
    Some((out, missing.into_iter().map(|m| m.symbol).collect()))
}

fn add_named_imports(content: &str, module: &str, symbols: &[String]) -> String {
    let imports = parse_imports(content);
    let list = symbols.join(", ");

    if let Some(existing) = imports.iter().find(|s| s.module == module && s.accepts_value_names()) {
        let (start, end) = existing.span;
        let statement = &content[start..end];
        let rewritten = if existing.has_named_group {
            match statement.rfind('}') {
                Some(close) => {
                    let before = statement[..close].trim_end();
                    let sep = if before.ends_with('{') || before.ends_with(',') { " " } else { ", " };
                    format!("{before}{sep}{list} {}", &statement[close..])
                }
                None => statement.to_string(),
            }
        } else {
            // `import D from 'm'` -> `import D, { a } from 'm'`
            match statement.find(" from") {
                Some(from) => format!("{}, {{ {list} }}{}", &statement[..from], &statement[from..]),
                None => statement.to_string(),
            }
        };
        return format!("{}{}{}", &content[..start], rewritten, &content[end..]);
    }

    let line = format!("import {{ {list} }} from '{module}';");
    match imports.last() {
        Some(last) => {
            // After the statement's line end (and its semicolon, if any).
            let tail_start = content[last.span.1..]
                .find('\n')
                .map_or(content.len(), |i| last.span.1 + i);
            let (head, tail) = content.split_at(tail_start);
            format!("{head}\n{line}{tail}")
        }
        None => format!("{line}\n{content}"),
    }
}

/// Append closers for every unclosed opener, innermost first, one per line.
pub fn fix_unbalanced_delimiters(content: &str, mode: ScanMode) -> Option<String> {
    let report = balance(content, mode);
    let suffix = report.closing_suffix();
    if suffix.is_empty() {
        return None;
    }
    let mut out = content.trim_end().to_string();
    for closer in suffix {
        out.push('\n');
        out.push(closer);
    }
    out.push('\n');
    Some(out)
}

/// Apply every deterministic fix the findings call for. Returns the patches
/// applied; `files` is updated in place.
pub fn apply_auto_fixes(files: &mut [FileOperation], validation: &ValidationResult) -> Vec<Patch> {
    let mut wanted: BTreeMap<&str, Vec<ErrorCategory>> = BTreeMap::new();
    for finding in validation.findings().filter(|f| f.auto_fixable) {
        wanted.entry(finding.file.as_str()).or_default().push(finding.category);
    }

    let mut patches = Vec::new();
    for file in files.iter_mut().filter(|f| !f.is_delete()) {
        let Some(categories) = wanted.get(file.path.as_str()) else {
            continue;
        };
        let Some(mode) = ScanMode::for_path(&file.path) else {
            continue;
        };

        // Fences first: they hide everything else.
        if categories.contains(&ErrorCategory::Syntax) {
            if let Some(stripped) = strip_markdown_fences(&file.content) {
                file.content = stripped;
                patches.push(Patch {
                    file: file.path.clone(),
                    kind: PatchKind::MarkdownFence,
                    description: "removed markdown fence lines".to_string(),
                });
            }
        }
        if categories.contains(&ErrorCategory::Import) && mode == ScanMode::Script {
            if let Some((fixed, symbols)) = fix_missing_imports(&file.content, mode) {
                file.content = fixed;
                patches.push(Patch {
                    file: file.path.clone(),
                    kind: PatchKind::Import,
                    description: format!("imported {}", symbols.join(", ")),
                });
            }
        }
        if categories.contains(&ErrorCategory::Syntax) {
            if let Some(fixed) = fix_unbalanced_delimiters(&file.content, mode) {
                let added = fixed.len().saturating_sub(file.content.trim_end().len());
                file.content = fixed;
                patches.push(Patch {
                    file: file.path.clone(),
                    kind: PatchKind::Delimiters,
                    description: format!("appended missing closers ({} chars)", added),
                });
            }
        }
    }
    patches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;

    #[test]
    fn strips_fences_only_when_present() {
        assert_eq!(
            strip_markdown_fences("```tsx\nconst a = 1;\n```\n").as_deref(),
            Some("const a = 1;\n")
        );
        assert!(strip_markdown_fences("const a = 1;\n").is_none());
    }

    #[test]
    fn inserts_new_import_at_top_when_none_exist() {
        let (fixed, symbols) = fix_missing_imports(
            "export default function A(){ return <div>{useState(0)}</div> }",
            ScanMode::Script,
        )
        .unwrap();
        assert_eq!(symbols, vec!["useState"]);
        assert!(fixed.starts_with("import { useState } from 'react';\n"));
    }

    #[test]
    fn merges_into_existing_named_import() {
        let src = "import { useState } from 'react';\nconst a = useState(0);\nuseEffect(() => {}, []);\n";
        let (fixed, _) = fix_missing_imports(src, ScanMode::Script).unwrap();
        assert!(fixed.starts_with("import { useState, useEffect } from 'react';"), "{fixed}");
    }

    #[test]
    fn extends_default_import() {
        let src = "import React from 'react';\nconst a = useRef(null);\n";
        let (fixed, _) = fix_missing_imports(src, ScanMode::Script).unwrap();
        assert!(fixed.starts_with("import React, { useRef } from 'react';"), "{fixed}");
    }

    #[test]
    fn namespace_import_gets_a_sibling_line() {
        let src = "import * as React from 'react';\nconst [a] = useState(0);\n";
        let (fixed, _) = fix_missing_imports(src, ScanMode::Script).unwrap();
        assert_eq!(
            fixed,
            "import * as React from 'react';\nimport { useState } from 'react';\nconst [a] = useState(0);\n"
        );
    }

    #[test]
    fn type_only_import_gets_a_sibling_line() {
        let src = "import type { FC } from 'react';\nconst A: FC = () => { const [a] = useState(0); return null; };\n";
        let (fixed, _) = fix_missing_imports(src, ScanMode::Script).unwrap();
        assert!(fixed.starts_with("import type { FC } from 'react';\nimport { useState } from 'react';\n"), "{fixed}");
    }

    #[test]
    fn regex_braces_are_not_closed() {
        let src = "export const re = /\\{/g;\nexport function f(s) { return re.test(s); }\n";
        assert!(fix_unbalanced_delimiters(src, ScanMode::Script).is_none());
    }

    #[test]
    fn new_module_goes_after_last_import() {
        let src = "import React from 'react';\nimport './index.css';\n\nconst n = <nav><Menu /></nav>;\n";
        let (fixed, _) = fix_missing_imports(src, ScanMode::Script).unwrap();
        assert_eq!(
            fixed,
            "import React from 'react';\nimport './index.css';\nimport { Menu } from 'lucide-react';\n\nconst n = <nav><Menu /></nav>;\n"
        );
    }

    #[test]
    fn appends_closers_in_reverse_order() {
        let fixed = fix_unbalanced_delimiters("function A(){ return (<div>", ScanMode::Script).unwrap();
        assert_eq!(fixed, "function A(){ return (<div>\n)\n}\n");
        assert!(balance(&fixed, ScanMode::Script).braces.is_balanced());
    }

    #[test]
    fn apply_auto_fixes_resolves_import_errors() {
        let mut files = vec![FileOperation::create(
            "a.tsx",
            "export default function A(){ return <div>{useState(0)}</div> }",
        )];
        let validator = Validator::default();
        let before = validator.validate(&files);
        assert!(!before.valid);

        let patches = apply_auto_fixes(&mut files, &before);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].kind, PatchKind::Import);
        assert!(validator.validate(&files).valid);
    }
}
