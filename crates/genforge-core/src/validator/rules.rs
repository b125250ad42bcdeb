//! Declarative pattern rules.
//!
//! Each rule is one record; `apply_rules` runs the whole table in a single
//! loop. `Raw` rules see the file as written, `Code` rules see it with
//! comments and string contents blanked out.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{ErrorCategory, Severity, ValidationFinding};
use crate::validator::scanner::line_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    Raw,
    Code,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub pattern: &'static str,
    pub scope: RuleScope,
    pub category: ErrorCategory,
    pub severity: Severity,
    pub message: &'static str,
    pub fix: &'static str,
    pub auto_fixable: bool,
    /// Only applies to `.tsx`/`.jsx`.
    pub jsx_only: bool,
    /// Matches needed before the rule fires.
    pub min_matches: usize,
}

const fn rule(
    id: &'static str,
    pattern: &'static str,
    scope: RuleScope,
    category: ErrorCategory,
    severity: Severity,
    message: &'static str,
    fix: &'static str,
) -> Rule {
    Rule {
        id,
        pattern,
        scope,
        category,
        severity,
        message,
        fix,
        auto_fixable: false,
        jsx_only: false,
        min_matches: 1,
    }
}

const fn jsx(mut r: Rule) -> Rule {
    r.jsx_only = true;
    r
}

const fn auto_fixable(mut r: Rule) -> Rule {
    r.auto_fixable = true;
    r
}

const fn at_least(mut r: Rule, n: usize) -> Rule {
    r.min_matches = n;
    r
}

use ErrorCategory as C;
use RuleScope::{Code, Raw};
use Severity::{Error, Warning};

pub static RULES: &[Rule] = &[
    auto_fixable(rule(
        "markdown-fence",
        r"(?m)^\s*```",
        Raw,
        C::Syntax,
        Error,
        "Markdown code fence inside a source file",
        "Remove the ``` fence lines",
    )),
    jsx(rule(
        "jsx-class-attr",
        r"<[A-Za-z][^>]*\sclass=",
        Code,
        C::React,
        Warning,
        "`class` attribute used in JSX",
        "Use `className` instead of `class`",
    )),
    jsx(rule(
        "jsx-for-attr",
        r"<[A-Za-z][^>]*\sfor=",
        Code,
        C::React,
        Warning,
        "`for` attribute used in JSX",
        "Use `htmlFor` instead of `for`",
    )),
    rule(
        "async-effect",
        r"useEffect\(\s*async\b",
        Code,
        C::React,
        Error,
        "useEffect callback is async",
        "Define an async function inside the effect and call it",
    ),
    rule(
        "react-router-import",
        r#"from\s+['"]react-router['"]"#,
        Raw,
        C::Dependency,
        Warning,
        "Imports from `react-router` instead of `react-router-dom`",
        "Import routing components from 'react-router-dom'",
    ),
    rule(
        "commonjs-require",
        r"\brequire\s*\(",
        Code,
        C::Import,
        Warning,
        "CommonJS `require()` in an ES module",
        "Use an `import` statement",
    ),
    rule(
        "explicit-any",
        r":\s*any\b|\bas\s+any\b|<any>",
        Code,
        C::Type,
        Warning,
        "Explicit `any` type",
        "Replace `any` with a precise type",
    ),
    rule(
        "dangerous-html",
        r"dangerouslySetInnerHTML",
        Code,
        C::Runtime,
        Warning,
        "dangerouslySetInnerHTML renders unescaped HTML",
        "Render content as JSX children",
    ),
    jsx(rule(
        "handler-invoked",
        r"\bon[A-Z]\w*=\{\s*[A-Za-z_$][\w$.]*\([^)]*\)\s*\}",
        Code,
        C::React,
        Warning,
        "Event handler is called during render",
        "Pass a function: onClick={() => handler()}",
    )),
    at_least(
        rule(
            "duplicate-export",
            r"\bexport\s+default\b",
            Code,
            C::Syntax,
            Error,
            "More than one `export default` in a file",
            "Keep a single default export",
        ),
        2,
    ),
    rule(
        "document-write",
        r"\bdocument\.write\s*\(",
        Code,
        C::Runtime,
        Warning,
        "document.write breaks React rendering",
        "Render through React instead",
    ),
    rule(
        "truncation-comment",
        r"(?i)(//|/\*|\{/\*)\s*\.\.\.\s*(rest|remaining|existing|other|more|same)\b",
        Raw,
        C::Structure,
        Error,
        "File is truncated with an elision comment",
        "Write out the complete file",
    ),
    rule(
        "truncation-rest-of",
        r"(?i)\brest of (the )?(code|component|file|implementation|content)\b|\.\.\.\s*existing code",
        Raw,
        C::Structure,
        Error,
        "File refers to omitted code",
        "Write out the complete file",
    ),
    rule(
        "todo-marker",
        r"(?i)(//|/\*|\{/\*)\s*(TODO|FIXME)\b",
        Raw,
        C::Structure,
        Warning,
        "TODO left in generated code",
        "Implement the missing part",
    ),
    rule(
        "placeholder-comment",
        r"(?i)(//|/\*|\{/\*)\s*(add|insert|put|your|implement)\b[^\n]*\b(here|content|logic|code)\b",
        Raw,
        C::Structure,
        Warning,
        "Placeholder comment instead of content",
        "Replace the placeholder with real content",
    ),
    rule(
        "empty-default-component",
        r"export\s+default\s+function\s+[A-Z]\w*\s*\([^)]*\)\s*\{\s*\}",
        Code,
        C::Structure,
        Warning,
        "Default-exported component has an empty body",
        "Return the component markup",
    ),
    rule(
        "empty-jsx-return",
        r"\breturn\s*\(\s*\)",
        Code,
        C::Structure,
        Error,
        "Component returns an empty expression",
        "Return the component markup",
    ),
];

/// Rules with compiled patterns, built once.
static COMPILED: Lazy<Vec<(&'static Rule, Regex)>> = Lazy::new(|| {
    RULES
        .iter()
        .filter_map(|rule| Regex::new(rule.pattern).ok().map(|re| (rule, re)))
        .collect()
});

/// Look up a rule by id.
pub fn rule_by_id(id: &str) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.id == id)
}

/// Run one rule against a file.
pub fn check_rule(rule: &Rule, re: &Regex, path: &str, raw: &str, code: &str) -> Option<ValidationFinding> {
    let text = match rule.scope {
        RuleScope::Raw => raw,
        RuleScope::Code => code,
    };
    let mut matches = re.find_iter(text);
    let first = matches.next()?;
    if 1 + matches.count() < rule.min_matches {
        return None;
    }
    let finding = ValidationFinding {
        category: rule.category,
        file: path.to_string(),
        message: rule.message.to_string(),
        fix: rule.fix.to_string(),
        severity: rule.severity,
        auto_fixable: rule.auto_fixable,
        line: None,
    };
    Some(finding.at_line(line_of(text, first.start())))
}

/// Every table rule that fires on `raw` (and its code-only view `code`).
pub fn apply_rules(path: &str, raw: &str, code: &str, is_jsx: bool) -> Vec<ValidationFinding> {
    COMPILED
        .iter()
        .filter(|(rule, _)| is_jsx || !rule.jsx_only)
        .filter_map(|(rule, re)| check_rule(rule, re, path, raw, code))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::scanner::{code_only, ScanMode};

    fn fires(id: &str, source: &str) -> bool {
        let rule = rule_by_id(id).unwrap();
        let re = Regex::new(rule.pattern).unwrap();
        let code = code_only(source, ScanMode::Script);
        check_rule(rule, &re, "src/A.tsx", source, &code).is_some()
    }

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(COMPILED.len(), RULES.len());
        let mut ids: Vec<_> = RULES.iter().map(|r| r.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), RULES.len());
    }

    #[test]
    fn markdown_fence() {
        assert!(fires("markdown-fence", "```tsx\nconst a = 1;\n```"));
        assert!(!fires("markdown-fence", "const s = 1;"));
    }

    #[test]
    fn jsx_attributes() {
        assert!(fires("jsx-class-attr", "<div class=\"x\">hi</div>"));
        assert!(!fires("jsx-class-attr", "<div className=\"x\">hi</div>"));
        assert!(fires("jsx-for-attr", "<label for=\"email\">Email</label>"));
        assert!(!fires("jsx-for-attr", "<label htmlFor=\"email\">Email</label>"));
    }

    #[test]
    fn async_effect() {
        assert!(fires("async-effect", "useEffect(async () => { await load(); }, []);"));
        assert!(!fires("async-effect", "useEffect(() => { load(); }, []);"));
    }

    #[test]
    fn react_router_import() {
        assert!(fires("react-router-import", "import { Link } from 'react-router';"));
        assert!(!fires("react-router-import", "import { Link } from 'react-router-dom';"));
    }

    #[test]
    fn require_and_any() {
        assert!(fires("commonjs-require", "const fs = require('fs');"));
        assert!(fires("explicit-any", "function f(x: any) {}"));
        assert!(!fires("explicit-any", "const company = 1;"));
    }

    #[test]
    fn handler_invoked_during_render() {
        assert!(fires("handler-invoked", "<button onClick={handleClick()}>Go</button>"));
        assert!(!fires("handler-invoked", "<button onClick={() => handleClick()}>Go</button>"));
        assert!(!fires("handler-invoked", "<button onClick={handleClick}>Go</button>"));
    }

    #[test]
    fn duplicate_export_needs_two_matches() {
        assert!(!fires("duplicate-export", "export default function A() { return null; }"));
        assert!(fires(
            "duplicate-export",
            "export default function A() {}\nexport default function B() {}"
        ));
    }

    #[test]
    fn truncation_markers() {
        assert!(fires("truncation-comment", "// ... rest of the component"));
        assert!(fires("truncation-rest-of", "{/* rest of the content */}"));
        assert!(!fires("truncation-rest-of", "const restOfList = items.slice(1);"));
    }

    #[test]
    fn todo_and_placeholder_comments() {
        assert!(fires("todo-marker", "// TODO: wire up the form"));
        assert!(fires("placeholder-comment", "{/* Add your content here */}"));
        assert!(!fires("placeholder-comment", "<input placeholder=\"Your email\" />"));
    }

    #[test]
    fn empty_component_and_return() {
        assert!(fires("empty-default-component", "export default function Hero() {}"));
        assert!(fires("empty-jsx-return", "return ( );"));
        assert!(!fires("empty-jsx-return", "return (<div />);"));
    }

    #[test]
    fn code_scope_ignores_comments() {
        assert!(!fires("dangerous-html", "// never use dangerouslySetInnerHTML"));
        assert!(fires("document-write", "document.write('x');"));
    }

    #[test]
    fn line_of_first_match_is_reported() {
        let rule = rule_by_id("explicit-any").unwrap();
        let re = Regex::new(rule.pattern).unwrap();
        let src = "const a = 1;\nconst b: any = 2;";
        let finding = check_rule(rule, &re, "a.ts", src, src).unwrap();
        assert_eq!(finding.line, Some(2));
    }
}
