//! Import cross-checks.
//!
//! Generated components routinely use a hook, an icon or a router component
//! without importing it. The dictionaries below map well-known symbols to
//! the module that provides them; usage is matched on the code-only view.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{ErrorCategory, ValidationFinding};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    /// `name(`
    Call,
    /// `<Name`
    Component,
}

const REACT_HOOKS: &[&str] = &[
    "useState",
    "useEffect",
    "useRef",
    "useMemo",
    "useCallback",
    "useContext",
    "useReducer",
    "useLayoutEffect",
    "useId",
    "useTransition",
    "useDeferredValue",
];

const ROUTER_COMPONENTS: &[&str] = &[
    "BrowserRouter",
    "Routes",
    "Route",
    "Link",
    "NavLink",
    "Navigate",
    "Outlet",
];

const ROUTER_HOOKS: &[&str] = &["useNavigate", "useParams", "useLocation", "useSearchParams"];

const LUCIDE_ICONS: &[&str] = &[
    "Menu", "X", "ArrowRight", "ArrowLeft", "Check", "CheckCircle", "Star", "ChevronDown",
    "ChevronRight", "ChevronLeft", "ChevronUp", "Mail", "Phone", "MapPin", "Github", "Twitter",
    "Linkedin", "Facebook", "Instagram", "Youtube", "Heart", "ShoppingCart", "ShoppingBag",
    "User", "Search", "Zap", "Shield", "Globe", "Clock", "Calendar", "Sparkles", "Rocket",
    "Play", "Users", "Award", "TrendingUp", "BarChart", "Code", "Coffee", "Utensils", "Dumbbell",
    "Home", "Plus", "Minus", "Send", "Quote", "Camera", "Briefcase", "BookOpen", "GraduationCap",
    "Stethoscope", "Plane", "Building", "Lock", "Settings", "Target", "Layers", "Loader2",
];

struct KnownSymbol {
    name: &'static str,
    module: &'static str,
    usage: Usage,
}

fn usage_pattern(name: &str, usage: Usage) -> String {
    match usage {
        Usage::Call => format!(r"(?:^|[^\w.$]){name}\s*\("),
        Usage::Component => format!(r"<{name}[\s/>]"),
    }
}

static KNOWN: Lazy<Vec<(KnownSymbol, Regex)>> = Lazy::new(|| {
    let groups: [(&[&str], &str, Usage); 4] = [
        (REACT_HOOKS, "react", Usage::Call),
        (ROUTER_COMPONENTS, "react-router-dom", Usage::Component),
        (ROUTER_HOOKS, "react-router-dom", Usage::Call),
        (LUCIDE_ICONS, "lucide-react", Usage::Component),
    ];
    groups
        .into_iter()
        .flat_map(|(names, module, usage)| {
            names.iter().map(move |&name| KnownSymbol {
                name,
                module,
                usage,
            })
        })
        .filter_map(|symbol| {
            Regex::new(&usage_pattern(symbol.name, symbol.usage))
                .ok()
                .map(|re| (symbol, re))
        })
        .collect()
});

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(type\s+)?([^;'"]*?)\s*from\s*['"]([^'"]+)['"]"#)
        .expect("import pattern")
});

static SIDE_EFFECT_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"]+)['"]"#).expect("import pattern"));

static DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:function|class|const|let|var|type|interface|enum)\s+([A-Za-z_$][\w$]*)")
        .expect("declaration pattern")
});

static DESTRUCTURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:const|let|var)\s*[\{\[]([^\}\]=]*)[\}\]]").expect("destructure pattern")
});

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_$][\w$]*").expect("identifier pattern"));

/// One parsed `import ... from 'module'` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub module: String,
    pub names: Vec<String>,
    /// Byte range of the whole statement in the source.
    pub span: (usize, usize),
    pub has_named_group: bool,
    /// `import * as NS from 'm'`.
    pub namespace: bool,
    /// `import type { .. } from 'm'`.
    pub type_only: bool,
}

impl ImportStatement {
    /// Whether value bindings can be added to this statement's clause.
    pub fn accepts_value_names(&self) -> bool {
        !self.names.is_empty() && !self.namespace && !self.type_only
    }
}

/// Every import statement, including side-effect imports (with no names).
pub fn parse_imports(source: &str) -> Vec<ImportStatement> {
    let mut out: Vec<ImportStatement> = IMPORT_RE
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let clause = caps.get(2)?.as_str();
            let module = caps.get(3)?.as_str().to_string();
            Some(ImportStatement {
                module,
                names: clause_names(clause),
                span: (whole.start(), whole.end()),
                has_named_group: clause.contains('{'),
                namespace: clause.contains('*'),
                type_only: caps.get(1).is_some(),
            })
        })
        .collect();
    out.extend(SIDE_EFFECT_IMPORT_RE.captures_iter(source).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(ImportStatement {
            module: caps.get(1)?.as_str().to_string(),
            names: Vec::new(),
            span: (whole.start(), whole.end()),
            has_named_group: false,
            namespace: false,
            type_only: false,
        })
    }));
    out.sort_by_key(|s| s.span.0);
    out
}

fn clause_names(clause: &str) -> Vec<String> {
    let mut names = Vec::new();
    let (outside, inside) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if close > open => (
            format!("{} {}", &clause[..open], &clause[close + 1..]),
            Some(&clause[open + 1..close]),
        ),
        _ => (clause.to_string(), None),
    };

    for part in outside.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        // `* as NS` or a default import.
        if let Some(alias) = part.rsplit_once(" as ").map(|(_, a)| a.trim()) {
            names.push(alias.to_string());
        } else if part != "*" {
            names.push(part.to_string());
        }
    }
    if let Some(inside) = inside {
        for part in inside.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let part = part.strip_prefix("type ").unwrap_or(part).trim();
            let local = part.rsplit_once(" as ").map_or(part, |(_, a)| a.trim());
            names.push(local.to_string());
        }
    }
    names
}

/// Local names bound by imports.
pub fn imported_names(source: &str) -> BTreeSet<String> {
    parse_imports(source)
        .into_iter()
        .flat_map(|s| s.names)
        .collect()
}

/// Local names declared in the file (functions, variables, destructuring).
pub fn declared_names(code: &str) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = DECLARATION_RE
        .captures_iter(code)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect();
    for caps in DESTRUCTURE_RE.captures_iter(code) {
        if let Some(group) = caps.get(1) {
            for part in group.as_str().split(',') {
                // `{ a: b }` binds b.
                let local = part.rsplit(':').next().unwrap_or(part);
                if let Some(ident) = IDENT_RE.find(local) {
                    names.insert(ident.as_str().to_string());
                }
            }
        }
    }
    names
}

/// A well-known symbol used without an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingImport {
    pub symbol: String,
    pub module: String,
}

/// Known symbols used in `code` that neither `source`'s imports nor its own
/// declarations provide.
pub fn missing_imports(source: &str, code: &str) -> Vec<MissingImport> {
    let imported = imported_names(source);
    let declared = declared_names(code);
    KNOWN
        .iter()
        .filter(|(symbol, _)| !imported.contains(symbol.name) && !declared.contains(symbol.name))
        .filter(|(_, re)| re.is_match(code))
        .map(|(symbol, _)| MissingImport {
            symbol: symbol.name.to_string(),
            module: symbol.module.to_string(),
        })
        .collect()
}

pub fn missing_import_finding(path: &str, missing: &MissingImport) -> ValidationFinding {
    ValidationFinding::error(
        ErrorCategory::Import,
        path,
        format!("`{}` is used but not imported", missing.symbol),
        format!(
            "Add `import {{ {} }} from '{}'`",
            missing.symbol, missing.module
        ),
    )
    .fixable(true)
}

/// The npm package an import specifier refers to, `None` for relative,
/// absolute and alias (`@/`, `~/`) specifiers.
pub fn package_name(specifier: &str) -> Option<&str> {
    if specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.starts_with("@/")
        || specifier.starts_with('~')
    {
        return None;
    }
    let mut segments = specifier.splitn(3, '/');
    let first = segments.next()?;
    if first.starts_with('@') {
        let second = segments.next()?;
        Some(&specifier[..first.len() + 1 + second.len()])
    } else {
        Some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::scanner::{code_only, ScanMode};

    fn missing(source: &str) -> Vec<String> {
        let code = code_only(source, ScanMode::Script);
        missing_imports(source, &code)
            .into_iter()
            .map(|m| m.symbol)
            .collect()
    }

    #[test]
    fn hook_without_import_is_missing() {
        let src = "export default function A(){ return <div>{useState(0)}</div> }";
        assert_eq!(missing(src), vec!["useState"]);
    }

    #[test]
    fn imported_and_aliased_names_count() {
        let src = "import React, { useState, useEffect as useFx } from 'react';\n\
                   import * as Icons from 'lucide-react';\n\
                   const a = useState(0); useFx(() => {}, []);";
        let names = imported_names(src);
        assert!(names.contains("React"));
        assert!(names.contains("useState"));
        assert!(names.contains("useFx"));
        assert!(names.contains("Icons"));
        assert!(missing(src).is_empty());
    }

    #[test]
    fn multiline_import_is_parsed() {
        let src = "import {\n  Menu,\n  X,\n} from 'lucide-react';\nconst n = <nav><Menu /><X size={4} /></nav>;";
        assert!(missing(src).is_empty());
    }

    #[test]
    fn icons_and_router_components() {
        let src = "const n = () => <nav><Link to=\"/\">Home</Link><Menu className=\"h-4\" /></nav>;";
        let m = missing(src);
        assert_eq!(m, vec!["Link", "Menu"]);
    }

    #[test]
    fn locally_declared_symbols_are_not_missing() {
        let src = "function Menu() { return null; }\nconst App = () => <Menu />;";
        assert!(missing(src).is_empty());
        let src = "const { useState } = React;\nuseState(1);";
        assert!(missing(src).is_empty());
    }

    #[test]
    fn member_calls_and_strings_do_not_count() {
        let src = "React.useState(0);\nconst s = 'useEffect(';\n// useRef()";
        assert!(missing(src).is_empty());
    }

    #[test]
    fn package_names() {
        assert_eq!(package_name("react-dom/client"), Some("react-dom"));
        assert_eq!(package_name("@tanstack/react-query"), Some("@tanstack/react-query"));
        assert_eq!(package_name("@radix-ui/react-dialog/dist"), Some("@radix-ui/react-dialog"));
        assert_eq!(package_name("./App"), None);
        assert_eq!(package_name("@/components/ui/button"), None);
    }

    #[test]
    fn side_effect_imports_are_listed() {
        let imports = parse_imports("import './index.css';\nimport App from './App';\n");
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].module, "./index.css");
        assert!(imports[0].names.is_empty());
        assert_eq!(imports[1].names, vec!["App"]);
    }

    #[test]
    fn namespace_and_type_only_imports_are_flagged() {
        let imports = parse_imports(
            "import * as React from 'react';\nimport type { FC } from 'react';\nimport { useState } from 'react';\n",
        );
        assert!(imports[0].namespace && !imports[0].accepts_value_names());
        assert!(imports[1].type_only && !imports[1].accepts_value_names());
        assert_eq!(imports[1].names, vec!["FC"]);
        assert!(imports[2].accepts_value_names());
    }
}
