//! Tokenizer-lite scanner for delimiter balance.
//!
//! An explicit state machine (code, line comment, block comment, quoted
//! string, template literal, regex literal) classifies every character so
//! that delimiters inside comments, strings and patterns are never counted. Template interpolations
//! keep a stack of brace depths: the `{` of `${` is counted as an opener and
//! the `}` that ends the interpolation is counted generically as a closer,
//! which keeps `${a}` neutral and handles nested templates.

/// How a file is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// JS/TS/JSX: `//` comments, quotes, template literals.
    Script,
    /// CSS-like: block comments and quotes only.
    Style,
}

const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];
const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "less"];

impl ScanMode {
    /// Mode for a workspace path, `None` for files the validator does not scan.
    pub fn for_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        if SCRIPT_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Script)
        } else if STYLE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Style)
        } else {
            None
        }
    }

    /// Mode for a fenced block's language tag.
    pub fn for_language(language: &str) -> Self {
        if STYLE_EXTENSIONS.contains(&language.to_ascii_lowercase().as_str()) {
            Self::Style
        } else {
            Self::Script
        }
    }
}

/// What a character belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Code,
    Comment,
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Str(char),
    Template,
    /// Regex literal body; the flag is set inside a `[...]` class.
    Regex(bool),
}

/// A construct still open at end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unterminated {
    BlockComment,
    Template,
}

impl std::fmt::Display for Unterminated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlockComment => f.write_str("block comment"),
            Self::Template => f.write_str("template literal"),
        }
    }
}

/// Walk `source`, calling `visit(byte_index, char, region)` for every char.
/// Returns the construct left open at the end, if any.
pub fn scan(source: &str, mode: ScanMode, mut visit: impl FnMut(usize, char, Region)) -> Option<Unterminated> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut state = State::Code;
    let mut interpolations: Vec<usize> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (at, c) = chars[i];
        let next = chars.get(i + 1).copied();
        let next_char = next.map(|(_, n)| n);

        match state {
            State::Code => match c {
                '/' if next_char == Some('/') && mode == ScanMode::Script => {
                    state = State::LineComment;
                    visit(at, c, Region::Comment);
                }
                '/' if next_char == Some('*') => {
                    state = State::BlockComment;
                    visit(at, c, Region::Comment);
                    if let Some((n_at, n)) = next {
                        visit(n_at, n, Region::Comment);
                    }
                    i += 2;
                    continue;
                }
                '/' if mode == ScanMode::Script && starts_regex(&chars, i) => {
                    state = State::Regex(false);
                    visit(at, c, Region::Literal);
                }
                '"' => {
                    state = State::Str(c);
                    visit(at, c, Region::Literal);
                }
                // An apostrophe inside a word is JSX text, not a string.
                '\'' if mode == ScanMode::Style || !preceded_by_word(&chars, i) => {
                    state = State::Str(c);
                    visit(at, c, Region::Literal);
                }
                '`' if mode == ScanMode::Script => {
                    state = State::Template;
                    visit(at, c, Region::Literal);
                }
                '{' => {
                    if let Some(depth) = interpolations.last_mut() {
                        *depth += 1;
                    }
                    visit(at, c, Region::Code);
                }
                '}' => {
                    match interpolations.last_mut() {
                        Some(0) => {
                            interpolations.pop();
                            state = State::Template;
                        }
                        Some(depth) => *depth -= 1,
                        None => {}
                    }
                    visit(at, c, Region::Code);
                }
                _ => visit(at, c, Region::Code),
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                    visit(at, c, Region::Code);
                } else {
                    visit(at, c, Region::Comment);
                }
            }
            State::BlockComment => {
                visit(at, c, Region::Comment);
                if c == '*' && next_char == Some('/') {
                    if let Some((n_at, n)) = next {
                        visit(n_at, n, Region::Comment);
                    }
                    state = State::Code;
                    i += 2;
                    continue;
                }
            }
            State::Str(quote) => {
                if c == '\\' {
                    visit(at, c, Region::Literal);
                    if let Some((n_at, n)) = next {
                        visit(n_at, n, Region::Literal);
                    }
                    i += 2;
                    continue;
                }
                if c == '\n' {
                    // Quoted strings never span lines; recover at the newline.
                    state = State::Code;
                    visit(at, c, Region::Code);
                } else {
                    if c == quote {
                        state = State::Code;
                    }
                    visit(at, c, Region::Literal);
                }
            }
            State::Template => {
                if c == '\\' {
                    visit(at, c, Region::Literal);
                    if let Some((n_at, n)) = next {
                        visit(n_at, n, Region::Literal);
                    }
                    i += 2;
                    continue;
                }
                if c == '$' && next_char == Some('{') {
                    visit(at, c, Region::Literal);
                    if let Some((n_at, n)) = next {
                        visit(n_at, n, Region::Code);
                    }
                    interpolations.push(0);
                    state = State::Code;
                    i += 2;
                    continue;
                }
                if c == '`' {
                    state = State::Code;
                }
                visit(at, c, Region::Literal);
            }
            State::Regex(in_class) => {
                if c == '\\' {
                    visit(at, c, Region::Literal);
                    if let Some((n_at, n)) = next {
                        visit(n_at, n, Region::Literal);
                    }
                    i += 2;
                    continue;
                }
                match c {
                    '\n' => {
                        state = State::Code;
                        visit(at, c, Region::Code);
                    }
                    '[' => {
                        state = State::Regex(true);
                        visit(at, c, Region::Literal);
                    }
                    ']' => {
                        state = State::Regex(false);
                        visit(at, c, Region::Literal);
                    }
                    '/' if !in_class => {
                        state = State::Code;
                        visit(at, c, Region::Literal);
                    }
                    _ => visit(at, c, Region::Literal),
                }
            }
        }
        i += 1;
    }

    match state {
        State::BlockComment => Some(Unterminated::BlockComment),
        State::Template => Some(Unterminated::Template),
        State::Code | State::LineComment | State::Str(_) | State::Regex(_) => {
            // Still inside an interpolation means the template never closed.
            (!interpolations.is_empty()).then_some(Unterminated::Template)
        }
    }
}

/// Keywords after which `/` opens a pattern rather than dividing.
const REGEX_KEYWORDS: &[&str] = &["return", "typeof", "case", "yield", "await", "in", "of"];

/// Whether the `/` at `i` opens a regex literal: it must sit where an
/// operand is expected and close on the same line. `</` and `/>` stay JSX.
fn starts_regex(chars: &[(usize, char)], i: usize) -> bool {
    match chars.get(i + 1).map(|&(_, n)| n) {
        None => return false,
        Some(n) if n.is_whitespace() || matches!(n, '/' | '*' | '>') => return false,
        Some(_) => {}
    }

    let mut j = i;
    while j > 0 && matches!(chars[j - 1].1, ' ' | '\t') {
        j -= 1;
    }
    let operand_expected = match j.checked_sub(1).map(|p| chars[p].1) {
        None | Some('\n') | Some('\r') => true,
        Some(p) if "(,=:[!&|?{;+-*%~^".contains(p) => true,
        Some(p) if is_ident_char(p) => {
            let end = j;
            while j > 0 && is_ident_char(chars[j - 1].1) {
                j -= 1;
            }
            let word: String = chars[j..end].iter().map(|&(_, c)| c).collect();
            REGEX_KEYWORDS.contains(&word.as_str())
        }
        Some(_) => false,
    };
    operand_expected && regex_closes_on_line(chars, i + 1)
}

fn regex_closes_on_line(chars: &[(usize, char)], from: usize) -> bool {
    let mut in_class = false;
    let mut k = from;
    while let Some(&(_, c)) = chars.get(k) {
        match c {
            '\n' => return false,
            '\\' => k += 1,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return true,
            _ => {}
        }
        k += 1;
    }
    false
}

fn preceded_by_word(chars: &[(usize, char)], i: usize) -> bool {
    i > 0 && chars[i - 1].1.is_alphanumeric()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelimiterCounts {
    pub open: usize,
    pub close: usize,
}

impl DelimiterCounts {
    pub fn is_balanced(&self) -> bool {
        self.open == self.close
    }
}

/// Delimiter and JSX tag counts for one source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceReport {
    pub braces: DelimiterCounts,
    pub parens: DelimiterCounts,
    pub brackets: DelimiterCounts,
    pub jsx_open: usize,
    pub jsx_close: usize,
    /// Openers without a matching closer, outermost first.
    pub unclosed: Vec<char>,
    pub unterminated: Option<Unterminated>,
}

impl BalanceReport {
    pub fn is_balanced(&self) -> bool {
        self.braces.is_balanced()
            && self.parens.is_balanced()
            && self.brackets.is_balanced()
            && self.unterminated.is_none()
    }

    pub fn jsx_balanced(&self) -> bool {
        self.jsx_open == self.jsx_close
    }

    /// Closers for `unclosed`, innermost first.
    pub fn closing_suffix(&self) -> Vec<char> {
        self.unclosed.iter().rev().map(|&c| closer_for(c)).collect()
    }
}

fn closer_for(open: char) -> char {
    match open {
        '{' => '}',
        '(' => ')',
        _ => ']',
    }
}

fn opener_for(close: char) -> char {
    match close {
        '}' => '{',
        ')' => '(',
        _ => '[',
    }
}

/// Count delimiters and JSX tags outside comments and strings.
pub fn balance(source: &str, mode: ScanMode) -> BalanceReport {
    let mut report = BalanceReport::default();
    let mut code: Vec<char> = Vec::new();

    let unterminated = scan(source, mode, |_, c, region| {
        if region != Region::Code {
            // Keep positions for JSX lookbehind without exposing literal text.
            code.push(' ');
            return;
        }
        code.push(c);
        match c {
            '{' => report.braces.open += 1,
            '}' => report.braces.close += 1,
            '(' => report.parens.open += 1,
            ')' => report.parens.close += 1,
            '[' => report.brackets.open += 1,
            ']' => report.brackets.close += 1,
            _ => return,
        }
        match c {
            '{' | '(' | '[' => report.unclosed.push(c),
            _ => {
                let opener = opener_for(c);
                if report.unclosed.last() == Some(&opener) {
                    report.unclosed.pop();
                } else if let Some(pos) = report.unclosed.iter().rposition(|&o| o == opener) {
                    report.unclosed.remove(pos);
                }
            }
        }
    });
    report.unterminated = unterminated;

    if mode == ScanMode::Script {
        let (open, close) = count_jsx_tags(&code);
        report.jsx_open = open;
        report.jsx_close = close;
    }
    report
}

fn count_jsx_tags(code: &[char]) -> (usize, usize) {
    let (mut open, mut close) = (0, 0);
    let mut i = 0;
    while i < code.len() {
        let c = code[i];
        let next = code.get(i + 1).copied();
        if c == '<' && next == Some('/') {
            close += 1;
            i += 2;
            continue;
        }
        if c == '/' && next == Some('>') {
            close += 1;
            i += 2;
            continue;
        }
        if c == '<' {
            let starts_tag = matches!(next, Some(n) if n.is_alphabetic() || n == '>');
            let after_value = i > 0 && {
                let prev = code[i - 1];
                is_ident_char(prev) || prev == ')' || prev == ']'
            };
            if starts_tag && !after_value {
                open += 1;
            }
        }
        i += 1;
    }
    (open, close)
}

/// `source` with comments and string contents blanked to spaces.
/// Newlines are kept so line numbers still line up.
pub fn code_only(source: &str, mode: ScanMode) -> String {
    let mut out = String::with_capacity(source.len());
    scan(source, mode, |_, c, region| {
        if region == Region::Code || c == '\n' {
            out.push(c);
        } else {
            out.push(' ');
        }
    });
    out
}

/// 1-based line number of byte offset `at`.
pub fn line_of(source: &str, at: usize) -> usize {
    source[..at.min(source.len())].matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(src: &str) -> BalanceReport {
        balance(src, ScanMode::Script)
    }

    #[test]
    fn balanced_component() {
        let report = script("export default function A() {\n  return <div className=\"a\">{x}</div>;\n}\n");
        assert!(report.is_balanced());
        assert!(report.jsx_balanced());
        assert!(report.unclosed.is_empty());
    }

    #[test]
    fn delimiters_in_comments_and_strings_are_ignored() {
        let src = "// {{{\n/* ((( */\nconst s = \"}}}\";\nconst t = '[[';\n";
        let report = script(src);
        assert!(report.is_balanced());
        assert_eq!(report.braces.open, 0);
    }

    #[test]
    fn template_interpolation_is_neutral() {
        let report = script("const s = `a ${b} c ${ {x: 1}.x }`;");
        assert!(report.is_balanced(), "{report:?}");
        assert_eq!(report.braces.open, report.braces.close);
    }

    #[test]
    fn nested_templates() {
        let report = script("const s = `outer ${cond ? `inner ${v}` : '}'} done`;");
        assert!(report.is_balanced(), "{report:?}");
        assert!(report.unterminated.is_none());
    }

    #[test]
    fn unclosed_openers_and_suffix() {
        let report = script("function A(){ return (<div>");
        assert!(!report.is_balanced());
        assert_eq!(report.unclosed, vec!['{', '(']);
        assert_eq!(report.closing_suffix(), vec![')', '}']);
        assert_eq!(report.braces, DelimiterCounts { open: 1, close: 0 });
        assert_eq!(report.parens, DelimiterCounts { open: 2, close: 1 });
    }

    #[test]
    fn unterminated_template_is_reported() {
        let report = script("const s = `never closed {");
        assert_eq!(report.unterminated, Some(Unterminated::Template));
        assert!(!report.is_balanced());
    }

    #[test]
    fn apostrophe_in_jsx_text_is_not_a_string() {
        let report = script("const A = () => (\n  <p>Don't stop {x}</p>\n);\n");
        assert!(report.is_balanced(), "{report:?}");
        assert!(report.jsx_balanced());
    }

    #[test]
    fn generics_and_comparisons_are_not_jsx() {
        let report = script("const [a, setA] = useState<string>('');\nif (a.length < 3) {}\n");
        assert_eq!(report.jsx_open, 0);
        assert_eq!(report.jsx_close, 0);
    }

    #[test]
    fn self_closing_and_fragments() {
        let report = script("return (<>\n<img src={s} />\n<Hero/>\n</>);");
        assert_eq!(report.jsx_open, 3);
        assert_eq!(report.jsx_close, 3);
    }

    #[test]
    fn regex_literals_hide_their_delimiters() {
        let src = "export const re = /\\{/g;\nexport function f(s) { return re.test(s); }\n";
        let report = script(src);
        assert!(report.is_balanced(), "{report:?}");
        assert_eq!(report.braces, DelimiterCounts { open: 1, close: 1 });

        let report = script("const m = s.match(/[/(]+/);\nif (!/^\\}$/.test(t)) { go(); }\n");
        assert!(report.is_balanced(), "{report:?}");
        assert_eq!(report.parens, DelimiterCounts { open: 4, close: 4 });
    }

    #[test]
    fn division_is_not_a_regex() {
        let report = script("const half = total / 2;\nconst r = (a) / (b) / {c: 1}.c;\n");
        assert!(report.is_balanced(), "{report:?}");
        assert_eq!(report.braces, DelimiterCounts { open: 1, close: 1 });
        assert_eq!(report.parens, DelimiterCounts { open: 2, close: 2 });

        let report = script("const A = () => (<p>{a}/{b}</p>);\n");
        assert!(report.is_balanced(), "{report:?}");
        assert_eq!(report.jsx_open, 1);
        assert_eq!(report.jsx_close, 1);
    }

    #[test]
    fn style_mode_has_no_line_comments() {
        let report = balance("a { background: url(http://x.png); }\n", ScanMode::Style);
        assert!(report.is_balanced(), "{report:?}");
    }

    #[test]
    fn code_only_blanks_strings_and_keeps_lines() {
        let out = code_only("import x from 'useState';\n// useEffect()\nfoo();", ScanMode::Script);
        assert!(!out.contains("useState"));
        assert!(!out.contains("useEffect"));
        assert!(out.contains("foo();"));
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn mode_for_path() {
        assert_eq!(ScanMode::for_path("src/App.tsx"), Some(ScanMode::Script));
        assert_eq!(ScanMode::for_path("src/index.css"), Some(ScanMode::Style));
        assert_eq!(ScanMode::for_path("README.md"), None);
        assert_eq!(line_of("a\nb\nc", 2), 2);
    }
}
