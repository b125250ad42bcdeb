//! Parsing model responses.
//!
//! Generated files arrive as labeled fenced blocks:
//!
//! ````text
//! ```tsx:src/components/Hero.tsx
//! export default function Hero() { ... }
//! ```
//! ````
//!
//! Structured stages (intent, plan) expect a JSON object, fenced or bare.

use genforge_state::{dedupe_by_path, FileOperation};

/// One fenced block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub path: Option<String>,
    pub body: String,
}

/// Every fenced block in `text`, in order. An unterminated final block is kept.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(String, Option<String>, Vec<&str>)> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();
        match current.take() {
            None => {
                if let Some(header) = trimmed.strip_prefix("```") {
                    let (language, path) = parse_header(header.trim());
                    current = Some((language, path, Vec::new()));
                }
            }
            Some((language, path, mut body)) => {
                if trimmed.trim_end() == "```" {
                    blocks.push(CodeBlock {
                        language,
                        path,
                        body: join_body(&body),
                    });
                } else {
                    body.push(line);
                    current = Some((language, path, body));
                }
            }
        }
    }

    if let Some((language, path, body)) = current {
        blocks.push(CodeBlock {
            language,
            path,
            body: join_body(&body),
        });
    }
    blocks
}

fn join_body(lines: &[&str]) -> String {
    let mut body = lines.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    body
}

fn parse_header(header: &str) -> (String, Option<String>) {
    match header.split_once(':') {
        Some((language, path)) => {
            let path = path.trim();
            let path = path.strip_prefix("./").unwrap_or(path);
            let path = (!path.is_empty()).then(|| path.to_string());
            (language.trim().to_lowercase(), path)
        }
        None => (header.to_lowercase(), None),
    }
}

/// Files carried by labeled blocks. Blocks whose path has no `/` are
/// discarded; a later block for the same path replaces an earlier one.
pub fn extract_labeled_files(text: &str) -> Vec<FileOperation> {
    let files = extract_code_blocks(text)
        .into_iter()
        .filter_map(|block| {
            let path = block.path?;
            path.contains('/')
                .then(|| FileOperation::create(path, block.body))
        })
        .collect();
    dedupe_by_path(files)
}

/// The JSON object in `text`: a `json` (or unlabeled) fenced block first,
/// else the slice from the first `{` to the last `}`.
pub fn extract_json_payload(text: &str) -> Option<String> {
    let fenced = extract_code_blocks(text).into_iter().find(|b| {
        (b.language == "json" || b.language.is_empty()) && b.body.trim_start().starts_with('{')
    });
    if let Some(block) = fenced {
        return Some(block.body.trim().to_string());
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].to_string())
}

/// `extract_json_payload` parsed into `T`.
pub fn parse_json_payload<T: serde::de::DeserializeOwned>(text: &str) -> Option<T> {
    let payload = extract_json_payload(text)?;
    serde_json::from_str(&payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_blocks_become_files() {
        let text = "Here you go:\n```tsx:src/App.tsx\nexport default function App() {}\n```\n\
                    ```css:./src/index.css\nbody {}\n```\n";
        let files = extract_labeled_files(text);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "src/App.tsx");
        assert_eq!(files[0].content, "export default function App() {}\n");
        assert_eq!(files[1].path, "src/index.css");
    }

    #[test]
    fn blocks_without_separator_in_path_are_discarded() {
        let text = "```tsx:App.tsx\nx\n```\n```tsx\ny\n```\n";
        assert!(extract_labeled_files(text).is_empty());
    }

    #[test]
    fn later_block_for_same_path_wins() {
        let text = "```ts:src/a.ts\none\n```\n```ts:src/b.ts\nb\n```\n```ts:src/a.ts\ntwo\n```\n";
        let files = extract_labeled_files(text);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "src/a.ts");
        assert_eq!(files[0].content, "two\n");
    }

    #[test]
    fn unterminated_block_is_kept() {
        let blocks = extract_code_blocks("```tsx:src/a.tsx\nconst a = 1;");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "const a = 1;\n");
    }

    #[test]
    fn json_payload_prefers_fenced_block() {
        let text = "Sure {not json}\n```json\n{\"type\": \"create_project\"}\n```";
        assert_eq!(
            extract_json_payload(text).unwrap(),
            "{\"type\": \"create_project\"}"
        );
    }

    #[test]
    fn json_payload_falls_back_to_bare_object() {
        let value: serde_json::Value =
            parse_json_payload("The plan is {\"pages\": [{\"name\": \"Home\"}]} ok").unwrap();
        assert_eq!(value["pages"][0]["name"], "Home");
        assert!(extract_json_payload("no braces here").is_none());
    }
}
