//! Code generation.
//!
//! One routed call produces every file. Files outside writeable paths are
//! dropped before anything else looks at the reply. New projects fall back to
//! the hand-authored baseline when the call fails or nothing writeable is
//! left; existing projects surface the error instead of overwriting user code
//! with a template.

use tracing::debug;

use genforge_state::{FileOperation, OperationKind};

use crate::config::PipelineSettings;
use crate::domain::{PipelineContext, StageError};
use crate::extract::extract_labeled_files;
use crate::obs;
use crate::provider::ChatMessage;
use crate::router::{RoutedResponse, Router, TaskType};
use crate::stages::defaults::{default_files, Branding};
use crate::validator::scanner::ScanMode;
use crate::workspace::{retain_writeable, WorkspaceClassifier};

pub const STYLE_GUIDE: &str = "You are a senior React engineer generating a Vite + React + TypeScript + Tailwind CSS project.

Output format:
- Return every file as a fenced code block whose header is `language:relative/path`, e.g. ```tsx:src/components/Hero.tsx
- Paths are relative to the project root and always contain a directory (src/..., public/...).
- Write complete files. Never elide code with comments like `// ... rest of the component`.

Structure:
- Pages in src/pages, reusable components in src/components, one default-exported component per file.
- Entry page is src/pages/Index.tsx; routing uses react-router-dom.

Code rules:
- Import every React hook from 'react' and every icon from 'lucide-react'.
- Use className and htmlFor, never class or for.
- Pass functions to event handlers: onClick={() => doThing()}.
- Never make a useEffect callback async; define and call an async function inside it.
- No `any`, no require(), no dangerouslySetInnerHTML, no TODO or placeholder comments.
- Style with Tailwind utility classes; keep layouts responsive.";

/// Files the generation prompt shows the model, each cut to `max_chars` chars.
///
/// Source files (scripts and styles) come first, then everything else, each
/// group in its original order.
pub fn context_files(existing: &[FileOperation], max_files: usize, max_chars: usize) -> Vec<(String, String)> {
    let (source, other): (Vec<&FileOperation>, Vec<&FileOperation>) = existing
        .iter()
        .filter(|f| !f.is_delete())
        .partition(|f| ScanMode::for_path(&f.path).is_some());

    source
        .into_iter()
        .chain(other)
        .take(max_files)
        .map(|f| {
            let content = if f.content.chars().count() > max_chars {
                let mut cut: String = f.content.chars().take(max_chars).collect();
                cut.push_str("\n(truncated)\n");
                cut
            } else {
                f.content.clone()
            };
            (f.path.clone(), content)
        })
        .collect()
}

/// Most recent turns of conversation kept in the generation prompt.
const HISTORY_TURNS: usize = 6;

pub fn build_generation_messages(ctx: &PipelineContext, settings: &PipelineSettings) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(STYLE_GUIDE)];
    let skip = ctx.history.len().saturating_sub(HISTORY_TURNS);
    messages.extend(ctx.history.iter().skip(skip).cloned());

    let mut user = format!("Request: {}\n\n", ctx.prompt);
    if let Some(plan) = &ctx.plan {
        user.push_str("Architecture plan:\n");
        user.push_str(&plan.summary());
        user.push('\n');
    }

    let context = context_files(
        &ctx.existing_files,
        settings.max_context_files,
        settings.max_context_file_chars,
    );
    if context.is_empty() {
        user.push_str("This is a new project: generate every file it needs.\n");
    } else {
        user.push_str("Existing files (return only the files you change or add):\n");
        for (path, content) in context {
            let language = path.rsplit('.').next().unwrap_or("text");
            user.push_str(&format!("\n```{language}:{path}\n{content}```\n"));
        }
    }

    messages.push(ChatMessage::user(user));
    messages
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub files: Vec<FileOperation>,
    pub response: Option<RoutedResponse>,
    pub used_default: bool,
    /// Paths from the reply that were not writeable.
    pub dropped: Vec<String>,
}

fn baseline(
    ctx: &PipelineContext,
    response: Option<RoutedResponse>,
    dropped: Vec<String>,
) -> GenerationOutcome {
    let branding = Branding::resolve(&ctx.prompt, ctx.plan.as_ref());
    GenerationOutcome {
        files: default_files(&branding),
        response,
        used_default: true,
        dropped,
    }
}

/// Paths the workspace already has become updates.
fn mark_updates(files: &mut [FileOperation], existing: &[FileOperation]) {
    for file in files.iter_mut() {
        if existing.iter().any(|e| e.path == file.path) {
            file.operation = OperationKind::Update;
        }
    }
}

pub async fn generate_code(
    router: &Router,
    ctx: &PipelineContext,
    settings: &PipelineSettings,
    classifier: &dyn WorkspaceClassifier,
) -> Result<GenerationOutcome, StageError> {
    let is_new = ctx.is_new_project();
    let messages = build_generation_messages(ctx, settings);

    let response = match router.call_with_fallback(TaskType::Coding, messages).await {
        Ok(response) => response,
        Err(e) if is_new => {
            obs::emit_stage_degraded(&ctx.session_id, "generate", &e);
            return Ok(baseline(ctx, None, Vec::new()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = extract_labeled_files(&response.content);
    let dropped = retain_writeable(&mut files, classifier);
    if files.is_empty() {
        if is_new {
            debug!(
                session_id = %ctx.session_id,
                ?dropped,
                "generation reply carried no writeable files, using baseline"
            );
            return Ok(baseline(ctx, Some(response), dropped));
        }
        return Err(StageError::Generation(format!(
            "{}/{} returned no writeable files",
            response.provider, response.model
        )));
    }

    mark_updates(&mut files, &ctx.existing_files);
    Ok(GenerationOutcome {
        files,
        response: Some(response),
        used_default: false,
        dropped,
    })
}
