//! Architecture planning.
//!
//! The planning model returns a JSON plan; whatever it omits (or sends as
//! `null`) is filled from the niche table so every field is populated when
//! the stage returns. Any failure produces `default_plan`.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::domain::PipelineContext;
use crate::extract::parse_json_payload;
use crate::obs;
use crate::provider::ChatMessage;
use crate::router::{RoutedResponse, Router, TaskType};
use crate::stages::assets::{detect_niche, Niche};
use crate::stages::intent::Intent;

/// Treat an explicit `null` the same as a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default, deserialize_with = "null_default", alias = "primaryColor")]
    pub primary_color: String,
    #[serde(default, deserialize_with = "null_default", alias = "accentColor")]
    pub accent_color: String,
    #[serde(default, deserialize_with = "null_default")]
    pub style: String,
    #[serde(default, deserialize_with = "null_default")]
    pub font: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagePlan {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_default")]
    pub route: String,
    #[serde(default, deserialize_with = "null_default")]
    pub purpose: String,
    #[serde(default, deserialize_with = "null_default")]
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentPlan {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_default")]
    pub purpose: String,
    #[serde(default, deserialize_with = "null_default")]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    #[serde(default, deserialize_with = "null_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_default")]
    pub alt: String,
    #[serde(default, deserialize_with = "null_default")]
    pub placement: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitecturePlan {
    #[serde(default, deserialize_with = "null_default", alias = "projectType")]
    pub project_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub theme: Theme,
    #[serde(default, deserialize_with = "null_default")]
    pub pages: Vec<PagePlan>,
    #[serde(default, deserialize_with = "null_default")]
    pub components: Vec<ComponentPlan>,
    #[serde(default, deserialize_with = "null_default")]
    pub routes: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub images: Vec<ImageAsset>,
    #[serde(default, alias = "specialInstructions", skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

impl ArchitecturePlan {
    /// Compact text form embedded in the generation prompt.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Project type: {}\nTheme: primary {}, accent {}, style {}, font {}\n",
            self.project_type,
            self.theme.primary_color,
            self.theme.accent_color,
            self.theme.style,
            self.theme.font
        );
        out.push_str("Pages:\n");
        for page in &self.pages {
            out.push_str(&format!(
                "- {} ({}, route {}): {}; sections: {}\n",
                page.name,
                page.path,
                page.route,
                page.purpose,
                page.sections.join(", ")
            ));
        }
        out.push_str("Components:\n");
        for component in &self.components {
            out.push_str(&format!(
                "- {} ({}): {}; features: {}\n",
                component.name,
                component.path,
                component.purpose,
                component.features.join(", ")
            ));
        }
        if !self.images.is_empty() {
            out.push_str("Images:\n");
            for image in &self.images {
                out.push_str(&format!("- {} ({}) at {}\n", image.url, image.alt, image.placement));
            }
        }
        if let Some(extra) = &self.special_instructions {
            out.push_str(&format!("Special instructions: {extra}\n"));
        }
        out
    }
}

/// `PascalCase` identifier from free text; `fallback` when nothing survives.
fn pascal_case(name: &str, fallback: &str) -> String {
    let out: String = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    match out.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => out,
        _ => fallback.to_string(),
    }
}

fn kebab_case(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

fn niche_images(niche: &Niche) -> Vec<ImageAsset> {
    niche
        .images
        .iter()
        .enumerate()
        .map(|(i, image)| ImageAsset {
            url: image.url.to_string(),
            alt: image.alt.to_string(),
            placement: if i == 0 { "hero" } else { "gallery" }.to_string(),
        })
        .collect()
}

fn default_components() -> Vec<ComponentPlan> {
    [
        ("Navbar", "Top navigation with a mobile menu", &["logo", "links", "mobile toggle"][..]),
        ("Hero", "Full-height intro with headline and call to action", &["background image", "headline", "button"][..]),
        ("Features", "Three highlighted selling points", &["icons", "cards"][..]),
        ("CallToAction", "Closing contact prompt", &["email button"][..]),
        ("Footer", "Copyright and social links", &["social icons"][..]),
    ]
    .into_iter()
    .map(|(name, purpose, features)| ComponentPlan {
        name: name.to_string(),
        path: format!("src/components/{name}.tsx"),
        purpose: purpose.to_string(),
        features: features.iter().map(|f| f.to_string()).collect(),
    })
    .collect()
}

/// Fully deterministic plan derived from the niche of `prompt`.
pub fn default_plan(prompt: &str) -> ArchitecturePlan {
    let niche = detect_niche(prompt);
    ArchitecturePlan {
        project_type: niche.id.to_string(),
        theme: Theme {
            primary_color: niche.primary_color.to_string(),
            accent_color: niche.accent_color.to_string(),
            style: "modern".to_string(),
            font: "Inter".to_string(),
        },
        pages: vec![PagePlan {
            name: "Index".to_string(),
            path: "src/pages/Index.tsx".to_string(),
            route: "/".to_string(),
            purpose: "Landing page".to_string(),
            sections: ["hero", "features", "call to action"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }],
        components: default_components(),
        routes: vec!["/".to_string()],
        images: niche_images(niche),
        special_instructions: None,
    }
}

/// Fill every empty field of `plan` so downstream stages never see gaps.
pub fn normalize(mut plan: ArchitecturePlan, prompt: &str) -> ArchitecturePlan {
    let niche = detect_niche(prompt);

    if plan.project_type.trim().is_empty() {
        plan.project_type = niche.id.to_string();
    }
    let theme = &mut plan.theme;
    for (field, default) in [
        (&mut theme.primary_color, niche.primary_color),
        (&mut theme.accent_color, niche.accent_color),
        (&mut theme.style, "modern"),
        (&mut theme.font, "Inter"),
    ] {
        if field.trim().is_empty() {
            *field = default.to_string();
        }
    }

    if plan.pages.is_empty() {
        plan.pages = default_plan(prompt).pages;
    }
    for (i, page) in plan.pages.iter_mut().enumerate() {
        page.name = pascal_case(&page.name, &format!("Page{}", i + 1));
        if page.path.trim().is_empty() {
            page.path = format!("src/pages/{}.tsx", page.name);
        }
        if page.route.trim().is_empty() {
            page.route = if i == 0 {
                "/".to_string()
            } else {
                format!("/{}", kebab_case(&page.name))
            };
        }
    }

    plan.components.retain(|c| !c.name.trim().is_empty() || !c.path.trim().is_empty());
    if plan.components.is_empty() {
        plan.components = default_components();
    }
    for (i, component) in plan.components.iter_mut().enumerate() {
        component.name = pascal_case(&component.name, &format!("Component{}", i + 1));
        if component.path.trim().is_empty() {
            component.path = format!("src/components/{}.tsx", component.name);
        }
    }

    if plan.routes.is_empty() {
        plan.routes = plan.pages.iter().map(|p| p.route.clone()).collect();
    }
    plan.images.retain(|i| i.url.starts_with("https://"));
    if plan.images.is_empty() {
        plan.images = niche_images(niche);
    }
    plan.special_instructions = plan
        .special_instructions
        .filter(|s| !s.trim().is_empty());
    plan
}

const PLAN_SYSTEM_PROMPT: &str = "You plan React + TypeScript + Tailwind websites. \
Reply with a single JSON object and nothing else, shaped as: \
{\"projectType\": string, \
\"theme\": {\"primaryColor\": hex, \"accentColor\": hex, \"style\": string, \"font\": string}, \
\"pages\": [{\"name\": string, \"path\": \"src/pages/Name.tsx\", \"route\": string, \"purpose\": string, \"sections\": [string]}], \
\"components\": [{\"name\": string, \"path\": \"src/components/Name.tsx\", \"purpose\": string, \"features\": [string]}], \
\"routes\": [string], \
\"images\": [{\"url\": string, \"alt\": string, \"placement\": string}], \
\"specialInstructions\": string or null}";

pub fn plan_messages(prompt: &str, intent: Option<&Intent>) -> Vec<ChatMessage> {
    let niche = detect_niche(prompt);
    let mut user = format!("Request: {prompt}\n");
    if let Some(intent) = intent {
        user.push_str(&format!(
            "Intent: {:?} (confidence {:.2})\n",
            intent.kind, intent.confidence
        ));
        if !intent.entities.is_empty() {
            user.push_str(&format!("Mentioned parts: {}\n", intent.entities.join(", ")));
        }
    }
    user.push_str("Suggested images:\n");
    for image in niche.images {
        user.push_str(&format!("- {} ({})\n", image.url, image.alt));
    }
    vec![ChatMessage::system(PLAN_SYSTEM_PROMPT), ChatMessage::user(user)]
}

#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: ArchitecturePlan,
    pub response: Option<RoutedResponse>,
    pub used_default: bool,
}

pub async fn plan_architecture(router: &Router, ctx: &PipelineContext) -> PlanOutcome {
    let messages = plan_messages(&ctx.prompt, ctx.intent.as_ref());
    match router.call_with_fallback(TaskType::Planning, messages).await {
        Ok(response) => match parse_json_payload::<ArchitecturePlan>(&response.content) {
            Some(plan) => PlanOutcome {
                plan: normalize(plan, &ctx.prompt),
                response: Some(response),
                used_default: false,
            },
            None => {
                debug!(session_id = %ctx.session_id, "plan reply was not a JSON plan");
                PlanOutcome {
                    plan: default_plan(&ctx.prompt),
                    response: Some(response),
                    used_default: true,
                }
            }
        },
        Err(e) => {
            obs::emit_stage_degraded(&ctx.session_id, "plan", &e);
            PlanOutcome {
                plan: default_plan(&ctx.prompt),
                response: None,
                used_default: true,
            }
        }
    }
}
