//! Configuration.
//!
//! `ForgeConfig` is loaded once at startup (TOML file, environment, or both)
//! and injected into the router, classifier and orchestrator. Nothing reads
//! configuration from globals after that.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, ScorePenalties};
use crate::router::{ConfidenceWeights, RoutingTable};

/// One OpenAI-compatible endpoint.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the key, read at load time.
    #[serde(default)]
    pub api_key_env: Option<String>,
    pub default_model: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Built-in OpenAI-compatible providers picked up from the environment.
struct Preset {
    name: &'static str,
    key_env: &'static str,
    base_url: &'static str,
    model: &'static str,
}

const PRESETS: &[Preset] = &[
    Preset {
        name: "openai",
        key_env: "OPENAI_API_KEY",
        base_url: "https://api.openai.com/v1",
        model: "gpt-4o-mini",
    },
    Preset {
        name: "groq",
        key_env: "GROQ_API_KEY",
        base_url: "https://api.groq.com/openai/v1",
        model: "llama-3.3-70b-versatile",
    },
    Preset {
        name: "deepseek",
        key_env: "DEEPSEEK_API_KEY",
        base_url: "https://api.deepseek.com/v1",
        model: "deepseek-chat",
    },
    Preset {
        name: "openrouter",
        key_env: "OPENROUTER_API_KEY",
        base_url: "https://openrouter.ai/api/v1",
        model: "openai/gpt-4o-mini",
    },
];

/// Pipeline knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub max_repair_attempts: u32,
    /// Existing files included in the generation prompt.
    pub max_context_files: usize,
    /// Each context file is cut to this many chars.
    pub max_context_file_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_repair_attempts: 3,
            max_context_files: 8,
            max_context_file_chars: 6000,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub providers: Vec<ProviderConfig>,
    pub routing: RoutingTable,
    pub pipeline: PipelineSettings,
    pub scoring: ConfidenceWeights,
    pub validator: ScorePenalties,
}

impl ForgeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Providers and overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self {
            providers: env_providers(&lookup),
            ..Self::default()
        };
        apply_env_overrides(&mut config, &lookup)?;
        config.check()?;
        Ok(config)
    }

    /// Load from `path` when given, filling providers from the environment
    /// when the file lists none. Without a path, environment only.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::from_env_with(lookup);
        };
        let mut config = Self::from_file(path)?;
        if config.providers.is_empty() {
            config.providers = env_providers(&lookup);
        }
        for provider in &mut config.providers {
            if provider.api_key.is_none() {
                provider.api_key = provider.api_key_env.as_deref().and_then(&lookup);
            }
        }
        apply_env_overrides(&mut config, &lookup)?;
        config.check()?;
        Ok(config)
    }

    /// Providers usable by the router.
    pub fn configured_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter()
    }

    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    fn check(&self) -> Result<(), ConfigError> {
        self.routing.check().map_err(ConfigError::Invalid)?;
        let mut seen = std::collections::BTreeSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() || provider.base_url.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "every provider needs a name and a base_url".to_string(),
                ));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "provider `{}` is listed twice",
                    provider.name
                )));
            }
        }
        if self.validator.critical < 0.0 || self.validator.warning < 0.0 {
            return Err(ConfigError::Invalid(
                "validator penalties must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_providers(lookup: &impl Fn(&str) -> Option<String>) -> Vec<ProviderConfig> {
    PRESETS
        .iter()
        .filter_map(|preset| {
            let key = lookup(preset.key_env).filter(|k| !k.trim().is_empty())?;
            let upper = preset.name.to_ascii_uppercase();
            Some(ProviderConfig {
                name: preset.name.to_string(),
                base_url: lookup(&format!("GENFORGE_{upper}_BASE_URL"))
                    .unwrap_or_else(|| preset.base_url.to_string()),
                api_key: Some(key),
                api_key_env: Some(preset.key_env.to_string()),
                default_model: lookup(&format!("GENFORGE_{upper}_MODEL"))
                    .unwrap_or_else(|| preset.model.to_string()),
                timeout_secs: None,
            })
        })
        .collect()
}

fn apply_env_overrides(
    config: &mut ForgeConfig,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup("GENFORGE_MAX_REPAIR_ATTEMPTS") {
        config.pipeline.max_repair_attempts = raw.trim().parse().map_err(|_| {
            ConfigError::Invalid(format!("GENFORGE_MAX_REPAIR_ATTEMPTS is not a number: {raw}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn no_keys_means_no_providers() {
        let config = ForgeConfig::from_env_with(env(&[])).unwrap();
        assert!(!config.has_providers());
        assert_eq!(config.pipeline.max_repair_attempts, 3);
    }

    #[test]
    fn keys_enable_presets_with_overrides() {
        let config = ForgeConfig::from_env_with(env(&[
            ("GROQ_API_KEY", "gsk"),
            ("OPENAI_API_KEY", "sk"),
            ("GENFORGE_GROQ_BASE_URL", "http://localhost:9000/v1"),
            ("GENFORGE_MAX_REPAIR_ATTEMPTS", "5"),
        ]))
        .unwrap();
        let names: Vec<_> = config.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["openai", "groq"]);
        assert_eq!(config.providers[1].base_url, "http://localhost:9000/v1");
        assert_eq!(config.pipeline.max_repair_attempts, 5);
    }

    #[test]
    fn bad_repair_attempts_is_invalid() {
        let err = ForgeConfig::from_env_with(env(&[("GENFORGE_MAX_REPAIR_ATTEMPTS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn toml_overrides_routing_and_weights() {
        let config = ForgeConfig::from_toml_str(
            r#"
            [[providers]]
            name = "local"
            base_url = "http://127.0.0.1:8080/v1"
            default_model = "qwen"

            [routing.coding]
            provider = "local"
            model = "qwen-coder"
            confidence_threshold = 0.7

            [pipeline]
            max_repair_attempts = 1

            [scoring]
            baseline = 0.4
            "#,
        )
        .unwrap();
        assert_eq!(config.providers[0].name, "local");
        assert_eq!(config.routing.coding.model, "qwen-coder");
        assert!(config.routing.coding.fallback.is_none());
        assert_eq!(config.routing.intent, RoutingTable::default().intent);
        assert_eq!(config.pipeline.max_repair_attempts, 1);
        assert_eq!(config.pipeline.max_context_files, 8);
        assert_eq!(config.scoring.baseline, 0.4);
        assert_eq!(config.scoring.min_length, 20);
    }

    #[test]
    fn duplicate_provider_names_rejected() {
        let err = ForgeConfig::from_toml_str(
            r#"
            [[providers]]
            name = "a"
            base_url = "http://x"
            default_model = "m"
            [[providers]]
            name = "a"
            base_url = "http://y"
            default_model = "m"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn file_keys_resolve_from_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genforge.toml");
        std::fs::write(
            &path,
            "[[providers]]\nname = \"local\"\nbase_url = \"http://x\"\ndefault_model = \"m\"\napi_key_env = \"LOCAL_KEY\"\n",
        )
        .unwrap();
        let config = ForgeConfig::load_with(Some(&path), env(&[("LOCAL_KEY", "secret")])).unwrap();
        assert_eq!(config.providers[0].api_key.as_deref(), Some("secret"));
        assert!(!format!("{:?}", config.providers[0]).contains("secret"));
    }
}
