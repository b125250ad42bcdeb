//! Task types and the routing table.
//!
//! The table is plain configuration: it is loaded once, then handed to the
//! `Router` by value. Nothing here is mutable at runtime.

use serde::{Deserialize, Serialize};

/// Abstract kind of work a model call performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Intent,
    Planning,
    Coding,
    Repair,
    Validation,
    Conversation,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        Self::Intent,
        Self::Planning,
        Self::Coding,
        Self::Repair,
        Self::Validation,
        Self::Conversation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Planning => "planning",
            Self::Coding => "coding",
            Self::Repair => "repair",
            Self::Validation => "validation",
            Self::Conversation => "conversation",
        }
    }

    pub fn max_tokens(self) -> u32 {
        match self {
            Self::Intent => 500,
            Self::Planning => 2000,
            Self::Coding | Self::Repair => 8000,
            Self::Validation | Self::Conversation => 1000,
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            Self::Intent | Self::Repair => 0.1,
            Self::Planning => 0.3,
            Self::Coding => 0.2,
            Self::Validation => 0.0,
            Self::Conversation => 0.7,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackTarget {
    pub provider: String,
    pub model: String,
}

/// Where one task type goes first, and where it goes next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingEntry {
    pub provider: String,
    pub model: String,
    pub confidence_threshold: f32,
    #[serde(default)]
    pub fallback: Option<FallbackTarget>,
}

impl RoutingEntry {
    fn new(provider: &str, model: &str, threshold: f32, fallback: (&str, &str)) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            confidence_threshold: threshold,
            fallback: Some(FallbackTarget {
                provider: fallback.0.to_string(),
                model: fallback.1.to_string(),
            }),
        }
    }
}

/// One `RoutingEntry` per task type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingTable {
    pub intent: RoutingEntry,
    pub planning: RoutingEntry,
    pub coding: RoutingEntry,
    pub repair: RoutingEntry,
    pub validation: RoutingEntry,
    pub conversation: RoutingEntry,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self {
            intent: RoutingEntry::new("groq", "llama-3.1-8b-instant", 0.6, ("openai", "gpt-4o-mini")),
            planning: RoutingEntry::new("openai", "gpt-4o-mini", 0.6, ("deepseek", "deepseek-chat")),
            coding: RoutingEntry::new("deepseek", "deepseek-chat", 0.6, ("openai", "gpt-4o")),
            repair: RoutingEntry::new("openai", "gpt-4o", 0.6, ("deepseek", "deepseek-chat")),
            validation: RoutingEntry::new(
                "groq",
                "llama-3.3-70b-versatile",
                0.5,
                ("openai", "gpt-4o-mini"),
            ),
            conversation: RoutingEntry::new(
                "groq",
                "llama-3.3-70b-versatile",
                0.3,
                ("openai", "gpt-4o-mini"),
            ),
        }
    }
}

impl RoutingTable {
    pub fn entry(&self, task: TaskType) -> &RoutingEntry {
        match task {
            TaskType::Intent => &self.intent,
            TaskType::Planning => &self.planning,
            TaskType::Coding => &self.coding,
            TaskType::Repair => &self.repair,
            TaskType::Validation => &self.validation,
            TaskType::Conversation => &self.conversation,
        }
    }

    pub fn entry_mut(&mut self, task: TaskType) -> &mut RoutingEntry {
        match task {
            TaskType::Intent => &mut self.intent,
            TaskType::Planning => &mut self.planning,
            TaskType::Coding => &mut self.coding,
            TaskType::Repair => &mut self.repair,
            TaskType::Validation => &mut self.validation,
            TaskType::Conversation => &mut self.conversation,
        }
    }

    /// Every entry must have a threshold in `[0, 1]` and a non-empty target.
    pub fn check(&self) -> Result<(), String> {
        for task in TaskType::ALL {
            let entry = self.entry(task);
            if !(0.0..=1.0).contains(&entry.confidence_threshold) {
                return Err(format!(
                    "routing.{task}: confidence_threshold {} is outside [0, 1]",
                    entry.confidence_threshold
                ));
            }
            if entry.provider.trim().is_empty() || entry.model.trim().is_empty() {
                return Err(format!("routing.{task}: provider and model are required"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_consistent() {
        let table = RoutingTable::default();
        assert!(table.check().is_ok());
        assert_eq!(table.entry(TaskType::Coding).provider, "deepseek");
        assert_eq!(table.entry(TaskType::Conversation).confidence_threshold, 0.3);
    }

    #[test]
    fn task_type_display_is_lowercase() {
        assert_eq!(TaskType::Planning.to_string(), "planning");
        assert_eq!(serde_json::to_string(&TaskType::Repair).unwrap(), "\"repair\"");
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut table = RoutingTable::default();
        table.entry_mut(TaskType::Intent).confidence_threshold = 1.5;
        let err = table.check().unwrap_err();
        assert!(err.contains("routing.intent"));
    }
}
