//! Pipeline configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on tasks running at once
    pub workers: usize,
    /// Class asserted on records when a run observed none; empty disables it
    pub default_record_class: Option<String>,
    pub skip: SkipConfig,
}

/// Input the program must not see
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipConfig {
    /// Entity names dropped with their whole subtree
    pub entities: Vec<String>,
    /// Regexes over flattened literal paths
    pub literals: Vec<String>,
    pub records: Vec<SkipRecordConfig>,
}

/// Drop records where a literal at `path` matches `value` (both regexes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecordConfig {
    pub path: String,
    pub value: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            default_record_class: Some("http://purl.org/ontology/bibo/Document".to_string()),
            skip: SkipConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Configured default class, treating an empty string as unset
    pub fn default_record_class(&self) -> Option<&str> {
        self.default_record_class
            .as_deref()
            .filter(|class| !class.is_empty())
    }
}
