use serde::{Deserialize, Serialize};

/// Table the MemoryDb sink writes into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryDbConfig {
    pub resource: String,
    pub configuration: String,
}

impl Default for MemoryDbConfig {
    fn default() -> Self {
        Self {
            resource: "resource".to_string(),
            configuration: "configuration".to_string(),
        }
    }
}
