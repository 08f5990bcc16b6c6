use serde::{Deserialize, Serialize};

/// Target data model: where records and predicates are minted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataModelConfig {
    /// Output identifier
    pub id: String,
    pub record_base_uri: String,
    pub schema_base_uri: String,
    pub record_class_uri: Option<String>,
}

impl Default for DataModelConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            record_base_uri: "http://data.dswarm.org/records/".to_string(),
            schema_base_uri: "http://data.dswarm.org/schema#".to_string(),
            record_class_uri: None,
        }
    }
}
