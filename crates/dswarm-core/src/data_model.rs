//! Target data model descriptor

use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes where a run's records and predicates live
///
/// Supplied by the caller; the pipeline only reads it.
pub trait DataModel: Send + Sync + fmt::Debug {
    /// Identifier of the data model, also used as output identifier
    fn id(&self) -> &str;

    /// Prefix for record URIs minted from non-URI record ids
    fn record_base_uri(&self) -> &str;

    /// Prefix for predicate URIs minted from attribute names
    fn schema_base_uri(&self) -> &str;

    /// Class asserted for every record, if the schema defines one
    fn record_class_uri(&self) -> Option<&str>;
}

/// Plain-data [`DataModel`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticDataModel {
    pub id: String,
    pub record_base_uri: String,
    pub schema_base_uri: String,
    pub record_class_uri: Option<String>,
}

impl Default for StaticDataModel {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            record_base_uri: "http://data.dswarm.org/records/".to_string(),
            schema_base_uri: "http://data.dswarm.org/schema#".to_string(),
            record_class_uri: None,
        }
    }
}

impl DataModel for StaticDataModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn record_base_uri(&self) -> &str {
        &self.record_base_uri
    }

    fn schema_base_uri(&self) -> &str {
        &self.schema_base_uri
    }

    fn record_class_uri(&self) -> Option<&str> {
        self.record_class_uri.as_deref()
    }
}
