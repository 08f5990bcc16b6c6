//! # dswarm config
//!
//! TOML configuration for the pipeline and the `dswarm` binary.
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [decoder]
//! format = "oai"           # oai | csv | json | auto
//!
//! [decoder.oai]
//! sections = ["header", "metadata.oai_dc:dc"]
//!
//! [pipeline]
//! workers = 4
//! default_record_class = "http://purl.org/ontology/bibo/Document"
//!
//! [data_model]
//! record_base_uri = "http://data.dswarm.org/records/"
//!
//! [memorydb]
//! resource = "{env:DSWARM_RESOURCE}"
//! ```
//!
//! Every section and field is optional.

pub mod components;
mod error;
mod loader;

pub use components::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DswarmConfig {
    pub logging: LoggingConfig,
    pub decoder: DecoderConfig,
    pub pipeline: PipelineConfig,
    pub data_model: DataModelConfig,
    pub memorydb: MemoryDbConfig,
}

impl DswarmConfig {
    /// Checks serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.decoder.csv.delimiter.is_ascii() {
            return Err(ConfigError::InvalidValue {
                field: "decoder.csv.delimiter".to_string(),
                message: format!("'{}' is not a single-byte character", self.decoder.csv.delimiter),
            });
        }
        if self.pipeline.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
