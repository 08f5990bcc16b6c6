//! Decoder configuration
//!
//! Covers all three source formats; each decoder reads only its own fields.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// `oai`, `csv`, `json` or `auto`
    pub format: String,
    pub oai: OaiDecoderConfig,
    pub csv: CsvDecoderConfig,
    pub json: JsonDecoderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OaiDecoderConfig {
    pub record_tag: String,
    pub record_entity: Option<String>,
    pub sections: Vec<String>,
    pub require_sections: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvDecoderConfig {
    /// Single ASCII character
    pub delimiter: char,
    pub has_headers: bool,
    pub id_column: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonDecoderConfig {
    pub id_field: Option<String>,
    pub record_path: Option<String>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            format: "auto".to_string(),
            oai: OaiDecoderConfig::default(),
            csv: CsvDecoderConfig::default(),
            json: JsonDecoderConfig::default(),
        }
    }
}

impl Default for OaiDecoderConfig {
    fn default() -> Self {
        Self {
            record_tag: "record".to_string(),
            record_entity: None,
            sections: vec!["header".to_string(), "metadata.oai_dc:dc".to_string()],
            require_sections: true,
        }
    }
}

impl Default for CsvDecoderConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_headers: true,
            id_column: None,
        }
    }
}
