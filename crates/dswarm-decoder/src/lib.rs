//! # dswarm decoder
//!
//! Format decoders turning source documents into the canonical event stream:
//!
//! - [`OaiDecoder`]: OAI-PMH style envelopes (`record` → `header` + `metadata.*`)
//! - [`CsvDecoder`]: one record per row, one literal per column
//! - [`JsonDecoder`]: one record per object, nested objects as entities
//!
//! A decoder pushes every event of a record through the receiver before it
//! reads the next record, so a receiver error stops decoding immediately.
//!
//! [`DecoderRegistry`] picks a decoder by name or by sniffing the input.

mod delimited;
mod json;
mod oai;

pub use self::delimited::{CsvDecoder, CsvOptions};
pub use self::json::{JsonDecoder, JsonOptions};
pub use self::oai::{OaiDecoder, OaiOptions};

use dswarm_core::{DecodeError, PipelineResult, StreamReceiver};
use std::sync::Arc;

/// A source format
///
/// Follows the detect-then-parse shape: `can_handle()` must be cheap,
/// `decode()` does the work.
pub trait Decoder: Send + Sync {
    /// Unique name, used for selection by name
    fn name(&self) -> &'static str;

    /// Fast check whether this decoder might understand `input`
    fn can_handle(&self, input: &str) -> bool;

    /// Decode `input` into `receiver`, returning the number of records emitted
    fn decode(&self, input: &str, receiver: &mut dyn StreamReceiver) -> PipelineResult<usize>;

    /// Priority for detection (higher = tried first). Default: 50
    fn priority(&self) -> u8 {
        50
    }
}

/// Registry of decoders sorted by priority, highest first
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    decoders: Vec<Arc<dyn Decoder>>,
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.decoders.iter().map(|d| d.name()))
            .finish()
    }
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// OAI, JSON and CSV decoders with default options
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(OaiDecoder::default()));
        registry.register(Arc::new(JsonDecoder::default()));
        registry.register(Arc::new(CsvDecoder::default()));
        registry
    }

    /// Register a decoder, replacing any decoder of the same name
    pub fn register(&mut self, decoder: Arc<dyn Decoder>) {
        self.decoders.retain(|d| d.name() != decoder.name());
        self.decoders.push(decoder);
        self.decoders
            .sort_by_key(|d| std::cmp::Reverse(d.priority()));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Decoder>> {
        self.decoders.iter().find(|d| d.name() == name).cloned()
    }

    /// First decoder, by priority, that claims `input`
    pub fn detect(&self, input: &str) -> Option<Arc<dyn Decoder>> {
        self.decoders.iter().find(|d| d.can_handle(input)).cloned()
    }

    /// Resolve `name`, where `"auto"` means detection
    pub fn resolve(&self, name: &str, input: &str) -> Result<Arc<dyn Decoder>, DecodeError> {
        let found = if name == "auto" {
            self.detect(input)
        } else {
            self.get(name)
        };
        found.ok_or_else(|| DecodeError::UnsupportedFormat(name.to_string()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("<?xml version=\"1.0\"?><OAI-PMH><record/></OAI-PMH>", "oai")]
    #[test_case("  [{\"a\": 1}]", "json")]
    #[test_case("{\"a\": 1}", "json")]
    #[test_case("id,title\n1,Faust\n", "csv")]
    fn test_detection(input: &str, expected: &str) {
        let registry = DecoderRegistry::with_defaults();
        assert_eq!(registry.detect(input).unwrap().name(), expected);
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            DecoderRegistry::with_defaults().names(),
            vec!["oai", "json", "csv"]
        );
    }

    #[test]
    fn test_unknown_name_is_unsupported() {
        let err = DecoderRegistry::with_defaults()
            .resolve("marc21", "")
            .err()
            .unwrap();
        assert!(matches!(err, DecodeError::UnsupportedFormat(ref f) if f == "marc21"));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = DecoderRegistry::with_defaults();
        registry.register(Arc::new(CsvDecoder::new(CsvOptions {
            delimiter: b';',
            ..Default::default()
        })));
        assert_eq!(registry.names().len(), 3);
    }
}
