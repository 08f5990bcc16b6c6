//! OAI-PMH envelope decoder
//!
//! ```text
//! <record>
//!   <header><identifier>urn:1</identifier>…</header>
//!   <metadata><oai_dc:dc><dc:title>…</dc:title>…</oai_dc:dc></metadata>
//! </record>
//! ```
//!
//! becomes
//!
//! ```text
//! start_record("urn:1")
//!   start_entity("header") literal("identifier", "urn:1") … end_entity
//!   start_entity("metadata") start_entity("oai_dc:dc") literal("dc:title", …) … end_entity end_entity
//! end_record
//! ```
//!
//! Element names keep their document prefix and literal values keep their raw
//! text, whitespace included.

use crate::Decoder;
use dswarm_core::{DecodeError, PipelineResult, StreamReceiver};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use tracing::debug;

const FORMAT: &str = "oai";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OaiOptions {
    /// Qualified name of the record elements
    pub record_tag: String,
    /// Entity wrapping all sections of a record, if any
    pub record_entity: Option<String>,
    /// Dot-delimited section paths below each record, emitted in this order
    pub sections: Vec<String>,
    /// Fail when a section is absent instead of skipping it
    pub require_sections: bool,
}

impl Default for OaiOptions {
    fn default() -> Self {
        Self {
            record_tag: "record".to_string(),
            record_entity: None,
            sections: vec!["header".to_string(), "metadata.oai_dc:dc".to_string()],
            require_sections: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OaiDecoder {
    options: OaiOptions,
}

impl OaiDecoder {
    pub fn new(options: OaiOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &OaiOptions {
        &self.options
    }

    fn decode_record(
        &self,
        ordinal: usize,
        record: Node<'_, '_>,
        receiver: &mut dyn StreamReceiver,
    ) -> PipelineResult<()> {
        let mut sections = Vec::with_capacity(self.options.sections.len());
        for path in &self.options.sections {
            match find_section(record, path) {
                Some(node) => sections.push((path, node)),
                None if self.options.require_sections => {
                    return Err(DecodeError::missing_section(ordinal, path.as_str()).into())
                }
                None => debug!(record = ordinal, section = %path, "section absent, skipped"),
            }
        }

        let id = record_identifier(record).unwrap_or_else(|| ordinal.to_string());
        receiver.start_record(&id)?;
        if let Some(entity) = &self.options.record_entity {
            receiver.start_entity(entity)?;
        }

        for (path, node) in sections {
            let segments: Vec<&str> = path.split('.').collect();
            for segment in &segments {
                receiver.start_entity(segment)?;
            }
            for child in node.children().filter(Node::is_element) {
                receiver.literal(&qualified_name(child), &text_content(child))?;
            }
            for _ in &segments {
                receiver.end_entity()?;
            }
        }

        if self.options.record_entity.is_some() {
            receiver.end_entity()?;
        }
        receiver.end_record()?;
        Ok(())
    }
}

impl Decoder for OaiDecoder {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn can_handle(&self, input: &str) -> bool {
        let head = input.trim_start();
        head.starts_with('<') && head.contains(&format!("<{}", self.options.record_tag))
    }

    fn decode(&self, input: &str, receiver: &mut dyn StreamReceiver) -> PipelineResult<usize> {
        let doc = Document::parse(input).map_err(|e| DecodeError::malformed(FORMAT, e))?;

        let records = doc
            .descendants()
            .filter(|n| n.is_element() && qualified_name(*n) == self.options.record_tag);

        let mut count = 0;
        for record in records {
            count += 1;
            self.decode_record(count, record, receiver)?;
        }

        debug!(records = count, "decoded OAI document");
        Ok(count)
    }

    fn priority(&self) -> u8 {
        60
    }
}

/// `prefix:local` as written in the document, or the bare local name
fn qualified_name(node: Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace().and_then(|ns| node.lookup_prefix(ns)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", tag.name()),
        _ => tag.name().to_string(),
    }
}

fn find_section<'a, 'input>(record: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    path.split('.').try_fold(record, |node, segment| {
        node.children()
            .find(|c| c.is_element() && qualified_name(*c) == segment)
    })
}

/// Concatenated text of all descendants
fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

fn record_identifier(record: Node<'_, '_>) -> Option<String> {
    let header = record
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == "header")?;
    let identifier = header
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == "identifier")?;
    let id = text_content(identifier);
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dswarm_core::{EventRecorder, PipelineError, StreamEvent};

    const NS: &str = r#"xmlns="http://www.openarchives.org/OAI/2.0/" xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/" xmlns:dc="http://purl.org/dc/elements/1.1/""#;

    fn decode(decoder: &OaiDecoder, xml: &str) -> PipelineResult<Vec<StreamEvent>> {
        let mut recorder = EventRecorder::new();
        decoder.decode(xml, &mut recorder)?;
        Ok(recorder.into_events())
    }

    #[test]
    fn test_prefixes_and_raw_text_are_kept() {
        let xml = format!(
            "<OAI-PMH {NS}><ListRecords><record>\
             <header><identifier> urn:nbn:de:1\n</identifier></header>\
             <metadata><oai_dc:dc><dc:title>Autoren \n</dc:title><!-- note --></oai_dc:dc></metadata>\
             </record></ListRecords></OAI-PMH>"
        );

        let events = decode(&OaiDecoder::default(), &xml).unwrap();
        assert_eq!(events[0], StreamEvent::StartRecord("urn:nbn:de:1".into()));
        assert!(events.contains(&StreamEvent::literal("identifier", " urn:nbn:de:1\n")));
        assert!(events.contains(&StreamEvent::literal("dc:title", "Autoren \n")));
        assert!(events.contains(&StreamEvent::StartEntity("oai_dc:dc".into())));
        assert_eq!(events.iter().filter(|e| e.kind() == "literal").count(), 2);
    }

    #[test]
    fn test_record_without_identifier_uses_ordinal() {
        let xml = format!(
            r#"<OAI-PMH {NS}><record><header/><metadata><oai_dc:dc/></metadata></record></OAI-PMH>"#
        );
        let events = decode(&OaiDecoder::default(), &xml).unwrap();
        assert_eq!(events[0], StreamEvent::StartRecord("1".into()));
    }

    #[test]
    fn test_missing_section_is_an_error() {
        let xml = format!(r#"<OAI-PMH {NS}><record><header/></record></OAI-PMH>"#);
        let err = decode(&OaiDecoder::default(), &xml).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Decode(DecodeError::MissingSection { record: 1, ref section })
                if section == "metadata.oai_dc:dc"
        ));
    }

    #[test]
    fn test_missing_section_can_be_skipped() {
        let decoder = OaiDecoder::new(OaiOptions {
            require_sections: false,
            record_entity: Some("record".into()),
            ..Default::default()
        });
        let xml = format!(r#"<OAI-PMH {NS}><record><header/></record></OAI-PMH>"#);

        let events = decode(&decoder, &xml).unwrap();
        assert_eq!(
            events,
            vec![
                StreamEvent::StartRecord("1".into()),
                StreamEvent::StartEntity("record".into()),
                StreamEvent::StartEntity("header".into()),
                StreamEvent::EndEntity,
                StreamEvent::EndEntity,
                StreamEvent::EndRecord,
            ]
        );
    }

    #[test]
    fn test_malformed_xml() {
        let err = decode(&OaiDecoder::default(), "<record><header></record>").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(DecodeError::Malformed { format: "oai", .. })));
    }
}
