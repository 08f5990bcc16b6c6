//! Shared fixtures for decoder tests

use dswarm_core::{EventRecorder, StreamEvent};

/// Two Dublin Core records in an OAI-PMH ListRecords response
pub const TWO_RECORDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <ListRecords>
    <record>
      <header>
        <identifier>oai:example.org:1</identifier>
        <datestamp>2014-04-01</datestamp>
      </header>
      <metadata>
        <oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/"
                   xmlns:dc="http://purl.org/dc/elements/1.1/">
          <dc:title>Faust</dc:title>
          <dc:creator>Goethe, Johann Wolfgang von</dc:creator>
          <dc:language>ger</dc:language>
        </oai_dc:dc>
      </metadata>
    </record>
    <record>
      <header>
        <identifier>oai:example.org:2</identifier>
        <datestamp>2014-04-02</datestamp>
      </header>
      <metadata>
        <oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/"
                   xmlns:dc="http://purl.org/dc/elements/1.1/">
          <dc:title>Woyzeck</dc:title>
        </oai_dc:dc>
      </metadata>
    </record>
  </ListRecords>
</OAI-PMH>
"#;

/// A record whose metadata section is missing
pub const HEADER_ONLY: &str = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <ListRecords>
    <record><header><identifier>oai:example.org:3</identifier></header></record>
  </ListRecords>
</OAI-PMH>"#;

/// Entity names opened directly inside each record, in order
pub fn top_level_scopes(recorder: &EventRecorder) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut depth = 0usize;
    for event in recorder.events() {
        match event {
            StreamEvent::StartRecord(_) => records.push(Vec::new()),
            StreamEvent::StartEntity(name) => {
                if depth == 0 {
                    if let Some(current) = records.last_mut() {
                        current.push(name.clone());
                    }
                }
                depth += 1;
            }
            StreamEvent::EndEntity => depth -= 1,
            _ => {}
        }
    }
    records
}

/// `(name, value)` of every literal, in stream order
pub fn literals(recorder: &EventRecorder) -> Vec<(String, String)> {
    recorder
        .events()
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Literal { name, value } => Some((name.clone(), value.clone())),
            _ => None,
        })
        .collect()
}
