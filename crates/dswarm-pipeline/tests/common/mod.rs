//! Common test utilities for pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use dswarm_core::{GraphModel, GraphSink, StorageError, StorageResult};
use parking_lot::Mutex;

/// Sink that keeps every model it is given
#[derive(Debug, Default)]
pub struct RecordingSink {
    models: Mutex<Vec<GraphModel>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models(&self) -> Vec<GraphModel> {
        self.models.lock().clone()
    }
}

#[async_trait]
impl GraphSink for RecordingSink {
    async fn write(&self, model: &GraphModel) -> StorageResult<()> {
        self.models.lock().push(model.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Sink that rejects every write
#[derive(Debug, Default)]
pub struct RejectingSink;

#[async_trait]
impl GraphSink for RejectingSink {
    async fn write(&self, _model: &GraphModel) -> StorageResult<()> {
        Err(StorageError::rejected("quota exceeded"))
    }

    fn name(&self) -> &'static str {
        "rejecting"
    }
}

pub const TRIM_JOB: &str = r#"{
    "id": "t1",
    "name": "trim title",
    "components": [
        {"id": "S1", "name": "title in", "type": "source", "outputs": ["F1"],
         "payload": {"name": "S1", "parameters": {"path": {"name": "path", "data": "S1path"}}}},
        {"id": "F1", "name": "trim", "type": "fun", "inputs": ["S1"], "outputs": ["T1"],
         "parameters": {}},
        {"id": "T1", "name": "title out", "type": "target", "inputs": ["F1"],
         "parameters": {"path": {"name": "path", "data": "title"}}}
    ]
}"#;

/// Maps Dublin Core title and creator out of an OAI envelope
pub const DC_JOB: &str = r#"{
    "id": "t3",
    "name": "dc titles",
    "components": [
        {"id": "S1", "type": "source", "outputs": ["F1"],
         "parameters": {"path": {"data": "metadata.oai_dc:dc.dc:title"}}},
        {"id": "S2", "type": "source", "outputs": ["T2"],
         "parameters": {"path": {"data": "metadata.oai_dc:dc.dc:creator"}}},
        {"id": "F1", "type": "fun", "inputs": ["S1"], "outputs": ["T1"],
         "parameters": {"function": {"data": "case"}, "to": {"data": "upper"}}},
        {"id": "T1", "type": "target", "inputs": ["F1"], "parameters": {"path": {"data": "title"}}},
        {"id": "T2", "type": "target", "inputs": ["S2"], "parameters": {"path": {"data": "creator"}}}
    ]
}"#;

pub const OAI_RECORDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <ListRecords>
    <record>
      <header><identifier>urn:example:1</identifier><setSpec>deleted</setSpec></header>
      <metadata>
        <oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/"
                   xmlns:dc="http://purl.org/dc/elements/1.1/">
          <dc:title>Faust</dc:title>
          <dc:creator>Goethe</dc:creator>
        </oai_dc:dc>
      </metadata>
    </record>
    <record>
      <header><identifier>urn:example:2</identifier><setSpec>drama</setSpec></header>
      <metadata>
        <oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/"
                   xmlns:dc="http://purl.org/dc/elements/1.1/">
          <dc:title>Woyzeck</dc:title>
          <dc:creator>Büchner</dc:creator>
        </oai_dc:dc>
      </metadata>
    </record>
  </ListRecords>
</OAI-PMH>
"#;
