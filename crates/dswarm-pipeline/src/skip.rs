//! Skip filter
//!
//! Sits between decoder and program and removes input the program must not
//! see. Rules are checked against the flattened literal path
//! (`entity.entity.name`).
//!
//! Record rules need the whole record before they can decide, so when any
//! are configured the filter buffers one record and releases it at
//! `end_record`. Nothing of record n+1 is read before record n is released or
//! dropped.

use dswarm_core::{StreamEvent, StreamReceiver, TransformResult};
use regex::Regex;
use tracing::debug;

/// Drop a record when a literal at a matching path has a matching value
#[derive(Debug, Clone)]
pub struct RecordRule {
    pub path: Regex,
    pub value: Regex,
}

/// What to keep away from the program
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    /// Entity names whose whole subtree is dropped
    pub entities: Vec<String>,
    /// Literal paths to drop
    pub literals: Vec<Regex>,
    pub records: Vec<RecordRule>,
}

impl SkipRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_entity(mut self, name: impl Into<String>) -> Self {
        self.entities.push(name.into());
        self
    }

    pub fn skip_literals(mut self, path: &str) -> Result<Self, regex::Error> {
        self.literals.push(Regex::new(path)?);
        Ok(self)
    }

    pub fn skip_records_where(mut self, path: &str, value: &str) -> Result<Self, regex::Error> {
        self.records.push(RecordRule {
            path: Regex::new(path)?,
            value: Regex::new(value)?,
        });
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.literals.is_empty() && self.records.is_empty()
    }
}

pub struct SkipFilter<R> {
    rules: SkipRules,
    receiver: R,
    path: Vec<String>,
    skip_depth: usize,
    buffer: Vec<StreamEvent>,
    record: Option<String>,
    drop_record: bool,
    dropped: usize,
}

impl<R: StreamReceiver> SkipFilter<R> {
    pub fn new(rules: SkipRules, receiver: R) -> Self {
        Self {
            rules,
            receiver,
            path: Vec::new(),
            skip_depth: 0,
            buffer: Vec::new(),
            record: None,
            drop_record: false,
            dropped: 0,
        }
    }

    /// Number of whole records dropped so far
    pub fn dropped_records(&self) -> usize {
        self.dropped
    }

    pub fn into_inner(self) -> R {
        self.receiver
    }

    fn buffering(&self) -> bool {
        !self.rules.records.is_empty()
    }

    fn forward(&mut self, event: StreamEvent) -> TransformResult<()> {
        if self.buffering() {
            self.buffer.push(event);
            Ok(())
        } else {
            event.replay(&mut self.receiver)
        }
    }
}

impl<R: StreamReceiver> StreamReceiver for SkipFilter<R> {
    fn start_record(&mut self, id: &str) -> TransformResult<()> {
        self.path.clear();
        self.skip_depth = 0;
        self.buffer.clear();
        self.drop_record = false;
        self.record = Some(id.to_string());
        self.forward(StreamEvent::StartRecord(id.to_string()))
    }

    fn end_record(&mut self) -> TransformResult<()> {
        if !self.buffering() {
            return self.receiver.end_record();
        }
        if self.drop_record {
            self.dropped += 1;
            debug!(record = ?self.record, "record dropped by skip filter");
            self.buffer.clear();
            return Ok(());
        }
        for event in std::mem::take(&mut self.buffer) {
            event.replay(&mut self.receiver)?;
        }
        self.receiver.end_record()
    }

    fn start_entity(&mut self, name: &str) -> TransformResult<()> {
        if self.skip_depth > 0 || self.rules.entities.iter().any(|e| e == name) {
            self.skip_depth += 1;
            return Ok(());
        }
        self.path.push(name.to_string());
        self.forward(StreamEvent::StartEntity(name.to_string()))
    }

    fn end_entity(&mut self) -> TransformResult<()> {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return Ok(());
        }
        self.path.pop();
        self.forward(StreamEvent::EndEntity)
    }

    fn literal(&mut self, name: &str, value: &str) -> TransformResult<()> {
        if self.skip_depth > 0 {
            return Ok(());
        }

        let mut path = self.path.join(".");
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(name);

        if self
            .rules
            .records
            .iter()
            .any(|r| r.path.is_match(&path) && r.value.is_match(value))
        {
            self.drop_record = true;
        }
        if self.rules.literals.iter().any(|re| re.is_match(&path)) {
            return Ok(());
        }
        self.forward(StreamEvent::literal(name, value))
    }

    fn close_stream(&mut self) -> TransformResult<()> {
        self.receiver.close_stream()
    }
}
