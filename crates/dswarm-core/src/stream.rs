//! Canonical event stream
//!
//! Every stage between decoder and graph encoder speaks this protocol:
//!
//! ```text
//! start_record(id) → (start_entity(name) | literal(name, value) | end_entity)* → end_record
//! ```
//!
//! Stages are push-based. A call returns only after every downstream stage has
//! handled the event, so a record is fully processed (or the task has failed)
//! before the producer emits the next `start_record`. Implementations may rely
//! on this: at most one record is in flight per chain.

use crate::error::TransformResult;

/// Receiver of canonical structural events
pub trait StreamReceiver {
    fn start_record(&mut self, id: &str) -> TransformResult<()>;

    fn end_record(&mut self) -> TransformResult<()>;

    fn start_entity(&mut self, name: &str) -> TransformResult<()>;

    fn end_entity(&mut self) -> TransformResult<()>;

    fn literal(&mut self, name: &str, value: &str) -> TransformResult<()>;

    /// Called once after the last record
    fn close_stream(&mut self) -> TransformResult<()> {
        Ok(())
    }
}

impl<R: StreamReceiver + ?Sized> StreamReceiver for &mut R {
    fn start_record(&mut self, id: &str) -> TransformResult<()> {
        (**self).start_record(id)
    }

    fn end_record(&mut self) -> TransformResult<()> {
        (**self).end_record()
    }

    fn start_entity(&mut self, name: &str) -> TransformResult<()> {
        (**self).start_entity(name)
    }

    fn end_entity(&mut self) -> TransformResult<()> {
        (**self).end_entity()
    }

    fn literal(&mut self, name: &str, value: &str) -> TransformResult<()> {
        (**self).literal(name, value)
    }

    fn close_stream(&mut self) -> TransformResult<()> {
        (**self).close_stream()
    }
}

impl<R: StreamReceiver + ?Sized> StreamReceiver for Box<R> {
    fn start_record(&mut self, id: &str) -> TransformResult<()> {
        (**self).start_record(id)
    }

    fn end_record(&mut self) -> TransformResult<()> {
        (**self).end_record()
    }

    fn start_entity(&mut self, name: &str) -> TransformResult<()> {
        (**self).start_entity(name)
    }

    fn end_entity(&mut self) -> TransformResult<()> {
        (**self).end_entity()
    }

    fn literal(&mut self, name: &str, value: &str) -> TransformResult<()> {
        (**self).literal(name, value)
    }

    fn close_stream(&mut self) -> TransformResult<()> {
        (**self).close_stream()
    }
}

/// One event of the canonical stream, as data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    StartRecord(String),
    EndRecord,
    StartEntity(String),
    EndEntity,
    Literal { name: String, value: String },
}

impl StreamEvent {
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Literal {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Short event name used in logs and timer keys
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartRecord(_) => "start_record",
            Self::EndRecord => "end_record",
            Self::StartEntity(_) => "start_entity",
            Self::EndEntity => "end_entity",
            Self::Literal { .. } => "literal",
        }
    }

    /// Push this event into `receiver`
    pub fn replay<R: StreamReceiver + ?Sized>(&self, receiver: &mut R) -> TransformResult<()> {
        match self {
            Self::StartRecord(id) => receiver.start_record(id),
            Self::EndRecord => receiver.end_record(),
            Self::StartEntity(name) => receiver.start_entity(name),
            Self::EndEntity => receiver.end_entity(),
            Self::Literal { name, value } => receiver.literal(name, value),
        }
    }
}

/// Receiver that keeps every event it sees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRecorder {
    events: Vec<StreamEvent>,
    closed: bool,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<StreamEvent> {
        self.events
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Replay the recorded events, in order, into `receiver`
    pub fn replay_into<R: StreamReceiver + ?Sized>(&self, receiver: &mut R) -> TransformResult<()> {
        self.events.iter().try_for_each(|e| e.replay(receiver))
    }
}

impl StreamReceiver for EventRecorder {
    fn start_record(&mut self, id: &str) -> TransformResult<()> {
        self.events.push(StreamEvent::StartRecord(id.to_string()));
        Ok(())
    }

    fn end_record(&mut self) -> TransformResult<()> {
        self.events.push(StreamEvent::EndRecord);
        Ok(())
    }

    fn start_entity(&mut self, name: &str) -> TransformResult<()> {
        self.events.push(StreamEvent::StartEntity(name.to_string()));
        Ok(())
    }

    fn end_entity(&mut self) -> TransformResult<()> {
        self.events.push(StreamEvent::EndEntity);
        Ok(())
    }

    fn literal(&mut self, name: &str, value: &str) -> TransformResult<()> {
        self.events.push(StreamEvent::literal(name, value));
        Ok(())
    }

    fn close_stream(&mut self) -> TransformResult<()> {
        self.closed = true;
        Ok(())
    }
}
