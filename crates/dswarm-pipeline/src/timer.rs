//! Stage timers
//!
//! A [`StreamTimer`] wraps the rest of the chain and measures how long each
//! event takes to travel through it, per event kind. The input timer therefore
//! covers program and encoder, the output timer the encoder alone. On
//! `close_stream` the accumulated stats are published as
//! [`PipelineEvent::Timing`].

use dswarm_core::{EventPublisher, PipelineEvent, StreamReceiver, TimingStats, TransformResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

pub struct StreamTimer<R> {
    stage: String,
    receiver: R,
    publisher: Arc<dyn EventPublisher>,
    stats: BTreeMap<&'static str, TimingStats>,
}

impl<R: StreamReceiver> StreamTimer<R> {
    pub fn new(stage: impl Into<String>, receiver: R, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            stage: stage.into(),
            receiver,
            publisher,
            stats: BTreeMap::new(),
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Stats per event kind, ordered by kind
    pub fn stats(&self) -> &BTreeMap<&'static str, TimingStats> {
        &self.stats
    }

    pub fn into_inner(self) -> R {
        self.receiver
    }

    fn timed(
        &mut self,
        kind: &'static str,
        f: impl FnOnce(&mut R) -> TransformResult<()>,
    ) -> TransformResult<()> {
        let start = Instant::now();
        let result = f(&mut self.receiver);
        self.stats.entry(kind).or_default().record(start.elapsed());
        result
    }
}

impl<R: StreamReceiver> StreamReceiver for StreamTimer<R> {
    fn start_record(&mut self, id: &str) -> TransformResult<()> {
        self.timed("start_record", |r| r.start_record(id))
    }

    fn end_record(&mut self) -> TransformResult<()> {
        self.timed("end_record", |r| r.end_record())
    }

    fn start_entity(&mut self, name: &str) -> TransformResult<()> {
        self.timed("start_entity", |r| r.start_entity(name))
    }

    fn end_entity(&mut self) -> TransformResult<()> {
        self.timed("end_entity", |r| r.end_entity())
    }

    fn literal(&mut self, name: &str, value: &str) -> TransformResult<()> {
        self.timed("literal", |r| r.literal(name, value))
    }

    fn close_stream(&mut self) -> TransformResult<()> {
        self.receiver.close_stream()?;
        for (kind, stats) in &self.stats {
            self.publisher.publish(PipelineEvent::Timing {
                stage: self.stage.clone(),
                kind: kind.to_string(),
                stats: *stats,
            });
        }
        Ok(())
    }
}
