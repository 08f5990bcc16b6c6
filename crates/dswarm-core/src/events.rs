//! Pipeline events and publishers
//!
//! Publishing is fire-and-forget: [`EventPublisher::publish`] never blocks and
//! never fails from the pipeline's point of view.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Accumulated timing of one event kind at one stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimingStats {
    pub count: u64,
    pub total: Duration,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
}

impl TimingStats {
    pub fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.min = Some(self.min.map_or(elapsed, |m| m.min(elapsed)));
        self.max = Some(self.max.map_or(elapsed, |m| m.max(elapsed)));
    }

    pub fn mean(&self) -> Option<Duration> {
        u32::try_from(self.count)
            .ok()
            .filter(|&n| n > 0)
            .map(|n| self.total / n)
    }
}

/// Something observable happened while running a task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    TaskStarted {
        task: String,
        started_at: DateTime<Utc>,
    },
    TaskFinished {
        task: String,
        records: usize,
        statements: usize,
        elapsed_ms: u64,
    },
    TaskFailed {
        task: String,
        category: &'static str,
        message: String,
    },
    Timing {
        stage: String,
        kind: String,
        stats: TimingStats,
    },
}

/// Metrics/event collaborator
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: PipelineEvent);
}

/// Publisher that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: PipelineEvent) {}
}

/// Publisher that logs events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::TaskStarted { task, started_at } => {
                info!(%task, %started_at, "task started")
            }
            PipelineEvent::TaskFinished {
                task,
                records,
                statements,
                elapsed_ms,
            } => info!(%task, records, statements, elapsed_ms, "task finished"),
            PipelineEvent::TaskFailed {
                task,
                category,
                message,
            } => warn!(%task, category, %message, "task failed"),
            PipelineEvent::Timing { stage, kind, stats } => debug!(
                %stage,
                %kind,
                count = stats.count,
                total_us = stats.total.as_micros() as u64,
                "stage timing"
            ),
        }
    }
}

/// Publisher backed by a broadcast channel
///
/// Slow subscribers lose the oldest events instead of stalling the pipeline.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: broadcast::Sender<PipelineEvent>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: PipelineEvent) {
        // no subscribers is not an error
        let _ = self.sender.send(event);
    }
}
