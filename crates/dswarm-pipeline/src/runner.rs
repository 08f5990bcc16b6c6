//! Task runner
//!
//! Drives whole tasks: apply a flow to one input on a blocking worker, then
//! hand the model to the graph sink.
//!
//! ```text
//! TaskRunner
//!   ├─> spawn_blocking(flow.apply(input))   (synchronous chain, one record at a time)
//!   ├─> GraphSink::write(model)             (async, never retried)
//!   └─> EventPublisher                      (started / finished / failed)
//! ```
//!
//! Tasks are independent. [`TaskRunner::run_all`] runs them concurrently with
//! no ordering between them, bounded by [`TaskRunner::with_max_concurrent`]
//! when set.

use crate::flow::TransformationFlow;
use chrono::Utc;
use dswarm_core::{
    EventPublisher, GraphModel, GraphSink, PipelineError, PipelineEvent, PipelineResult,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One input to run through one flow
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub flow: Arc<TransformationFlow>,
    pub input: String,
}

impl Task {
    pub fn new(flow: Arc<TransformationFlow>, input: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            flow,
            input: input.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Result of a successful task
#[derive(Debug, Clone)]
pub struct TaskOutput {
    pub task: String,
    pub model: GraphModel,
    pub elapsed: Duration,
}

impl TaskOutput {
    pub fn records(&self) -> usize {
        self.model.record_count()
    }

    pub fn statements(&self) -> usize {
        self.model.len()
    }
}

pub struct TaskRunner {
    sink: Arc<dyn GraphSink>,
    publisher: Arc<dyn EventPublisher>,
    permits: Option<Arc<Semaphore>>,
}

impl TaskRunner {
    pub fn new(sink: Arc<dyn GraphSink>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            sink,
            publisher,
            permits: None,
        }
    }

    /// Allow at most `workers` tasks to run at once (minimum 1)
    pub fn with_max_concurrent(mut self, workers: usize) -> Self {
        self.permits = Some(Arc::new(Semaphore::new(workers.max(1))));
        self
    }

    /// Run one task to completion
    ///
    /// Any error aborts the task and is returned as-is, including the sink's
    /// `StorageError`.
    pub async fn run(&self, task: Task) -> PipelineResult<TaskOutput> {
        let id = task.id.clone();
        let _permit = match &self.permits {
            Some(permits) => Some(permits.acquire().await.map_err(|e| PipelineError::Worker {
                task: id.clone(),
                message: e.to_string(),
            })?),
            None => None,
        };
        let start = Instant::now();

        info!(task = %id, "Running task");
        self.publisher
            .publish(PipelineEvent::TaskStarted {
                task: id.clone(),
                started_at: Utc::now(),
            });

        match self.execute(task).await {
            Ok(model) => {
                let elapsed = start.elapsed();
                info!(
                    task = %id,
                    records = model.record_count(),
                    statements = model.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Task completed"
                );
                self.publisher.publish(PipelineEvent::TaskFinished {
                    task: id.clone(),
                    records: model.record_count(),
                    statements: model.len(),
                    elapsed_ms: elapsed.as_millis() as u64,
                });
                Ok(TaskOutput {
                    task: id,
                    model,
                    elapsed,
                })
            }
            Err(e) => {
                warn!(task = %id, category = e.category(), error = %e, "Task failed");
                self.publisher.publish(PipelineEvent::TaskFailed {
                    task: id,
                    category: e.category(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Run all tasks concurrently; results come back in task order
    pub async fn run_all(&self, tasks: Vec<Task>) -> Vec<PipelineResult<TaskOutput>> {
        debug!(tasks = tasks.len(), "Running tasks concurrently");
        join_all(tasks.into_iter().map(|task| self.run(task))).await
    }

    async fn execute(&self, task: Task) -> PipelineResult<GraphModel> {
        let Task { id, flow, input } = task;

        let model = tokio::task::spawn_blocking(move || flow.apply(&input))
            .await
            .map_err(|e| PipelineError::Worker {
                task: id.clone(),
                message: e.to_string(),
            })??;

        debug!(task = %id, sink = self.sink.name(), "Writing model");
        self.sink.write(&model).await?;
        Ok(model)
    }
}
