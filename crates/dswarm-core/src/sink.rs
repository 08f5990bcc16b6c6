//! Graph sink capability

use crate::error::StorageResult;
use crate::graph::GraphModel;
use async_trait::async_trait;
use tracing::debug;

/// Destination for the graph model of a finished task
///
/// Treated as a non-transactional append target. A failed write is handed
/// back to the task's caller as-is; nothing in the pipeline retries or rolls
/// back.
#[async_trait]
pub trait GraphSink: Send + Sync {
    /// Persist the whole model of one task
    async fn write(&self, model: &GraphModel) -> StorageResult<()>;

    /// Sink name for logging and metrics
    fn name(&self) -> &'static str;
}

/// Sink that accepts and drops every model
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

#[async_trait]
impl GraphSink for DiscardSink {
    async fn write(&self, model: &GraphModel) -> StorageResult<()> {
        debug!(statements = model.len(), "discarding graph model");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discard"
    }
}
