//! [`GraphSink`] backed by a [`MemoryDb`]

use crate::db::{MemoryDb, StoreKey};
use async_trait::async_trait;
use dswarm_core::{GraphModel, GraphSink, StorageResult};
use std::sync::Arc;
use tracing::debug;

/// Puts every statement of a model into one table
///
/// A model is written under a single lock, so readers never see part of it.
/// The table holds one object per (subject, predicate). For repeated
/// predicates on a subject, the last statement written wins.
#[derive(Debug, Clone)]
pub struct MemoryDbSink {
    db: Arc<MemoryDb>,
    key: StoreKey,
}

impl MemoryDbSink {
    pub fn new(db: Arc<MemoryDb>, resource: impl Into<String>, configuration: impl Into<String>) -> Self {
        Self {
            db,
            key: StoreKey::new(resource, configuration),
        }
    }

    pub fn db(&self) -> &Arc<MemoryDb> {
        &self.db
    }

    pub fn key(&self) -> &StoreKey {
        &self.key
    }
}

#[async_trait]
impl GraphSink for MemoryDbSink {
    async fn write(&self, model: &GraphModel) -> StorageResult<()> {
        let cells = model
            .statements()
            .map(|s| (s.subject(), s.predicate(), s.object().value()));
        let written = self
            .db
            .put_all(&self.key.resource, &self.key.configuration, cells);
        debug!(
            key = %self.key,
            statements = model.len(),
            created = written.is_created(),
            "stored graph model"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memorydb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dswarm_core::{Node, Statement};

    #[tokio::test]
    async fn test_write_puts_every_statement() {
        let db = Arc::new(MemoryDb::new());
        let sink = MemoryDbSink::new(Arc::clone(&db), "resource-1", "config-1");

        let mut model = GraphModel::new();
        model.add_statement(
            "http://r/1",
            Statement::try_new("http://r/1", "http://s#title", Node::literal("Faust")).unwrap(),
        );
        model.add_statement(
            "http://r/1",
            Statement::try_new("http://r/1", "http://s#type", Node::resource("http://c/Book")).unwrap(),
        );

        sink.write(&model).await.unwrap();

        let table = db.get("resource-1", "config-1");
        assert_eq!(table["http://r/1"]["http://s#title"], "Faust");
        assert_eq!(table["http://r/1"]["http://s#type"], "http://c/Book");
        assert_eq!(db.schema("resource-1", "config-1").len(), 2);
    }
}
