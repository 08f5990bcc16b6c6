//! Graph encoder
//!
//! Last transforming stage of a flow: turns the program's output events into
//! [`Statement`]s of a [`GraphModel`].
//!
//! ```text
//! start_record("1")                  record  <base>1
//! start_entity("dc")                 <base>1  <schema>dc     <base>1/dc/1
//! literal("title", "Faust")          <base>1/dc/1  <schema>title  "Faust"
//! literal("subject.label", "Drama")  <base>1/dc/1  <schema>subject  <base>1/dc/subject/1
//!                                    <base>1/dc/subject/1  <schema>label  "Drama"
//! ```
//!
//! Explicit entities get a fresh node per `start_entity`. Entities implied by a
//! dotted literal name share one node per record and path.
//!
//! A record id seen twice in one run mints the same URIs again, so both
//! records' statements end up under one record. This is logged at `warn`.

use dswarm_core::graph::{is_absolute_uri, is_rdf_type, mint_uri, RDF_TYPE};
use dswarm_core::{
    AttributePath, DataModel, GraphModel, Node, Statement, StreamReceiver, TransformError,
    TransformResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

#[derive(Debug, Clone)]
struct Scope {
    uri: String,
    path: AttributePath,
    /// Entity names from the record root, joined by `/`
    key: String,
}

#[derive(Debug)]
struct RecordState {
    uri: String,
    scopes: Vec<Scope>,
    occurrences: HashMap<String, usize>,
    shared: HashMap<String, String>,
}

impl RecordState {
    fn new(uri: String) -> Self {
        let root = Scope {
            uri: uri.clone(),
            path: AttributePath::new(),
            key: String::new(),
        };
        Self {
            uri,
            scopes: vec![root],
            occurrences: HashMap::new(),
            shared: HashMap::new(),
        }
    }

    fn current(&self) -> &Scope {
        // the root scope is never popped
        &self.scopes[self.scopes.len() - 1]
    }

    fn mint_entity(&mut self, key: &str) -> String {
        let n = self.occurrences.entry(key.to_string()).or_insert(0);
        *n += 1;
        format!("{}/{key}/{n}", self.uri)
    }
}

fn child_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// [`StreamReceiver`] building a [`GraphModel`]
#[derive(Debug)]
pub struct GraphEncoder {
    data_model: Arc<dyn DataModel>,
    model: GraphModel,
    record: Option<RecordState>,
    repeated: usize,
}

impl GraphEncoder {
    pub fn new(data_model: Arc<dyn DataModel>) -> Self {
        Self {
            data_model,
            model: GraphModel::new(),
            record: None,
            repeated: 0,
        }
    }

    /// Records whose id was already encoded in this run
    pub fn repeated_records(&self) -> usize {
        self.repeated
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn into_model(self) -> GraphModel {
        self.model
    }

    fn predicate(&self, name: &str) -> String {
        mint_uri(self.data_model.schema_base_uri(), name)
    }

    fn record_mut(&mut self, event: &'static str) -> TransformResult<&mut RecordState> {
        self.record
            .as_mut()
            .ok_or_else(|| TransformError::unexpected(event, "no record is open"))
    }

    fn add(&mut self, record: &str, subject: &str, predicate: &str, object: Node) -> TransformResult<()> {
        let statement = Statement::try_new(subject, predicate, object)?;
        self.model.add_statement(record, statement);
        Ok(())
    }

    /// Node for the entity at `key`, shared within the record
    fn shared_entity(&mut self, parent: &Scope, name: &str) -> TransformResult<Scope> {
        let key = child_key(&parent.key, name);
        let predicate = self.predicate(name);
        let record = self.record_mut("literal")?;

        if let Some(uri) = record.shared.get(&key) {
            return Ok(Scope {
                uri: uri.clone(),
                path: parent.path.child(predicate),
                key,
            });
        }

        let uri = record.mint_entity(&key);
        record.shared.insert(key.clone(), uri.clone());
        let record_uri = record.uri.clone();
        self.add(&record_uri, &parent.uri, &predicate, Node::resource(uri.clone()))?;
        Ok(Scope {
            uri,
            path: parent.path.child(predicate),
            key,
        })
    }

    fn type_statement(&mut self, subject: &str, path: &AttributePath, class: &str) -> TransformResult<()> {
        let record_uri = self.record_mut("literal")?.uri.clone();
        self.add(&record_uri, subject, RDF_TYPE, Node::resource(class))?;
        self.model.add_attribute_path(path.child(RDF_TYPE));
        if self.model.record_class_uri().is_none() {
            self.model.set_record_class_uri(class);
        }
        Ok(())
    }
}

impl StreamReceiver for GraphEncoder {
    fn start_record(&mut self, id: &str) -> TransformResult<()> {
        if self.record.is_some() {
            return Err(TransformError::unexpected(
                "start_record",
                "previous record was not ended",
            ));
        }

        let uri = mint_uri(self.data_model.record_base_uri(), id);
        trace!(record = %uri, "encoding record");
        if self.model.statements_for(&uri).is_some() {
            self.repeated += 1;
            warn!(record = %uri, "record id repeated, statements are merged into the earlier record");
        }
        self.model.add_record(uri.clone());
        self.record = Some(RecordState::new(uri.clone()));

        if let Some(class) = self.data_model.record_class_uri().map(str::to_string) {
            self.type_statement(&uri, &AttributePath::new(), &class)?;
        }
        Ok(())
    }

    fn end_record(&mut self) -> TransformResult<()> {
        let record = self
            .record
            .take()
            .ok_or_else(|| TransformError::unexpected("end_record", "no record is open"))?;
        if record.scopes.len() > 1 {
            return Err(TransformError::unexpected(
                "end_record",
                format!("{} entities still open", record.scopes.len() - 1),
            ));
        }
        Ok(())
    }

    fn start_entity(&mut self, name: &str) -> TransformResult<()> {
        let predicate = self.predicate(name);
        let record = self.record_mut("start_entity")?;
        let parent = record.current().clone();
        let key = child_key(&parent.key, name);
        let uri = record.mint_entity(&key);
        record.scopes.push(Scope {
            uri: uri.clone(),
            path: parent.path.child(predicate.clone()),
            key,
        });
        let record_uri = record.uri.clone();
        self.add(&record_uri, &parent.uri, &predicate, Node::resource(uri))
    }

    fn end_entity(&mut self) -> TransformResult<()> {
        let record = self.record_mut("end_entity")?;
        if record.scopes.len() == 1 {
            return Err(TransformError::unexpected("end_entity", "no entity is open"));
        }
        record.scopes.pop();
        Ok(())
    }

    fn literal(&mut self, name: &str, value: &str) -> TransformResult<()> {
        let mut scope = self.record_mut("literal")?.current().clone();
        if value.is_empty() {
            return Ok(());
        }

        if is_rdf_type(name) && is_absolute_uri(value) {
            return self.type_statement(&scope.uri, &scope.path, value);
        }

        let attribute = if is_absolute_uri(name) {
            name
        } else {
            let mut segments: Vec<&str> = name.split('.').filter(|s| !s.is_empty()).collect();
            let Some(last) = segments.pop() else {
                return Err(TransformError::unexpected("literal", format!("empty attribute name '{name}'")));
            };
            for segment in segments {
                scope = self.shared_entity(&scope, segment)?;
            }
            last
        };

        let predicate = self.predicate(attribute);
        let record_uri = self.record_mut("literal")?.uri.clone();
        self.add(&record_uri, &scope.uri, &predicate, Node::literal(value))?;
        self.model.add_attribute_path(scope.path.child(predicate));
        Ok(())
    }
}
