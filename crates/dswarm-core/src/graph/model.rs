use super::path::AttributePath;
use super::statement::{Node, Statement};
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Malformed graph JSON
#[derive(Debug, Error)]
pub enum GraphJsonError {
    #[error("expected an array of records")]
    NotAnArray,

    #[error("item {index} is not a single record URI keyed to a statement array")]
    NotARecord { index: usize },

    #[error("statement {position} of record '{record}' is invalid: {source}")]
    InvalidStatement {
        record: String,
        position: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Statements of one run, grouped by record
///
/// Insertion ordered throughout, so serialization is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphModel {
    records: IndexMap<String, IndexSet<Statement>>,
    record_class_uri: Option<String>,
    attribute_paths: IndexSet<AttributePath>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record, even if it ends up without statements
    pub fn add_record(&mut self, record_uri: impl Into<String>) {
        self.records.entry(record_uri.into()).or_default();
    }

    /// Add a statement to a record; returns false if it was already present
    pub fn add_statement(&mut self, record_uri: &str, statement: Statement) -> bool {
        match self.records.get_mut(record_uri) {
            Some(statements) => statements.insert(statement),
            None => {
                self.records
                    .insert(record_uri.to_string(), IndexSet::from([statement]));
                true
            }
        }
    }

    pub fn add_attribute_path(&mut self, path: AttributePath) {
        self.attribute_paths.insert(path);
    }

    pub fn set_record_class_uri(&mut self, uri: impl Into<String>) {
        self.record_class_uri = Some(uri.into());
    }

    pub fn record_class_uri(&self) -> Option<&str> {
        self.record_class_uri.as_deref()
    }

    pub fn record_uris(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.records.values().flatten()
    }

    pub fn statements_for(&self, record_uri: &str) -> Option<&IndexSet<Statement>> {
        self.records.get(record_uri)
    }

    /// Total number of statements over all records
    pub fn len(&self) -> usize {
        self.records.values().map(IndexSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Distinct attribute paths observed, in first-seen order
    pub fn schema(&self) -> &IndexSet<AttributePath> {
        &self.attribute_paths
    }

    /// Distinct predicates over all statements
    pub fn predicates(&self) -> IndexSet<&str> {
        self.statements().map(Statement::predicate).collect()
    }

    /// Fold another model into this one
    ///
    /// Records keep their first-seen position. The record class is taken
    /// from `other` only when this model has none.
    pub fn merge(&mut self, other: GraphModel) {
        for (record, statements) in other.records {
            self.records.entry(record).or_default().extend(statements);
        }
        self.attribute_paths.extend(other.attribute_paths);
        if self.record_class_uri.is_none() {
            self.record_class_uri = other.record_class_uri;
        }
    }

    /// Identified form: one `{"<record URI>": [statements]}` object per record
    pub fn to_json(&self) -> Value {
        let records = self.records.iter().map(|(record, statements)| {
            let mut object = Map::with_capacity(1);
            object.insert(
                record.clone(),
                Value::Array(statements.iter().map(statement_value).collect()),
            );
            Value::Object(object)
        });
        Value::Array(records.collect())
    }

    /// Raw form: statements only
    pub fn to_raw_json(&self) -> Value {
        Value::Array(self.statements().map(statement_value).collect())
    }

    /// Read the identified form back
    ///
    /// The schema is rebuilt by walking statements from each record.
    pub fn from_json(value: &Value) -> Result<Self, GraphJsonError> {
        let items = value.as_array().ok_or(GraphJsonError::NotAnArray)?;
        let mut model = Self::new();

        for (index, item) in items.iter().enumerate() {
            let (record, statements) = item
                .as_object()
                .filter(|object| object.len() == 1)
                .and_then(|object| object.iter().next())
                .and_then(|(record, statements)| Some((record, statements.as_array()?)))
                .ok_or(GraphJsonError::NotARecord { index })?;

            model.add_record(record.clone());
            for (position, statement) in statements.iter().enumerate() {
                let statement: Statement = serde_json::from_value(statement.clone()).map_err(|source| {
                    GraphJsonError::InvalidStatement {
                        record: record.clone(),
                        position,
                        source,
                    }
                })?;
                model.add_statement(record, statement);
            }
        }

        model.attribute_paths = model.derive_schema();
        Ok(model)
    }

    /// Attribute paths reachable from each record URI
    ///
    /// A statement whose object is the subject of other statements in the same
    /// record is an entity link and is descended into; every other statement
    /// ends a path.
    pub fn derive_schema(&self) -> IndexSet<AttributePath> {
        let mut paths = IndexSet::new();
        for (record, statements) in &self.records {
            let mut visited = HashSet::new();
            collect_paths(record, statements, &AttributePath::new(), &mut visited, &mut paths);
        }
        paths
    }
}

fn collect_paths(
    subject: &str,
    statements: &IndexSet<Statement>,
    prefix: &AttributePath,
    visited: &mut HashSet<String>,
    out: &mut IndexSet<AttributePath>,
) {
    if !visited.insert(subject.to_string()) {
        return;
    }
    for statement in statements.iter().filter(|s| s.subject() == subject) {
        let path = prefix.child(statement.predicate());
        let entity = match statement.object() {
            Node::Resource(uri) if statements.iter().any(|s| s.subject() == uri) => Some(uri),
            _ => None,
        };
        match entity {
            Some(uri) => collect_paths(uri, statements, &path, visited, out),
            None => {
                out.insert(path);
            }
        }
    }
}

fn statement_value(statement: &Statement) -> Value {
    // Statement serialization cannot fail: string fields and a tagged enum
    serde_json::to_value(statement).unwrap_or(Value::Null)
}

/// Strip the record URI keys from graph JSON
///
/// Within an array, every object holding exactly one key mapped to an array
/// is a record and is replaced by that array's items. Anything else is kept.
/// Turns the identified form into the raw form.
pub fn remove_record_id_fields(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().flat_map(record_items).collect()),
        other => other,
    }
}

fn record_items(item: Value) -> Vec<Value> {
    match item {
        Value::Object(object) if object.len() == 1 && object.values().all(Value::is_array) => object
            .into_iter()
            .flat_map(|(_, statements)| match statements {
                Value::Array(statements) => statements,
                _ => Vec::new(),
            })
            .collect(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn stmt(s: &str, p: &str, o: Node) -> Statement {
        Statement::try_new(s, p, o).unwrap()
    }

    fn sample() -> GraphModel {
        let mut model = GraphModel::new();
        model.add_statement("http://r/1", stmt("http://r/1", "p:dc", Node::resource("http://r/1/dc/1")));
        model.add_statement("http://r/1", stmt("http://r/1/dc/1", "p:title", Node::literal("A")));
        model.add_statement("http://r/2", stmt("http://r/2", "p:id", Node::literal("2")));
        model
    }

    #[test]
    fn test_identified_json_is_keyed_by_record_uri() {
        let json = sample().to_json();
        let records = json.as_array().unwrap();
        assert_eq!(records.len(), 2);

        let keys: Vec<Vec<&str>> = records
            .iter()
            .map(|r| r.as_object().unwrap().keys().map(String::as_str).collect())
            .collect();
        assert_eq!(keys, vec![vec!["http://r/1"], vec!["http://r/2"]]);

        assert_eq!(json[0]["http://r/1"].as_array().unwrap().len(), 2);
        assert_eq!(json[0]["http://r/1"][1]["predicate"], "p:title");
        assert_eq!(json[1]["http://r/2"][0]["object"]["value"], "2");
    }

    #[test]
    fn test_record_without_statements_keeps_its_key() {
        let mut model = sample();
        model.add_record("http://r/3");

        let json = model.to_json();
        assert_eq!(json[2], json!({"http://r/3": []}));
        assert_eq!(remove_record_id_fields(json.clone()), model.to_raw_json());
        assert_eq!(GraphModel::from_json(&json).unwrap().record_count(), 3);
    }

    #[test]
    fn test_round_trip_law_on_sample() {
        let model = sample();
        assert_eq!(remove_record_id_fields(model.to_json()), model.to_raw_json());
    }

    #[test]
    fn test_from_json_restores_records_and_schema() {
        let model = sample();
        let restored = GraphModel::from_json(&model.to_json()).unwrap();

        assert_eq!(restored.record_uris().collect::<Vec<_>>(), vec!["http://r/1", "http://r/2"]);
        assert_eq!(restored.len(), 3);
        let schema: Vec<String> = restored.schema().iter().map(|p| p.to_string()).collect();
        assert_eq!(schema, vec!["p:dc\u{1E}p:title", "p:id"]);
    }

    #[test]
    fn test_from_json_requires_record_objects() {
        let err = GraphModel::from_json(&json!([{"subject": "s", "predicate": "p",
            "object": {"type": "literal", "value": "v"}}]))
        .unwrap_err();
        assert!(matches!(err, GraphJsonError::NotARecord { index: 0 }));

        let err = GraphModel::from_json(&json!([{"r": [{"subject": "s"}]}])).unwrap_err();
        assert!(matches!(err, GraphJsonError::InvalidStatement { position: 0, .. }));
    }

    #[test]
    fn test_duplicate_statements_collapse() {
        let mut model = GraphModel::new();
        assert!(model.add_statement("r", stmt("r", "p", Node::literal("v"))));
        assert!(!model.add_statement("r", stmt("r", "p", Node::literal("v"))));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_merge_keeps_first_record_class() {
        let mut left = GraphModel::new();
        left.set_record_class_uri("c:left");
        let mut right = sample();
        right.set_record_class_uri("c:right");

        left.merge(right);
        assert_eq!(left.record_class_uri(), Some("c:left"));
        assert_eq!(left.record_count(), 2);
    }

    proptest! {
        #[test]
        fn prop_round_trip_law(rows in proptest::collection::vec(
            ("[a-c]", "[a-z]{1,6}", "[a-z]{1,6}", any::<bool>(), ".{0,8}"), 0..20)
        ) {
            let mut model = GraphModel::new();
            for (record, subject, predicate, is_uri, value) in rows {
                let object = if is_uri {
                    Node::resource(format!("http://o/{value}"))
                } else {
                    Node::literal(value)
                };
                let record = format!("http://r/{record}");
                model.add_statement(&record, stmt(&subject, &predicate, object));
            }
            prop_assert_eq!(remove_record_id_fields(model.to_json()), model.to_raw_json());
        }
    }
}
