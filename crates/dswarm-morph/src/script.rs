//! Morph script document model
//!
//! The in-memory form of a compiled program. [`crate::render`] writes it as
//! Metamorph XML and [`crate::parse`] reads it back; both sides agree on
//! attribute order so a rendered script parses to an equal value.

use dswarm_core::FilterExpression;
use indexmap::IndexMap;

pub const METAMORPH_NAMESPACE: &str = "http://www.culturegraph.org/metamorph";
pub const METAMORPH_VERSION: &str = "1";
pub const ENTITY_MARKER: &str = ".";

/// Prefix of internal variables routed between rules
pub const VARIABLE_PREFIX: char = '@';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MorphScript {
    pub name: String,
    pub vars: IndexMap<String, String>,
    pub rules: Vec<Rule>,
    pub maps: IndexMap<String, LookupTable>,
    pub filters: IndexMap<String, FilterExpression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Data(DataRule),
    Collect(CollectRule),
}

impl Rule {
    /// Output name of the rule
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Data(data) => data.name.as_deref(),
            Self::Collect(collect) => Some(&collect.name),
        }
    }
}

/// Reads one source path, applies functions in order, emits under `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRule {
    pub source: String,
    pub name: Option<String>,
    pub filter: Option<String>,
    pub functions: Vec<FunctionCall>,
}

impl DataRule {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: None,
            filter: None,
            functions: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_function(mut self, function: FunctionCall) -> Self {
        self.functions.push(function);
        self
    }
}

/// Combines values of several data rules within one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectRule {
    pub kind: String,
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub inputs: Vec<DataRule>,
}

/// Function invocation with its attributes in author order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    pub attributes: IndexMap<String, String>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
        }
    }

    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }
}

/// Named table of entries, referenced from function attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    pub name: String,
    pub entries: Vec<MapEntry>,
}

impl LookupTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Value of the first top-level entry named `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == key)
            .and_then(|e| e.value.as_deref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.name == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub name: String,
    pub value: Option<String>,
    pub entries: Vec<MapEntry>,
}

impl MapEntry {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
            entries: Vec::new(),
        }
    }
}

pub fn is_variable(name: &str) -> bool {
    name.starts_with(VARIABLE_PREFIX)
}
