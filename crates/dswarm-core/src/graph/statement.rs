use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected statement construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("statement {field} must not be empty")]
pub struct InvalidStatement {
    pub field: &'static str,
}

/// Object position of a statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Node {
    #[serde(rename = "uri")]
    Resource(String),
    Literal(String),
}

impl Node {
    pub fn resource(uri: impl Into<String>) -> Self {
        Self::Resource(uri.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn as_resource(&self) -> Option<&str> {
        match self {
            Self::Resource(uri) => Some(uri),
            Self::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Resource(_) => None,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Resource(v) | Self::Literal(v) => v,
        }
    }
}

#[derive(Deserialize)]
struct RawStatement {
    subject: String,
    predicate: String,
    object: Node,
}

/// A (subject, predicate, object) fact
///
/// Fields are private so that every statement passes through [`Statement::try_new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStatement")]
pub struct Statement {
    subject: String,
    predicate: String,
    object: Node,
}

impl Statement {
    pub fn try_new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: Node,
    ) -> Result<Self, InvalidStatement> {
        let subject = subject.into();
        let predicate = predicate.into();
        if subject.is_empty() {
            return Err(InvalidStatement { field: "subject" });
        }
        if predicate.is_empty() {
            return Err(InvalidStatement { field: "predicate" });
        }
        if matches!(&object, Node::Resource(uri) if uri.is_empty()) {
            return Err(InvalidStatement { field: "object" });
        }
        Ok(Self {
            subject,
            predicate,
            object,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn object(&self) -> &Node {
        &self.object
    }
}

impl TryFrom<RawStatement> for Statement {
    type Error = InvalidStatement;

    fn try_from(raw: RawStatement) -> Result<Self, Self::Error> {
        Self::try_new(raw.subject, raw.predicate, raw.object)
    }
}
