use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used in the string form of an attribute path
pub const ATTRIBUTE_DELIMITER: char = '\u{1E}';

/// Ordered sequence of attribute (predicate) URIs from a record down to a value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributePath(Vec<String>);

impl AttributePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attribute: impl Into<String>) {
        self.0.push(attribute.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    /// A new path extended by one attribute
    pub fn child(&self, attribute: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push(attribute);
        path
    }

    pub fn attributes(&self) -> &[String] {
        &self.0
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the delimiter-joined string form
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::new();
        }
        s.split(ATTRIBUTE_DELIMITER).collect()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attribute) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{ATTRIBUTE_DELIMITER}")?;
            }
            f.write_str(attribute)?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for AttributePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
