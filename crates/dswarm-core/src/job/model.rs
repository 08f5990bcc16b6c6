//! Typed job graph: components, payloads and parameters

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the parameter that binds a SOURCE or TARGET to an attribute path
pub const PATH_PARAMETER: &str = "path";

/// Name of the parameter that selects the function of a FUNCTION or EXTENDED component
pub const FUNCTION_PARAMETER: &str = "function";

/// Name of the SOURCE parameter that keeps only the n-th value per record
pub const ORDINAL_PARAMETER: &str = "ordinal";

/// The closed set of component kinds
///
/// Adding a kind means extending this enum; every `match` on it is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Source,
    Target,
    #[serde(rename = "fun")]
    Function,
    /// Multi-input collector (concat, combine, choose)
    Extended,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
            Self::Function => "fun",
            Self::Extended => "extended",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" => Ok(Self::Source),
            "target" => Ok(Self::Target),
            "fun" | "function" => Ok(Self::Function),
            "extended" => Ok(Self::Extended),
            _ => Err(s.to_string()),
        }
    }
}

/// A named parameter, either a plain value or a repeated block of nested parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,
}

impl Parameter {
    /// A plain value parameter
    pub fn data(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            data: Some(data.into()),
            repeat: false,
            parameters: IndexMap::new(),
        }
    }

    /// A repeated parameter whose nested parameters become table entries
    pub fn repeat(name: impl Into<String>, nested: impl IntoIterator<Item = Parameter>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            data: None,
            repeat: true,
            parameters: nested.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }

    pub fn data_str(&self) -> Option<&str> {
        self.data.as_deref()
    }
}

/// Parameters of one component, in author order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parameters: IndexMap<String, Parameter>,
}

impl Payload {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// The data of a plain parameter, if present
    pub fn data(&self, name: &str) -> Option<&str> {
        self.parameter(name).and_then(Parameter::data_str)
    }

    pub fn insert(&mut self, parameter: Parameter) -> Option<Parameter> {
        self.parameters.insert(parameter.name.clone(), parameter)
    }
}

/// Supported filter expression dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterDialect {
    #[default]
    Regex,
    Boolean,
}

impl FilterDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FilterDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regex" => Ok(Self::Regex),
            "boolean" => Ok(Self::Boolean),
            other => Err(format!("unknown filter dialect '{other}'")),
        }
    }
}

/// A predicate over source values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpression {
    pub expression: String,
    #[serde(rename = "type", default)]
    pub dialect: FilterDialect,
}

impl FilterExpression {
    pub fn regex(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            dialect: FilterDialect::Regex,
        }
    }

    pub fn boolean(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            dialect: FilterDialect::Boolean,
        }
    }
}

/// One node of a transformation graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub payload: Payload,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterExpression>,
}

impl Component {
    pub fn new(id: impl Into<String>, kind: ComponentKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            payload: Payload {
                name: id.clone(),
                parameters: IndexMap::new(),
            },
            id,
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            filter: None,
        }
    }

    /// A SOURCE bound to an input attribute path
    pub fn source(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(id, ComponentKind::Source).with_parameter(Parameter::data(PATH_PARAMETER, path))
    }

    /// A TARGET bound to an output attribute path
    pub fn target(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(id, ComponentKind::Target).with_parameter(Parameter::data(PATH_PARAMETER, path))
    }

    pub fn function(id: impl Into<String>, function: impl Into<String>) -> Self {
        Self::new(id, ComponentKind::Function)
            .with_parameter(Parameter::data(FUNCTION_PARAMETER, function))
    }

    pub fn extended(id: impl Into<String>, collector: impl Into<String>) -> Self {
        Self::new(id, ComponentKind::Extended)
            .with_parameter(Parameter::data(FUNCTION_PARAMETER, collector))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.payload.insert(parameter);
        self
    }

    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Declare an input (the upstream component must list this one as output)
    pub fn reads(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn feeds(mut self, output: impl Into<String>) -> Self {
        self.outputs.push(output.into());
        self
    }

    /// Attribute path a SOURCE reads or a TARGET writes
    pub fn bound_path(&self) -> &str {
        self.payload.data(PATH_PARAMETER).unwrap_or(&self.name)
    }

    /// Function or collector name of a FUNCTION or EXTENDED component
    pub fn function_name(&self) -> &str {
        self.payload.data(FUNCTION_PARAMETER).unwrap_or(&self.name)
    }

    /// Parameters handed to the function, without the selector itself
    pub fn function_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.payload
            .parameters
            .values()
            .filter(|p| p.name != FUNCTION_PARAMETER)
    }
}

/// An ordered set of components forming one mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    pub id: String,
    pub name: String,
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, String>,
}

impl Transformation {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            components: Vec::new(),
            variables: IndexMap::new(),
        }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn sources(&self) -> impl Iterator<Item = &Component> {
        self.of_kind(ComponentKind::Source)
    }

    pub fn targets(&self) -> impl Iterator<Item = &Component> {
        self.of_kind(ComponentKind::Target)
    }

    fn of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.kind == kind)
    }

    /// Run structural validation, returning every issue found
    pub fn validate(&self) -> Result<(), Vec<crate::error::ValidationIssue>> {
        let issues = super::validate::validate(self);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("source", ComponentKind::Source)]
    #[test_case("TARGET", ComponentKind::Target)]
    #[test_case("fun", ComponentKind::Function)]
    #[test_case("function", ComponentKind::Function)]
    #[test_case("Extended", ComponentKind::Extended)]
    fn test_component_kind_parses(input: &str, expected: ComponentKind) {
        assert_eq!(input.parse::<ComponentKind>(), Ok(expected));
    }

    #[test]
    fn test_component_kind_rejects_unknown() {
        assert_eq!("bogus".parse::<ComponentKind>(), Err("bogus".to_string()));
    }

    #[test]
    fn test_bound_path_falls_back_to_name() {
        let with_path = Component::source("S1", "dc.title");
        assert_eq!(with_path.bound_path(), "dc.title");

        let without = Component::new("S2", ComponentKind::Source).with_name("dc.creator");
        assert_eq!(without.bound_path(), "dc.creator");
    }

    #[test]
    fn test_function_parameters_skip_selector() {
        let component = Component::function("F1", "replace")
            .with_parameter(Parameter::data("pattern", "a"))
            .with_parameter(Parameter::data("with", "b"));

        assert_eq!(component.function_name(), "replace");
        let names: Vec<_> = component.function_parameters().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["pattern", "with"]);
    }

    #[test]
    fn test_repeat_parameter_keeps_nested_order() {
        let table = Parameter::repeat(
            "in",
            vec![Parameter::data("z", "1"), Parameter::data("a", "2")],
        );
        let keys: Vec<_> = table.parameters.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert!(table.repeat);
    }
}
