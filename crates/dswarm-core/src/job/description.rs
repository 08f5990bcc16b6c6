//! Job description documents
//!
//! The on-disk form of a transformation. It is looser than the typed model:
//! component types are plain strings and parameter maps keep duplicate keys,
//! so that loading can report every problem instead of failing on the first
//! serde error or silently collapsing a repeated key.

use super::model::{
    Component, ComponentKind, FilterExpression, Parameter, Payload, Transformation,
};
use crate::error::{CompileError, CompileIssue, ValidationIssue};
use indexmap::IndexMap;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// A transformation as authored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub variables: IndexMap<String, String>,
    pub components: Vec<ComponentDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescription {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub parameters: ParameterList,
    #[serde(default)]
    pub payload: Option<PayloadDescription>,
    #[serde(default)]
    pub filter: Option<FilterExpression>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadDescription {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parameters: ParameterList,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterDescription {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Scalars are kept as text; objects and arrays keep their JSON text
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub parameters: ParameterList,
}

/// Parameter map in document order, duplicates included
#[derive(Debug, Clone, Default)]
pub struct ParameterList(pub Vec<(String, ParameterDescription)>);

impl<'de> Deserialize<'de> for ParameterList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ListVisitor;

        impl<'de> Visitor<'de> for ListVisitor {
            type Value = ParameterList;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter name to parameter")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, ParameterDescription>()? {
                    entries.push((key, value));
                }
                Ok(ParameterList(entries))
            }
        }

        deserializer.deserialize_map(ListVisitor)
    }
}

impl Serialize for ParameterList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl JobDescription {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Convert into the typed model and validate it
    ///
    /// All conversion and structural issues are returned together.
    pub fn into_transformation(self) -> Result<Transformation, Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        let mut unknown = HashSet::new();
        let mut components = Vec::with_capacity(self.components.len());

        for desc in self.components {
            let kind = match desc.kind.parse::<ComponentKind>() {
                Ok(kind) => kind,
                Err(kind) => {
                    issues.push(ValidationIssue::UnknownComponentType {
                        component: desc.id.clone(),
                        kind,
                    });
                    unknown.insert(desc.id);
                    continue;
                }
            };
            components.push(desc.into_component(kind, &mut issues));
        }

        let transformation = Transformation {
            id: self.id.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            components,
            variables: self.variables,
        };

        // references to components we could not type are already covered by
        // the unknown-type issue
        let cut_off: HashSet<&str> = transformation
            .targets()
            .filter(|target| reads_from(&transformation, &target.id, &unknown))
            .map(|target| target.id.as_str())
            .collect();
        issues.extend(
            super::validate::validate(&transformation)
                .into_iter()
                .filter(|issue| !refers_to(issue, &unknown, &cut_off)),
        );

        if issues.is_empty() {
            debug!(
                transformation = %transformation.id,
                components = transformation.components.len(),
                "loaded job description"
            );
            Ok(transformation)
        } else {
            Err(issues)
        }
    }
}

impl ComponentDescription {
    fn into_component(self, kind: ComponentKind, issues: &mut Vec<ValidationIssue>) -> Component {
        let payload_desc = self.payload.unwrap_or_default();
        let name = self
            .name
            .or_else(|| payload_desc.name.clone())
            .unwrap_or_else(|| self.id.clone());

        let mut payload = Payload {
            name: payload_desc.name.unwrap_or_else(|| name.clone()),
            parameters: IndexMap::new(),
        };
        let entries = payload_desc.parameters.0.into_iter().chain(self.parameters.0);
        for (key, desc) in entries {
            let parameter = desc.into_parameter(key, &self.id, issues);
            if payload.parameters.contains_key(&parameter.name) {
                issues.push(ValidationIssue::DuplicateParameter {
                    component: self.id.clone(),
                    parameter: parameter.name,
                });
                continue;
            }
            payload.insert(parameter);
        }

        Component {
            id: self.id,
            name,
            kind,
            payload,
            inputs: self.inputs,
            outputs: self.outputs,
            filter: self.filter,
        }
    }
}

impl ParameterDescription {
    fn into_parameter(
        self,
        key: String,
        component: &str,
        issues: &mut Vec<ValidationIssue>,
    ) -> Parameter {
        let mut nested = IndexMap::new();
        for (nested_key, desc) in self.parameters.0 {
            let parameter = desc.into_parameter(nested_key, component, issues);
            if nested.contains_key(&parameter.name) {
                issues.push(ValidationIssue::DuplicateParameter {
                    component: component.to_string(),
                    parameter: format!("{}.{}", key, parameter.name),
                });
                continue;
            }
            nested.insert(parameter.name.clone(), parameter);
        }

        Parameter {
            name: self.name.unwrap_or(key),
            kind: self.kind,
            data: self.data.and_then(data_text),
            repeat: self.repeat,
            parameters: nested,
        }
    }
}

fn data_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Whether the input chain of component `id` passes through one of `ids`
fn reads_from(transformation: &Transformation, id: &str, ids: &HashSet<String>) -> bool {
    let mut seen = HashSet::new();
    let mut pending = vec![id];
    while let Some(current) = pending.pop() {
        if !seen.insert(current) {
            continue;
        }
        let Some(component) = transformation.component(current) else {
            continue;
        };
        for input in &component.inputs {
            if ids.contains(input) {
                return true;
            }
            pending.push(input.as_str());
        }
    }
    false
}

fn refers_to(issue: &ValidationIssue, unknown: &HashSet<String>, cut_off: &HashSet<&str>) -> bool {
    match issue {
        ValidationIssue::DanglingInput { input, .. } => unknown.contains(input),
        ValidationIssue::DanglingOutput { output, .. } => unknown.contains(output),
        ValidationIssue::UnreachableTarget(target) => cut_off.contains(target.as_str()),
        _ => false,
    }
}

/// Parse and validate a job description, mapping every problem into a [`CompileError`]
pub fn load(json: &str) -> Result<Transformation, CompileError> {
    let description = JobDescription::from_json(json)
        .map_err(|e| CompileError::from(CompileIssue::Description(e.to_string())))?;
    description.into_transformation().map_err(CompileError::from)
}
