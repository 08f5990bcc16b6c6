//! Metamorph XML parsing

use crate::script::{
    CollectRule, DataRule, FunctionCall, LookupTable, MapEntry, MorphScript, Rule,
};
use dswarm_core::{FilterDialect, FilterExpression};
use indexmap::IndexMap;
use roxmltree::{Document, Node};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("expected <metamorph> root, found <{0}>")]
    UnexpectedRoot(String),

    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("<{parent}> may not contain <{child}>")]
    UnexpectedElement { parent: String, child: String },

    #[error("{0}")]
    InvalidFilter(String),
}

/// Parse a Metamorph document into a [`MorphScript`]
pub fn from_xml(xml: &str) -> Result<MorphScript, ScriptError> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "metamorph" {
        return Err(ScriptError::UnexpectedRoot(root.tag_name().name().to_string()));
    }

    let mut script = MorphScript::default();
    for section in elements(root) {
        match section.tag_name().name() {
            "meta" => {
                if let Some(name) = elements(section).find(|n| n.tag_name().name() == "name") {
                    script.name = name.text().unwrap_or_default().trim().to_string();
                }
            }
            "vars" => {
                for var in elements(section) {
                    let name = required(var, "name")?;
                    let value = var.attribute("value").unwrap_or_default();
                    script.vars.insert(name.to_string(), value.to_string());
                }
            }
            "rules" => {
                for rule in elements(section) {
                    script.rules.push(parse_rule(rule)?);
                }
            }
            "maps" => {
                for map in elements(section) {
                    let table = LookupTable {
                        name: required(map, "name")?.to_string(),
                        entries: elements(map).map(parse_entry).collect::<Result<_, _>>()?,
                    };
                    script.maps.insert(table.name.clone(), table);
                }
            }
            "filters" => {
                for filter in elements(section) {
                    let name = required(filter, "name")?;
                    let dialect = filter
                        .attribute("type")
                        .map(str::parse::<FilterDialect>)
                        .transpose()
                        .map_err(ScriptError::InvalidFilter)?
                        .unwrap_or_default();
                    let expression = required(filter, "expression")?;
                    script.filters.insert(
                        name.to_string(),
                        FilterExpression {
                            expression: expression.to_string(),
                            dialect,
                        },
                    );
                }
            }
            other => {
                return Err(ScriptError::UnexpectedElement {
                    parent: "metamorph".to_string(),
                    child: other.to_string(),
                })
            }
        }
    }

    Ok(script)
}

fn parse_rule(node: Node<'_, '_>) -> Result<Rule, ScriptError> {
    if node.tag_name().name() == "data" {
        return parse_data(node).map(Rule::Data);
    }

    let kind = node.tag_name().name().to_string();
    let mut inputs = Vec::new();
    for child in elements(node) {
        if child.tag_name().name() != "data" {
            return Err(ScriptError::UnexpectedElement {
                parent: kind,
                child: child.tag_name().name().to_string(),
            });
        }
        inputs.push(parse_data(child)?);
    }

    Ok(Rule::Collect(CollectRule {
        name: required(node, "name")?.to_string(),
        attributes: attributes_except(node, "name"),
        kind,
        inputs,
    }))
}

fn parse_data(node: Node<'_, '_>) -> Result<DataRule, ScriptError> {
    Ok(DataRule {
        source: required(node, "source")?.to_string(),
        name: node.attribute("name").map(str::to_string),
        filter: node.attribute("filter").map(str::to_string),
        functions: elements(node)
            .map(|f| FunctionCall {
                name: f.tag_name().name().to_string(),
                attributes: attributes_except(f, ""),
            })
            .collect(),
    })
}

fn parse_entry(node: Node<'_, '_>) -> Result<MapEntry, ScriptError> {
    Ok(MapEntry {
        name: required(node, "name")?.to_string(),
        value: node.attribute("value").map(str::to_string),
        entries: elements(node).map(parse_entry).collect::<Result<_, _>>()?,
    })
}

fn elements<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn required<'a>(node: Node<'a, '_>, attribute: &'static str) -> Result<&'a str, ScriptError> {
    node.attribute(attribute)
        .ok_or_else(|| ScriptError::MissingAttribute {
            element: node.tag_name().name().to_string(),
            attribute,
        })
}

fn attributes_except(node: Node<'_, '_>, skip: &str) -> IndexMap<String, String> {
    node.attributes()
        .filter(|a| a.name() != skip)
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect()
}
