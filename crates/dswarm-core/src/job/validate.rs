//! Structural validation of a transformation graph

use super::model::{ComponentKind, Transformation};
use crate::error::ValidationIssue;
use std::collections::{HashMap, HashSet};

/// Collect every structural issue in `transformation`
///
/// Components are expected in dependency order: each input must be declared
/// before the component reading it, which also rules out cycles.
pub fn validate(transformation: &Transformation) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for (idx, component) in transformation.components.iter().enumerate() {
        if position.insert(component.id.as_str(), idx).is_some() {
            issues.push(ValidationIssue::DuplicateComponent(component.id.clone()));
        }
    }

    for (idx, component) in transformation.components.iter().enumerate() {
        match component.kind {
            ComponentKind::Source if !component.inputs.is_empty() => {
                issues.push(ValidationIssue::SourceWithInputs(component.id.clone()));
            }
            ComponentKind::Target if !component.outputs.is_empty() => {
                issues.push(ValidationIssue::TargetWithOutputs(component.id.clone()));
            }
            ComponentKind::Function | ComponentKind::Extended
                if component.inputs.is_empty() || component.outputs.is_empty() =>
            {
                issues.push(ValidationIssue::Unwired {
                    component: component.id.clone(),
                    kind: component.kind,
                });
            }
            _ => {}
        }

        for input in &component.inputs {
            match position.get(input.as_str()) {
                None => issues.push(ValidationIssue::DanglingInput {
                    component: component.id.clone(),
                    input: input.clone(),
                }),
                Some(&at) if at >= idx => issues.push(ValidationIssue::ForwardReference {
                    component: component.id.clone(),
                    input: input.clone(),
                }),
                Some(_) => {}
            }
        }

        for output in &component.outputs {
            match position.get(output.as_str()) {
                None => issues.push(ValidationIssue::DanglingOutput {
                    component: component.id.clone(),
                    output: output.clone(),
                }),
                Some(&at) => {
                    let downstream = &transformation.components[at];
                    if !downstream.inputs.iter().any(|i| *i == component.id) {
                        issues.push(ValidationIssue::AsymmetricWiring {
                            component: component.id.clone(),
                            output: output.clone(),
                        });
                    }
                }
            }
        }
    }

    // Inputs always point backwards in a valid graph, so one forward pass
    // settles reachability.
    let mut reachable: HashSet<&str> = HashSet::new();
    for component in &transformation.components {
        let from_source = component.kind == ComponentKind::Source
            || component
                .inputs
                .iter()
                .any(|i| reachable.contains(i.as_str()));
        if from_source {
            reachable.insert(component.id.as_str());
        }
    }

    for target in transformation.targets() {
        let resolvable = target
            .inputs
            .iter()
            .all(|i| position.contains_key(i.as_str()));
        if resolvable && !reachable.contains(target.id.as_str()) {
            issues.push(ValidationIssue::UnreachableTarget(target.id.clone()));
        }
    }

    issues
}
