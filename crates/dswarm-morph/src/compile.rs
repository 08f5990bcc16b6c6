//! Job graph to morph script compiler
//!
//! Every TARGET becomes one data rule. The compiler walks each target's input
//! chain back to its origin, either a SOURCE (whose bound path becomes the
//! rule source) or an EXTENDED collector (emitted once as an `@id` variable
//! rule and referenced by every consumer). FUNCTION components along the way
//! become function calls, closest to the origin first.
//!
//! Iteration only ever follows component order and parameter insertion order,
//! so compiling the same transformation twice yields the same script.

use crate::filter::ValueFilter;
use crate::functions::{FunctionRegistry, FunctionSignature};
use crate::metamorph::Metamorph;
use crate::render::to_xml;
use crate::script::{
    CollectRule, DataRule, FunctionCall, LookupTable, MapEntry, MorphScript, Rule,
    VARIABLE_PREFIX,
};
use dswarm_core::job::{self, ORDINAL_PARAMETER};
use dswarm_core::{
    CompileError, CompileIssue, CompileResult, Component, ComponentKind, EventRecorder, Parameter,
    Transformation,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Compiles [`Transformation`]s against a function registry
#[derive(Debug, Clone)]
pub struct MorphCompiler {
    registry: Arc<FunctionRegistry>,
}

impl Default for MorphCompiler {
    fn default() -> Self {
        Self::new(Arc::new(FunctionRegistry::with_builtins()))
    }
}

impl MorphCompiler {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Compile a transformation, reporting every issue found
    pub fn compile(&self, transformation: &Transformation) -> CompileResult<MorphScript> {
        let mut issues: Vec<CompileIssue> = job::validate(transformation)
            .into_iter()
            .map(CompileIssue::from)
            .collect();
        for component in &transformation.components {
            self.check_component(component, &mut issues);
        }
        if !issues.is_empty() {
            return Err(CompileError::new(issues));
        }

        let mut builder = ScriptBuilder {
            transformation,
            registry: &self.registry,
            script: MorphScript {
                name: transformation.name.clone(),
                vars: transformation.variables.clone(),
                ..Default::default()
            },
            collectors: HashSet::new(),
        };
        for target in transformation.targets() {
            let rule = builder.target_rule(target)?;
            builder.script.rules.push(Rule::Data(rule));
        }

        // Function arguments are only checked by their factories
        Metamorph::new(&builder.script, &self.registry, EventRecorder::new())?;

        debug!(
            transformation = %transformation.id,
            rules = builder.script.rules.len(),
            maps = builder.script.maps.len(),
            "compiled transformation"
        );
        Ok(builder.script)
    }

    /// Compile and render as Metamorph XML
    pub fn compile_to_xml(&self, transformation: &Transformation) -> CompileResult<String> {
        let script = self.compile(transformation)?;
        to_xml(&script).map_err(|e| CompileError::script(e.to_string()))
    }

    /// Load a JSON job description and compile it
    pub fn compile_job(&self, json: &str) -> CompileResult<MorphScript> {
        self.compile(&job::load(json)?)
    }

    fn check_component(&self, component: &Component, issues: &mut Vec<CompileIssue>) {
        match component.kind {
            ComponentKind::Source => {
                if let Some(raw) = component.payload.data(ORDINAL_PARAMETER) {
                    if !matches!(raw.trim().parse::<usize>(), Ok(n) if n > 0) {
                        issues.push(CompileIssue::InvalidParameter {
                            component: component.id.clone(),
                            parameter: ORDINAL_PARAMETER.to_string(),
                            reason: format!("expected a positive integer, got '{raw}'"),
                        });
                    }
                }
                if let Some(filter) = &component.filter {
                    if let Err(reason) = ValueFilter::compile(filter) {
                        issues.push(CompileIssue::InvalidFilter {
                            component: component.id.clone(),
                            reason,
                        });
                    }
                }
            }
            ComponentKind::Target => check_single_input(component, issues),
            ComponentKind::Function => {
                check_single_input(component, issues);
                match self.registry.function(component.function_name()) {
                    Some(signature) => check_parameters(component, signature, issues),
                    None => issues.push(unknown_function(component)),
                }
            }
            ComponentKind::Extended => match self.registry.collector(component.function_name()) {
                Some(signature) => check_parameters(component, signature, issues),
                None => issues.push(unknown_function(component)),
            },
        }
    }
}

fn unknown_function(component: &Component) -> CompileIssue {
    CompileIssue::UnknownFunction {
        component: component.id.clone(),
        function: component.function_name().to_string(),
    }
}

fn check_single_input(component: &Component, issues: &mut Vec<CompileIssue>) {
    if component.inputs.len() > 1 {
        issues.push(CompileIssue::TooManyInputs {
            component: component.id.clone(),
            kind: component.kind,
            count: component.inputs.len(),
        });
    }
}

fn check_parameters(
    component: &Component,
    signature: &FunctionSignature,
    issues: &mut Vec<CompileIssue>,
) {
    for required in signature.required {
        let present = component
            .payload
            .parameter(required)
            .is_some_and(|p| p.data.is_some() || p.repeat);
        if !present {
            issues.push(CompileIssue::MissingParameter {
                component: component.id.clone(),
                function: signature.name.to_string(),
                parameter: required.to_string(),
            });
        }
    }

    for table in signature.tables {
        let Some(parameter) = component.payload.parameter(table) else {
            continue;
        };
        if parameter.repeat {
            continue;
        }
        if let Some(data) = parameter.data_str() {
            if inline_table(data).is_none() {
                issues.push(CompileIssue::InvalidParameter {
                    component: component.id.clone(),
                    parameter: table.to_string(),
                    reason: "expected a repeat parameter or an inline JSON table".to_string(),
                });
            }
        }
    }
}

/// Parse a JSON object (`key → value`) or array (keys only) into map entries
fn inline_table(data: &str) -> Option<Vec<MapEntry>> {
    match serde_json::from_str::<serde_json::Value>(data).ok()? {
        serde_json::Value::Object(object) => Some(
            object
                .into_iter()
                .map(|(key, value)| MapEntry::new(key, json_text(value)))
                .collect(),
        ),
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(json_text)
                .map(|key| MapEntry::new(key, None))
                .collect(),
        ),
        _ => None,
    }
}

fn json_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn repeat_entries(parameter: &Parameter) -> Vec<MapEntry> {
    parameter
        .parameters
        .values()
        .map(|nested| MapEntry {
            name: nested.name.clone(),
            value: nested.data.clone(),
            entries: repeat_entries(nested),
        })
        .collect()
}

fn variable(id: &str) -> String {
    format!("{VARIABLE_PREFIX}{id}")
}

/// Where a chain of functions starts
enum Origin<'a> {
    Source(&'a Component),
    Collector(&'a Component),
}

struct ScriptBuilder<'a> {
    transformation: &'a Transformation,
    registry: &'a FunctionRegistry,
    script: MorphScript,
    /// collectors whose variable rule has been emitted
    collectors: HashSet<String>,
}

impl<'a> ScriptBuilder<'a> {
    fn component(&self, id: &str) -> CompileResult<&'a Component> {
        self.transformation
            .component(id)
            .ok_or_else(|| CompileError::script(format!("component '{id}' vanished during compilation")))
    }

    fn target_rule(&mut self, target: &'a Component) -> CompileResult<DataRule> {
        let input = target
            .inputs
            .first()
            .ok_or_else(|| CompileError::script(format!("target '{}' has no input", target.id)))?;
        let rule = self.chain_rule(input)?;
        Ok(DataRule {
            name: Some(target.bound_path().to_string()),
            ..rule
        })
    }

    /// Data rule reading the chain that ends at component `id`
    fn chain_rule(&mut self, id: &str) -> CompileResult<DataRule> {
        let mut functions = Vec::new();
        let mut current = self.component(id)?;
        let origin = loop {
            match current.kind {
                ComponentKind::Source => break Origin::Source(current),
                ComponentKind::Extended => break Origin::Collector(current),
                ComponentKind::Function => {
                    functions.push(current);
                    let input = current.inputs.first().ok_or_else(|| {
                        CompileError::script(format!("function '{}' has no input", current.id))
                    })?;
                    current = self.component(input)?;
                }
                ComponentKind::Target => {
                    return Err(CompileError::script(format!(
                        "target '{}' cannot feed other components",
                        current.id
                    )))
                }
            }
        };

        let mut rule = match origin {
            Origin::Source(source) => self.source_rule(source),
            Origin::Collector(collector) => {
                self.emit_collector(collector)?;
                DataRule::new(variable(&collector.id))
            }
        };
        for function in functions.into_iter().rev() {
            let call = self.function_call(function, function.function_name())?;
            rule.functions.push(call);
        }
        Ok(rule)
    }

    fn source_rule(&mut self, source: &Component) -> DataRule {
        let mut rule = DataRule::new(source.bound_path());
        if let Some(ordinal) = source.payload.data(ORDINAL_PARAMETER) {
            rule.functions
                .push(FunctionCall::new("occurrence").with("only", ordinal.trim()));
        }
        if let Some(filter) = &source.filter {
            self.script
                .filters
                .insert(source.id.clone(), filter.clone());
            rule.filter = Some(source.id.clone());
        }
        rule
    }

    fn emit_collector(&mut self, collector: &'a Component) -> CompileResult<()> {
        if self.collectors.contains(&collector.id) {
            return Ok(());
        }

        let mut inputs = Vec::with_capacity(collector.inputs.len());
        for input in &collector.inputs {
            let rule = self.chain_rule(input)?;
            inputs.push(DataRule {
                name: Some(input.clone()),
                ..rule
            });
        }

        let call = self.function_call(collector, collector.function_name())?;
        self.script.rules.push(Rule::Collect(CollectRule {
            kind: call.name,
            name: variable(&collector.id),
            attributes: call.attributes,
            inputs,
        }));
        self.collectors.insert(collector.id.clone());
        Ok(())
    }

    fn function_call(&mut self, component: &Component, name: &str) -> CompileResult<FunctionCall> {
        let signature = self
            .registry
            .function(name)
            .or_else(|| self.registry.collector(name));
        let mut call = FunctionCall::new(name);

        for parameter in component.function_parameters() {
            let is_table = signature.is_some_and(|s| s.is_table(&parameter.name));
            let inline = parameter
                .data_str()
                .filter(|_| is_table)
                .and_then(inline_table);

            if parameter.repeat || inline.is_some() {
                let table_name = format!("{}.{}", component.id, parameter.name);
                let entries = match inline {
                    Some(entries) => entries,
                    None => repeat_entries(parameter),
                };
                self.script.maps.insert(
                    table_name.clone(),
                    LookupTable {
                        name: table_name.clone(),
                        entries,
                    },
                );
                call.attributes.insert(parameter.name.clone(), table_name);
            } else if let Some(data) = &parameter.data {
                call.attributes.insert(parameter.name.clone(), data.clone());
            }
        }

        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dswarm_core::FilterExpression;

    fn trim_job() -> Transformation {
        Transformation::new("t1", "trim title")
            .with_component(Component::source("S1", "S1path").feeds("F1"))
            .with_component(Component::function("F1", "trim").reads("S1").feeds("T1"))
            .with_component(Component::target("T1", "title").reads("F1"))
    }

    fn compile(t: &Transformation) -> CompileResult<MorphScript> {
        MorphCompiler::default().compile(t)
    }

    fn data_rule(script: &MorphScript, index: usize) -> &DataRule {
        match &script.rules[index] {
            Rule::Data(rule) => rule,
            other => panic!("expected data rule, got {other:?}"),
        }
    }

    #[test]
    fn test_trim_chain_compiles_to_one_rule() {
        let script = compile(&trim_job()).unwrap();

        assert_eq!(script.rules.len(), 1);
        let rule = data_rule(&script, 0);
        assert_eq!(rule.source, "S1path");
        assert_eq!(rule.name.as_deref(), Some("title"));
        assert_eq!(rule.functions, vec![FunctionCall::new("trim")]);
    }

    #[test]
    fn test_functions_follow_chain_order() {
        let t = Transformation::new("t", "chain")
            .with_component(Component::source("S1", "a").feeds("F1"))
            .with_component(Component::function("F1", "trim").reads("S1").feeds("F2"))
            .with_component(
                Component::function("F2", "case")
                    .with_parameter(Parameter::data("to", "upper"))
                    .reads("F1")
                    .feeds("T1"),
            )
            .with_component(Component::target("T1", "b").reads("F2"));

        let script = compile(&t).unwrap();
        let names: Vec<_> = data_rule(&script, 0)
            .functions
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["trim", "case"]);
        assert_eq!(data_rule(&script, 0).functions[1].attributes["to"], "upper");
    }

    #[test]
    fn test_repeat_parameter_becomes_table() {
        let t = Transformation::new("t", "lookup")
            .with_component(Component::source("S1", "lang").feeds("F1"))
            .with_component(
                Component::function("F1", "lookup")
                    .with_parameter(Parameter::repeat(
                        "in",
                        [Parameter::data("ger", "German"), Parameter::data("eng", "English")],
                    ))
                    .with_parameter(Parameter::data("default", "other"))
                    .reads("S1")
                    .feeds("T1"),
            )
            .with_component(Component::target("T1", "language").reads("F1"));

        let script = compile(&t).unwrap();
        let call = &data_rule(&script, 0).functions[0];
        assert_eq!(call.attributes["in"], "F1.in");
        assert_eq!(call.attributes["default"], "other");
        assert_eq!(script.maps["F1.in"].get("eng"), Some("English"));
    }

    #[test]
    fn test_inline_json_table() {
        let t = Transformation::new("t", "whitelist")
            .with_component(Component::source("S1", "lang").feeds("F1"))
            .with_component(
                Component::function("F1", "whitelist")
                    .with_parameter(Parameter::data("map", r#"["ger","eng"]"#))
                    .reads("S1")
                    .feeds("T1"),
            )
            .with_component(Component::target("T1", "language").reads("F1"));

        let script = compile(&t).unwrap();
        assert!(script.maps["F1.map"].contains("ger"));
        assert_eq!(data_rule(&script, 0).functions[0].attributes["map"], "F1.map");
    }

    #[test]
    fn test_source_ordinal_and_filter() {
        let t = Transformation::new("t", "first")
            .with_component(
                Component::source("S1", "dc.creator")
                    .with_parameter(Parameter::data(ORDINAL_PARAMETER, "1"))
                    .with_filter(FilterExpression::regex("\\S"))
                    .feeds("T1"),
            )
            .with_component(Component::target("T1", "creator").reads("S1"));

        let script = compile(&t).unwrap();
        let rule = data_rule(&script, 0);
        assert_eq!(rule.filter.as_deref(), Some("S1"));
        assert_eq!(
            rule.functions,
            vec![FunctionCall::new("occurrence").with("only", "1")]
        );
        assert_eq!(script.filters["S1"].expression, "\\S");
    }

    #[test]
    fn test_collector_feeding_functions_is_emitted_once() {
        let t = Transformation::new("t", "concat")
            .with_component(Component::source("S1", "a").feeds("E1"))
            .with_component(Component::source("S2", "b").feeds("E1"))
            .with_component(
                Component::extended("E1", "concat")
                    .with_parameter(Parameter::data("delimiter", ", "))
                    .reads("S1")
                    .reads("S2")
                    .feeds("F1")
                    .feeds("T2"),
            )
            .with_component(Component::function("F1", "trim").reads("E1").feeds("T1"))
            .with_component(Component::target("T1", "joined").reads("F1"))
            .with_component(Component::target("T2", "raw").reads("E1"));

        let script = compile(&t).unwrap();
        assert_eq!(script.rules.len(), 3);

        let Rule::Collect(concat) = &script.rules[0] else {
            panic!("collector rule must come first");
        };
        assert_eq!(concat.name, "@E1");
        assert_eq!(concat.attributes["delimiter"], ", ");
        let inputs: Vec<_> = concat
            .inputs
            .iter()
            .map(|d| (d.source.as_str(), d.name.as_deref()))
            .collect();
        assert_eq!(inputs, vec![("a", Some("S1")), ("b", Some("S2"))]);

        assert_eq!(data_rule(&script, 1).source, "@E1");
        assert_eq!(data_rule(&script, 1).name.as_deref(), Some("joined"));
        assert_eq!(data_rule(&script, 2).source, "@E1");
        assert!(data_rule(&script, 2).functions.is_empty());
    }

    #[test]
    fn test_semantic_issues_are_collected() {
        let t = Transformation::new("t", "broken")
            .with_component(
                Component::source("S1", "a")
                    .with_filter(FilterExpression::boolean("value >>> 'x'"))
                    .feeds("F1")
                    .feeds("F2"),
            )
            .with_component(Component::function("F1", "frobnicate").reads("S1").feeds("T1"))
            .with_component(Component::function("F2", "replace").reads("S1").feeds("T2"))
            .with_component(Component::target("T1", "x").reads("F1"))
            .with_component(Component::target("T2", "y").reads("F2"));

        let err = compile(&t).unwrap_err();
        let issues = err.issues();
        assert_eq!(issues.len(), 4, "{err}");
        assert!(matches!(issues[0], CompileIssue::InvalidFilter { .. }));
        assert!(matches!(&issues[1], CompileIssue::UnknownFunction { function, .. } if function == "frobnicate"));
        assert!(matches!(&issues[2], CompileIssue::MissingParameter { parameter, .. } if parameter == "pattern"));
        assert!(matches!(&issues[3], CompileIssue::MissingParameter { parameter, .. } if parameter == "with"));
    }

    #[test]
    fn test_target_with_two_inputs_is_rejected() {
        let t = Transformation::new("t", "fan-in")
            .with_component(Component::source("S1", "a").feeds("T1"))
            .with_component(Component::source("S2", "b").feeds("T1"))
            .with_component(Component::target("T1", "x").reads("S1").reads("S2"));

        let err = compile(&t).unwrap_err();
        assert_eq!(
            err.issues(),
            &[CompileIssue::TooManyInputs {
                component: "T1".into(),
                kind: ComponentKind::Target,
                count: 2,
            }]
        );
    }

    #[test]
    fn test_function_arguments_are_checked() {
        let t = Transformation::new("t", "bad arguments")
            .with_component(Component::source("S1", "a").feeds("F1").feeds("F2"))
            .with_component(
                Component::function("F1", "replace")
                    .with_parameter(Parameter::data("pattern", "("))
                    .with_parameter(Parameter::data("with", "x"))
                    .reads("S1")
                    .feeds("T1"),
            )
            .with_component(
                Component::function("F2", "case")
                    .with_parameter(Parameter::data("to", "title"))
                    .reads("S1")
                    .feeds("T2"),
            )
            .with_component(Component::target("T1", "b").reads("F1"))
            .with_component(Component::target("T2", "c").reads("F2"));

        let err = compile(&t).unwrap_err();
        let messages: Vec<String> = err.issues().iter().map(ToString::to_string).collect();
        assert_eq!(messages.len(), 2, "{err}");
        assert!(messages[0].contains("rule 'b', replace") && messages[0].contains("invalid pattern"));
        assert!(messages[1].contains("rule 'c', case") && messages[1].contains("title"));
        assert!(MorphCompiler::default().compile_to_xml(&t).is_err());
    }

    #[test]
    fn test_invalid_ordinal() {
        let t = Transformation::new("t", "ordinal")
            .with_component(
                Component::source("S1", "a")
                    .with_parameter(Parameter::data(ORDINAL_PARAMETER, "0"))
                    .feeds("T1"),
            )
            .with_component(Component::target("T1", "x").reads("S1"));

        let err = compile(&t).unwrap_err();
        assert!(matches!(
            &err.issues()[0],
            CompileIssue::InvalidParameter { parameter, .. } if parameter == "ordinal"
        ));
    }
}
