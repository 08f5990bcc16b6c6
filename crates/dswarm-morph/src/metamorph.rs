//! Morph script interpreter
//!
//! [`Metamorph`] is a [`StreamReceiver`] stage. Incoming literals are addressed
//! by their dotted path (`entity.entity.name`) and routed to every data rule
//! whose source matches, in rule order. A rule's output goes downstream as a
//! flat literal, back into the interpreter as an `@variable`, or into the
//! collector that owns the rule.
//!
//! Collectors flush at `end_record`, in rule order, after which all function
//! and collector state is reset for the next record.

use crate::filter::ValueFilter;
use crate::functions::{Collector, FunctionRegistry, MorphFunction};
use crate::script::{is_variable, DataRule, FunctionCall, MorphScript, Rule, ENTITY_MARKER};
use dswarm_core::{
    CompileError, CompileIssue, CompileResult, StreamReceiver, TransformError, TransformResult,
};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use tracing::trace;

/// Variables may feed other variables, but not endlessly
const MAX_VARIABLE_DEPTH: usize = 32;

static SCRIPT_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\[([^\]]+)\]").unwrap());

#[derive(Debug, Clone)]
enum Output {
    /// Literal downstream, or re-dispatch when the name is a variable
    Emit(String),
    Collector { index: usize, input: String },
}

#[derive(Debug)]
struct Pipe {
    filter: Option<ValueFilter>,
    functions: Vec<Box<dyn MorphFunction>>,
    output: Output,
}

#[derive(Debug)]
struct CollectorSlot {
    name: String,
    collector: Box<dyn Collector>,
}

/// Executes a [`MorphScript`] and forwards its output to `R`
pub struct Metamorph<R> {
    receiver: R,
    pipes: Vec<Pipe>,
    exact: HashMap<String, Vec<usize>>,
    patterns: Vec<(Regex, usize)>,
    collectors: Vec<CollectorSlot>,
    entities: Vec<String>,
}

impl<R: StreamReceiver> Metamorph<R> {
    /// Instantiate every rule of `script`; all problems are reported together
    pub fn new(script: &MorphScript, registry: &FunctionRegistry, receiver: R) -> CompileResult<Self> {
        let mut builder = Builder {
            script,
            registry,
            issues: Vec::new(),
            pipes: Vec::new(),
            collectors: Vec::new(),
        };

        for rule in &script.rules {
            match rule {
                Rule::Data(data) => {
                    let output = Output::Emit(data.name.clone().unwrap_or_else(|| data.source.clone()));
                    builder.pipe(data, output);
                }
                Rule::Collect(collect) => {
                    let inputs: Vec<String> = collect.inputs.iter().map(input_name).collect();
                    let attributes = builder.resolve(&collect.name, &collect.attributes);
                    let index = builder.collectors.len();
                    match registry.instantiate_collector(&collect.kind, &attributes, &inputs) {
                        Ok(collector) => builder.collectors.push(CollectorSlot {
                            name: collect.name.clone(),
                            collector,
                        }),
                        Err(reason) => {
                            builder.issue(&collect.name, &collect.kind, reason);
                            continue;
                        }
                    }
                    for (data, input) in collect.inputs.iter().zip(inputs) {
                        builder.pipe(data, Output::Collector { index, input });
                    }
                }
            }
        }

        if !builder.issues.is_empty() {
            return Err(CompileError::new(builder.issues));
        }

        let mut exact: HashMap<String, Vec<usize>> = HashMap::new();
        let mut patterns = Vec::new();
        for (index, source) in builder.pipes.iter().map(|(source, _)| source).enumerate() {
            if source.contains('*') {
                patterns.push((wildcard(source)?, index));
            } else {
                exact.entry(source.clone()).or_default().push(index);
            }
        }

        Ok(Self {
            receiver,
            pipes: builder.pipes.into_iter().map(|(_, pipe)| pipe).collect(),
            exact,
            patterns,
            collectors: builder.collectors,
            entities: Vec::new(),
        })
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn into_inner(self) -> R {
        self.receiver
    }

    fn dispatch(&mut self, source: &str, value: &str, depth: usize) -> TransformResult<()> {
        if depth > MAX_VARIABLE_DEPTH {
            return Err(TransformError::unexpected(
                "literal",
                format!("variable '{source}' nests deeper than {MAX_VARIABLE_DEPTH} levels"),
            ));
        }

        let mut targets: Vec<usize> = self.exact.get(source).cloned().unwrap_or_default();
        targets.extend(
            self.patterns
                .iter()
                .filter(|(re, _)| re.is_match(source))
                .map(|(_, index)| *index),
        );
        if targets.is_empty() {
            return Ok(());
        }
        targets.sort_unstable();
        targets.dedup();

        for index in targets {
            self.run_pipe(index, value.to_string(), depth)?;
        }
        Ok(())
    }

    fn run_pipe(&mut self, index: usize, value: String, depth: usize) -> TransformResult<()> {
        let pipe = &mut self.pipes[index];
        if let Some(filter) = &pipe.filter {
            if !filter.matches(&value) {
                return Ok(());
            }
        }

        let mut current = value;
        for function in &mut pipe.functions {
            match function.apply(current)? {
                Some(next) => current = next,
                None => return Ok(()),
            }
        }

        let output = pipe.output.clone();
        match output {
            Output::Emit(name) => self.emit(&name, &current, depth),
            Output::Collector { index, input } => {
                match self.collectors[index].collector.receive(&input, current) {
                    Some(out) => self.emit_collected(index, out, depth),
                    None => Ok(()),
                }
            }
        }
    }

    fn emit_collected(&mut self, index: usize, value: String, depth: usize) -> TransformResult<()> {
        let name = self.collectors[index].name.clone();
        self.emit(&name, &value, depth)
    }

    fn emit(&mut self, name: &str, value: &str, depth: usize) -> TransformResult<()> {
        if is_variable(name) {
            self.dispatch(name, value, depth + 1)
        } else {
            trace!(name, value, "morph output");
            self.receiver.literal(name, value)
        }
    }

    fn reset(&mut self) {
        for pipe in &mut self.pipes {
            pipe.functions.iter_mut().for_each(|f| f.reset());
        }
        for slot in &mut self.collectors {
            slot.collector.reset();
        }
        self.entities.clear();
    }
}

impl<R: StreamReceiver> StreamReceiver for Metamorph<R> {
    fn start_record(&mut self, id: &str) -> TransformResult<()> {
        self.reset();
        self.receiver.start_record(id)
    }

    fn end_record(&mut self) -> TransformResult<()> {
        for index in 0..self.collectors.len() {
            if let Some(out) = self.collectors[index].collector.flush() {
                self.emit_collected(index, out, 0)?;
            }
        }
        self.reset();
        self.receiver.end_record()
    }

    fn start_entity(&mut self, name: &str) -> TransformResult<()> {
        self.entities.push(name.to_string());
        Ok(())
    }

    fn end_entity(&mut self) -> TransformResult<()> {
        self.entities
            .pop()
            .map(|_| ())
            .ok_or_else(|| TransformError::unexpected("end_entity", "no entity is open"))
    }

    fn literal(&mut self, name: &str, value: &str) -> TransformResult<()> {
        if self.entities.is_empty() {
            return self.dispatch(name, value, 0);
        }
        let mut path = self.entities.join(ENTITY_MARKER);
        path.push_str(ENTITY_MARKER);
        path.push_str(name);
        self.dispatch(&path, value, 0)
    }

    fn close_stream(&mut self) -> TransformResult<()> {
        self.receiver.close_stream()
    }
}

fn input_name(data: &DataRule) -> String {
    data.name.clone().unwrap_or_else(|| data.source.clone())
}

fn wildcard(source: &str) -> CompileResult<Regex> {
    let pattern = format!("^{}$", regex::escape(source).replace(r"\*", ".*"));
    Regex::new(&pattern)
        .map_err(|e| CompileError::script(format!("source pattern '{source}': {e}")))
}

struct Builder<'a> {
    script: &'a MorphScript,
    registry: &'a FunctionRegistry,
    issues: Vec<CompileIssue>,
    pipes: Vec<(String, Pipe)>,
    collectors: Vec<CollectorSlot>,
}

impl Builder<'_> {
    fn issue(&mut self, rule: &str, function: &str, reason: String) {
        self.issues.push(CompileIssue::Script(format!(
            "rule '{rule}', {function}: {reason}"
        )));
    }

    /// Substitute `$[var]` references from the script's vars
    fn resolve(&mut self, rule: &str, attributes: &IndexMap<String, String>) -> IndexMap<String, String> {
        let mut resolved = IndexMap::with_capacity(attributes.len());
        for (key, value) in attributes {
            let mut missing = None;
            let text = SCRIPT_VAR.replace_all(value, |caps: &Captures<'_>| {
                match self.script.vars.get(&caps[1]) {
                    Some(v) => v.clone(),
                    None => {
                        missing = Some(caps[1].to_string());
                        String::new()
                    }
                }
            });
            if let Some(var) = missing {
                self.issue(rule, key, format!("unknown variable '{var}'"));
            }
            resolved.insert(key.clone(), text.into_owned());
        }
        resolved
    }

    fn pipe(&mut self, data: &DataRule, output: Output) {
        let label = data.name.as_deref().unwrap_or(&data.source).to_string();

        let filter = match &data.filter {
            None => None,
            Some(name) => match self.script.filters.get(name) {
                None => {
                    self.issue(&label, "filter", format!("unknown filter '{name}'"));
                    None
                }
                Some(expression) => match ValueFilter::compile(expression) {
                    Ok(filter) => Some(filter),
                    Err(reason) => {
                        self.issues.push(CompileIssue::InvalidFilter {
                            component: name.clone(),
                            reason,
                        });
                        None
                    }
                },
            },
        };

        let mut functions = Vec::with_capacity(data.functions.len());
        for call in &data.functions {
            if self.registry.function(&call.name).is_none() {
                self.issues.push(CompileIssue::UnknownFunction {
                    component: label.clone(),
                    function: call.name.clone(),
                });
                continue;
            }
            let resolved = FunctionCall {
                name: call.name.clone(),
                attributes: self.resolve(&label, &call.attributes),
            };
            match self.registry.instantiate(&resolved, &self.script.maps) {
                Ok(function) => functions.push(function),
                Err(reason) => self.issue(&label, &call.name, reason),
            }
        }

        self.pipes.push((
            data.source.clone(),
            Pipe {
                filter,
                functions,
                output,
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::from_xml;
    use dswarm_core::{EventRecorder, StreamEvent};

    fn run(xml: &str, feed: impl FnOnce(&mut Metamorph<EventRecorder>)) -> Vec<StreamEvent> {
        let script = from_xml(xml).unwrap();
        let mut morph =
            Metamorph::new(&script, &FunctionRegistry::with_builtins(), EventRecorder::default())
                .unwrap();
        feed(&mut morph);
        morph.into_inner().into_events()
    }

    fn literals(events: &[StreamEvent]) -> Vec<(String, String)> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Literal { name, value } => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_data_rule_follows_entity_path() {
        let events = run(
            r#"<metamorph><rules>
                 <data source="metadata.dc.title" name="title"><trim/></data>
               </rules></metamorph>"#,
            |m| {
                m.start_record("r1").unwrap();
                m.start_entity("metadata").unwrap();
                m.start_entity("dc").unwrap();
                m.literal("title", "  Faust ").unwrap();
                m.literal("creator", "Goethe").unwrap();
                m.end_entity().unwrap();
                m.end_entity().unwrap();
                m.literal("title", "not nested").unwrap();
                m.end_record().unwrap();
            },
        );

        assert_eq!(
            events,
            vec![
                StreamEvent::StartRecord("r1".into()),
                StreamEvent::literal("title", "Faust"),
                StreamEvent::EndRecord,
            ]
        );
    }

    #[test]
    fn test_filter_and_dropping_functions() {
        let events = run(
            r#"<metamorph>
                 <rules>
                   <data source="lang" name="lang" filter="F"><lookup in="m" default="$[fallback]"/></data>
                 </rules>
                 <vars><var name="fallback" value="other"/></vars>
                 <maps><map name="m"><entry name="ger" value="German"/></map></maps>
                 <filters><filter name="F" type="boolean" expression="!empty"/></filters>
               </metamorph>"#,
            |m| {
                m.start_record("r").unwrap();
                m.literal("lang", "ger").unwrap();
                m.literal("lang", "").unwrap();
                m.literal("lang", "fre").unwrap();
                m.end_record().unwrap();
            },
        );

        assert_eq!(
            literals(&events),
            pairs(&[("lang", "German"), ("lang", "other")])
        );
    }

    #[test]
    fn test_collector_variable_feeds_data_rule() {
        let events = run(
            r#"<metamorph><rules>
                 <concat name="@joined" delimiter="; ">
                   <data source="a" name="S1"/>
                   <data source="b" name="S2"/>
                 </concat>
                 <data source="@joined" name="all"><compose prefix="[" postfix="]"/></data>
               </rules></metamorph>"#,
            |m| {
                for id in ["r1", "r2"] {
                    m.start_record(id).unwrap();
                    m.literal("a", "x").unwrap();
                    m.literal("b", "y").unwrap();
                    m.literal("a", "z").unwrap();
                    m.end_record().unwrap();
                }
            },
        );

        // state resets between records
        assert_eq!(
            literals(&events),
            pairs(&[("all", "[x; y; z]"), ("all", "[x; y; z]")])
        );
    }

    #[test]
    fn test_combine_emits_when_complete() {
        let events = run(
            r#"<metamorph><rules>
                 <combine name="label" value="${t} (${d})">
                   <data source="title" name="t"/>
                   <data source="date" name="d"><regexp match="\d{4}"/></data>
                 </combine>
               </rules></metamorph>"#,
            |m| {
                m.start_record("r").unwrap();
                m.literal("title", "Faust").unwrap();
                m.literal("date", "circa 1808").unwrap();
                m.end_record().unwrap();
            },
        );

        assert_eq!(literals(&events), pairs(&[("label", "Faust (1808)")]));
    }

    #[test]
    fn test_wildcard_source() {
        let events = run(
            r#"<metamorph><rules><data source="dc.*" name="any"/></rules></metamorph>"#,
            |m| {
                m.start_record("r").unwrap();
                m.start_entity("dc").unwrap();
                m.literal("title", "t").unwrap();
                m.literal("date", "d").unwrap();
                m.end_entity().unwrap();
                m.end_record().unwrap();
            },
        );

        assert_eq!(literals(&events), pairs(&[("any", "t"), ("any", "d")]));
    }

    #[test]
    fn test_unbalanced_end_entity_is_an_error() {
        let script = from_xml("<metamorph><rules/></metamorph>").unwrap();
        let mut morph =
            Metamorph::new(&script, &FunctionRegistry::with_builtins(), EventRecorder::default())
                .unwrap();
        morph.start_record("r").unwrap();
        assert!(morph.end_entity().is_err());
    }

    #[test]
    fn test_script_problems_are_collected() {
        let script = from_xml(
            r#"<metamorph><rules>
                 <data source="a" name="x" filter="missing"><frobnicate/></data>
                 <data source="b" name="y"><case to="$[nope]"/></data>
               </rules></metamorph>"#,
        )
        .unwrap();

        let err = Metamorph::new(&script, &FunctionRegistry::with_builtins(), EventRecorder::default())
            .err()
            .unwrap();
        // unknown filter, unknown function, unknown variable, invalid case target
        assert_eq!(err.issues().len(), 4, "{err}");
    }
}
