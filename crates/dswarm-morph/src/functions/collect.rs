//! Built-in collectors

use super::{Collector, CollectorArgs, FunctionRegistry, FunctionSignature};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TEMPLATE_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register_collector(FunctionSignature::new("concat"), |args| {
        Ok(Box::new(Concat {
            delimiter: args.get("delimiter").unwrap_or_default().to_string(),
            prefix: args.get("prefix").unwrap_or_default().to_string(),
            postfix: args.get("postfix").unwrap_or_default().to_string(),
            values: Vec::new(),
        }))
    });
    registry.register_collector(
        FunctionSignature::new("combine").requires(&["value"]),
        Combine::build,
    );
    registry.register_collector(FunctionSignature::new("choose"), |args| {
        Ok(Box::new(Choose {
            inputs: args.inputs.to_vec(),
            values: IndexMap::new(),
        }))
    });
}

/// Substitute `${name}` references; unknown names expand to nothing
pub fn expand_template(template: &str, vars: &IndexMap<String, String>) -> String {
    TEMPLATE_VAR
        .replace_all(template, |caps: &Captures<'_>| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

#[derive(Debug)]
struct Concat {
    delimiter: String,
    prefix: String,
    postfix: String,
    values: Vec<String>,
}

impl Collector for Concat {
    fn receive(&mut self, _input: &str, value: String) -> Option<String> {
        self.values.push(value);
        None
    }

    fn flush(&mut self) -> Option<String> {
        if self.values.is_empty() {
            return None;
        }
        Some(format!(
            "{}{}{}",
            self.prefix,
            self.values.join(&self.delimiter),
            self.postfix
        ))
    }

    fn reset(&mut self) {
        self.values.clear();
    }
}

#[derive(Debug)]
struct Combine {
    template: String,
    inputs: Vec<String>,
    reset_after_emit: bool,
    vars: IndexMap<String, String>,
}

impl Combine {
    fn build(args: &CollectorArgs<'_>) -> Result<Box<dyn Collector>, String> {
        let reset_after_emit = match args.get("reset") {
            None => false,
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| format!("combine: 'reset' must be true or false, got '{raw}'"))?,
        };
        Ok(Box::new(Self {
            template: args.required("value")?.to_string(),
            inputs: args.inputs.to_vec(),
            reset_after_emit,
            vars: IndexMap::new(),
        }))
    }
}

impl Collector for Combine {
    fn receive(&mut self, input: &str, value: String) -> Option<String> {
        self.vars.insert(input.to_string(), value);
        if !self.inputs.iter().all(|i| self.vars.contains_key(i)) {
            return None;
        }
        let out = expand_template(&self.template, &self.vars);
        if self.reset_after_emit {
            self.vars.clear();
        }
        Some(out)
    }

    fn reset(&mut self) {
        self.vars.clear();
    }
}

#[derive(Debug)]
struct Choose {
    inputs: Vec<String>,
    values: IndexMap<String, String>,
}

impl Collector for Choose {
    fn receive(&mut self, input: &str, value: String) -> Option<String> {
        self.values.entry(input.to_string()).or_insert(value);
        None
    }

    fn flush(&mut self) -> Option<String> {
        self.inputs
            .iter()
            .find_map(|input| self.values.get(input).cloned())
    }

    fn reset(&mut self) {
        self.values.clear();
    }
}
