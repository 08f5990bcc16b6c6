//! Morph function library
//!
//! The [`FunctionRegistry`] is shared by the compiler, which checks names and
//! required parameters against each [`FunctionSignature`], and the interpreter,
//! which instantiates fresh function state per script.

mod builtin;
mod collect;

use crate::script::{FunctionCall, LookupTable};
use dswarm_core::TransformResult;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A single-input value function
///
/// Returning `Ok(None)` drops the value.
pub trait MorphFunction: Send + fmt::Debug {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>>;

    /// Clear per-record state
    fn reset(&mut self) {}
}

/// A multi-input collector
pub trait Collector: Send + fmt::Debug {
    /// Accept a value from the input named `input`; may fire immediately
    fn receive(&mut self, input: &str, value: String) -> Option<String>;

    /// Called at the end of every record, before [`Collector::reset`]
    fn flush(&mut self) -> Option<String> {
        None
    }

    fn reset(&mut self);
}

/// Parameters a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: &'static str,
    pub required: &'static [&'static str],
    /// Parameters whose value names a lookup table
    pub tables: &'static [&'static str],
}

impl FunctionSignature {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            required: &[],
            tables: &[],
        }
    }

    pub const fn requires(mut self, required: &'static [&'static str]) -> Self {
        self.required = required;
        self
    }

    pub const fn tables(mut self, tables: &'static [&'static str]) -> Self {
        self.tables = tables;
        self
    }

    pub fn is_table(&self, parameter: &str) -> bool {
        self.tables.contains(&parameter)
    }
}

/// Resolved attributes of one call, plus the script's lookup tables
#[derive(Debug, Clone, Copy)]
pub struct FunctionArgs<'a> {
    pub function: &'a str,
    pub attributes: &'a IndexMap<String, String>,
    pub maps: &'a IndexMap<String, LookupTable>,
}

impl<'a> FunctionArgs<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn required(&self, name: &str) -> Result<&'a str, String> {
        self.get(name)
            .ok_or_else(|| format!("{} requires '{}'", self.function, name))
    }

    /// The table named by attribute `name`
    pub fn table(&self, name: &str) -> Result<&'a LookupTable, String> {
        let table = self.required(name)?;
        self.maps
            .get(table)
            .ok_or_else(|| format!("{}: unknown map '{}'", self.function, table))
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, String>
    where
        T::Err: fmt::Display,
    {
        self.get(name)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| format!("{}: invalid '{}': {}", self.function, name, e))
            })
            .transpose()
    }
}

/// Collector attributes plus the names of its inputs in declaration order
#[derive(Debug, Clone, Copy)]
pub struct CollectorArgs<'a> {
    pub function: &'a str,
    pub attributes: &'a IndexMap<String, String>,
    pub inputs: &'a [String],
}

impl<'a> CollectorArgs<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn required(&self, name: &str) -> Result<&'a str, String> {
        self.get(name)
            .ok_or_else(|| format!("{} requires '{}'", self.function, name))
    }
}

pub type FunctionFactory = fn(&FunctionArgs<'_>) -> Result<Box<dyn MorphFunction>, String>;
pub type CollectorFactory = fn(&CollectorArgs<'_>) -> Result<Box<dyn Collector>, String>;

/// Named functions and collectors
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, (FunctionSignature, FunctionFactory)>,
    collectors: HashMap<&'static str, (FunctionSignature, CollectorFactory)>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<_> = self.functions.keys().collect();
        functions.sort();
        let mut collectors: Vec<_> = self.collectors.keys().collect();
        collectors.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &functions)
            .field("collectors", &collectors)
            .finish()
    }
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in library
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register(&mut registry);
        collect::register(&mut registry);
        registry
    }

    pub fn register(&mut self, signature: FunctionSignature, factory: FunctionFactory) {
        self.functions.insert(signature.name, (signature, factory));
    }

    pub fn register_collector(&mut self, signature: FunctionSignature, factory: CollectorFactory) {
        self.collectors.insert(signature.name, (signature, factory));
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name).map(|(signature, _)| signature)
    }

    pub fn collector(&self, name: &str) -> Option<&FunctionSignature> {
        self.collectors.get(name).map(|(signature, _)| signature)
    }

    /// Build fresh state for `call`; attributes must already be resolved
    pub fn instantiate(
        &self,
        call: &FunctionCall,
        maps: &IndexMap<String, LookupTable>,
    ) -> Result<Box<dyn MorphFunction>, String> {
        let (signature, factory) = self
            .functions
            .get(call.name.as_str())
            .ok_or_else(|| format!("unknown function '{}'", call.name))?;
        let args = FunctionArgs {
            function: signature.name,
            attributes: &call.attributes,
            maps,
        };
        check_required(signature, |p| args.get(p).is_some())?;
        factory(&args)
    }

    pub fn instantiate_collector(
        &self,
        kind: &str,
        attributes: &IndexMap<String, String>,
        inputs: &[String],
    ) -> Result<Box<dyn Collector>, String> {
        let (signature, factory) = self
            .collectors
            .get(kind)
            .ok_or_else(|| format!("unknown collector '{kind}'"))?;
        let args = CollectorArgs {
            function: signature.name,
            attributes,
            inputs,
        };
        check_required(signature, |p| args.get(p).is_some())?;
        factory(&args)
    }
}

fn check_required(
    signature: &FunctionSignature,
    present: impl Fn(&str) -> bool,
) -> Result<(), String> {
    match signature.required.iter().find(|p| !present(p)) {
        Some(missing) => Err(format!("{} requires '{}'", signature.name, missing)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, attrs: &[(&str, &str)]) -> FunctionCall {
        attrs
            .iter()
            .fold(FunctionCall::new(name), |call, (k, v)| call.with(*k, *v))
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = FunctionRegistry::with_builtins();
        for name in ["trim", "case", "lookup", "regexp", "unique", "not-equals"] {
            assert!(registry.function(name).is_some(), "missing {name}");
        }
        for name in ["concat", "combine", "choose"] {
            assert!(registry.collector(name).is_some(), "missing {name}");
        }
        assert!(registry.function("concat").is_none());
    }

    #[test]
    fn test_signatures_declare_tables() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.function("lookup").unwrap().is_table("in"));
        assert!(registry.function("whitelist").unwrap().is_table("map"));
        assert!(!registry.function("lookup").unwrap().is_table("default"));
    }

    #[test]
    fn test_missing_required_parameter() {
        let registry = FunctionRegistry::with_builtins();
        let err = registry
            .instantiate(&call("replace", &[("pattern", "a")]), &IndexMap::new())
            .unwrap_err();
        assert_eq!(err, "replace requires 'with'");
    }

    #[test]
    fn test_unknown_map_is_reported() {
        let registry = FunctionRegistry::with_builtins();
        let err = registry
            .instantiate(&call("lookup", &[("in", "nope")]), &IndexMap::new())
            .unwrap_err();
        assert_eq!(err, "lookup: unknown map 'nope'");
    }

    #[test]
    fn test_custom_function() {
        #[derive(Debug)]
        struct Shout;
        impl MorphFunction for Shout {
            fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
                Ok(Some(format!("{value}!")))
            }
        }

        let mut registry = FunctionRegistry::new();
        registry.register(FunctionSignature::new("shout"), |_| Ok(Box::new(Shout)));

        let mut f = registry
            .instantiate(&FunctionCall::new("shout"), &IndexMap::new())
            .unwrap();
        assert_eq!(f.apply("hey".into()).unwrap().as_deref(), Some("hey!"));
    }
}
