//! Built-in value functions

use super::{FunctionArgs, FunctionRegistry, FunctionSignature, MorphFunction};
use dswarm_core::TransformResult;
use regex::Regex;
use std::collections::{HashMap, HashSet};

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register(FunctionSignature::new("trim"), |_| Ok(Box::new(Trim)));
    registry.register(FunctionSignature::new("case").requires(&["to"]), Case::build);
    registry.register(
        FunctionSignature::new("constant").requires(&["value"]),
        |args| Ok(Box::new(Constant(args.required("value")?.to_string()))),
    );
    registry.register(FunctionSignature::new("compose"), |args| {
        Ok(Box::new(Compose {
            prefix: args.get("prefix").unwrap_or_default().to_string(),
            postfix: args.get("postfix").unwrap_or_default().to_string(),
        }))
    });
    registry.register(
        FunctionSignature::new("replace").requires(&["pattern", "with"]),
        |args| {
            Ok(Box::new(Replace {
                pattern: compile_pattern(args.function, args.required("pattern")?)?,
                with: args.required("with")?.to_string(),
            }))
        },
    );
    registry.register(
        FunctionSignature::new("regexp").requires(&["match"]),
        |args| {
            Ok(Box::new(Regexp {
                pattern: compile_pattern(args.function, args.required("match")?)?,
                format: args.get("format").map(str::to_string),
            }))
        },
    );
    registry.register(FunctionSignature::new("substring"), |args| {
        Ok(Box::new(Substring {
            start: args.parse("start")?.unwrap_or(0),
            end: args.parse("end")?,
        }))
    });
    registry.register(
        FunctionSignature::new("lookup")
            .requires(&["in"])
            .tables(&["in"]),
        |args| {
            Ok(Box::new(Lookup {
                table: entries(args, "in")?,
                default: args.get("default").map(str::to_string),
            }))
        },
    );
    registry.register(
        FunctionSignature::new("whitelist")
            .requires(&["map"])
            .tables(&["map"]),
        |args| {
            Ok(Box::new(Membership {
                keys: entries(args, "map")?.into_keys().collect(),
                keep: true,
            }))
        },
    );
    registry.register(
        FunctionSignature::new("blacklist")
            .requires(&["map"])
            .tables(&["map"]),
        |args| {
            Ok(Box::new(Membership {
                keys: entries(args, "map")?.into_keys().collect(),
                keep: false,
            }))
        },
    );
    registry.register(
        FunctionSignature::new("setreplace")
            .requires(&["map"])
            .tables(&["map"]),
        SetReplace::build,
    );
    registry.register(
        FunctionSignature::new("occurrence").requires(&["only"]),
        |args| {
            let only: usize = args.parse("only")?.unwrap_or(1);
            if only == 0 {
                return Err("occurrence: 'only' counts from 1".to_string());
            }
            Ok(Box::new(Occurrence { only, seen: 0 }))
        },
    );
    registry.register(
        FunctionSignature::new("equals").requires(&["string"]),
        |args| {
            Ok(Box::new(Equals {
                string: args.required("string")?.to_string(),
                negate: false,
            }))
        },
    );
    registry.register(
        FunctionSignature::new("not-equals").requires(&["string"]),
        |args| {
            Ok(Box::new(Equals {
                string: args.required("string")?.to_string(),
                negate: true,
            }))
        },
    );
    registry.register(FunctionSignature::new("unique"), |_| {
        Ok(Box::new(Unique::default()))
    });
}

fn compile_pattern(function: &str, pattern: &str) -> Result<Regex, String> {
    Regex::new(pattern).map_err(|e| format!("{function}: invalid pattern: {e}"))
}

/// Flatten a table into key/value pairs; entries without a value map to ""
fn entries(args: &FunctionArgs<'_>, attribute: &str) -> Result<HashMap<String, String>, String> {
    Ok(args
        .table(attribute)?
        .entries
        .iter()
        .map(|e| (e.name.clone(), e.value.clone().unwrap_or_default()))
        .collect())
}

#[derive(Debug)]
struct Trim;

impl MorphFunction for Trim {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        Ok(Some(value.trim().to_string()))
    }
}

#[derive(Debug)]
struct Case {
    upper: bool,
}

impl Case {
    fn build(args: &FunctionArgs<'_>) -> Result<Box<dyn MorphFunction>, String> {
        let upper = match args.required("to")?.to_ascii_lowercase().as_str() {
            "upper" => true,
            "lower" => false,
            other => return Err(format!("case: 'to' must be upper or lower, got '{other}'")),
        };
        Ok(Box::new(Self { upper }))
    }
}

impl MorphFunction for Case {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        Ok(Some(if self.upper {
            value.to_uppercase()
        } else {
            value.to_lowercase()
        }))
    }
}

#[derive(Debug)]
struct Constant(String);

impl MorphFunction for Constant {
    fn apply(&mut self, _value: String) -> TransformResult<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}

#[derive(Debug)]
struct Compose {
    prefix: String,
    postfix: String,
}

impl MorphFunction for Compose {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        Ok(Some(format!("{}{}{}", self.prefix, value, self.postfix)))
    }
}

#[derive(Debug)]
struct Replace {
    pattern: Regex,
    with: String,
}

impl MorphFunction for Replace {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        Ok(Some(
            self.pattern
                .replace_all(&value, self.with.as_str())
                .into_owned(),
        ))
    }
}

#[derive(Debug)]
struct Regexp {
    pattern: Regex,
    format: Option<String>,
}

impl MorphFunction for Regexp {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        let Some(captures) = self.pattern.captures(&value) else {
            return Ok(None);
        };
        Ok(Some(match &self.format {
            Some(format) => {
                let mut out = String::new();
                captures.expand(format, &mut out);
                out
            }
            None => captures[0].to_string(),
        }))
    }
}

#[derive(Debug)]
struct Substring {
    start: usize,
    end: Option<usize>,
}

impl MorphFunction for Substring {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        let end = self.end.unwrap_or(usize::MAX);
        if end <= self.start {
            return Ok(Some(String::new()));
        }
        Ok(Some(
            value
                .chars()
                .skip(self.start)
                .take(end - self.start)
                .collect(),
        ))
    }
}

#[derive(Debug)]
struct Lookup {
    table: HashMap<String, String>,
    default: Option<String>,
}

impl MorphFunction for Lookup {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        Ok(self.table.get(&value).cloned().or_else(|| self.default.clone()))
    }
}

#[derive(Debug)]
struct Membership {
    keys: HashSet<String>,
    keep: bool,
}

impl MorphFunction for Membership {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        Ok((self.keys.contains(&value) == self.keep).then_some(value))
    }
}

#[derive(Debug)]
struct SetReplace {
    // longest keys first so overlapping keys replace deterministically
    pairs: Vec<(String, String)>,
}

impl SetReplace {
    fn build(args: &FunctionArgs<'_>) -> Result<Box<dyn MorphFunction>, String> {
        let mut pairs: Vec<_> = entries(args, "map")?
            .into_iter()
            .filter(|(k, _)| !k.is_empty())
            .collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Ok(Box::new(Self { pairs }))
    }
}

impl MorphFunction for SetReplace {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        let mut out = String::with_capacity(value.len());
        let mut rest = value.as_str();
        'outer: while !rest.is_empty() {
            for (key, replacement) in &self.pairs {
                if let Some(tail) = rest.strip_prefix(key.as_str()) {
                    out.push_str(replacement);
                    rest = tail;
                    continue 'outer;
                }
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
        Ok(Some(out))
    }
}

#[derive(Debug)]
struct Occurrence {
    only: usize,
    seen: usize,
}

impl MorphFunction for Occurrence {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        self.seen += 1;
        Ok((self.seen == self.only).then_some(value))
    }

    fn reset(&mut self) {
        self.seen = 0;
    }
}

#[derive(Debug)]
struct Equals {
    string: String,
    negate: bool,
}

impl MorphFunction for Equals {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        Ok(((value == self.string) != self.negate).then_some(value))
    }
}

#[derive(Debug, Default)]
struct Unique {
    seen: HashSet<String>,
}

impl MorphFunction for Unique {
    fn apply(&mut self, value: String) -> TransformResult<Option<String>> {
        Ok(self.seen.insert(value.clone()).then_some(value))
    }

    fn reset(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::functions::FunctionRegistry;
    use crate::script::{FunctionCall, LookupTable, MapEntry};
    use indexmap::IndexMap;
    use test_case::test_case;

    fn maps() -> IndexMap<String, LookupTable> {
        let mut table = LookupTable::new("lang");
        table.entries = vec![
            MapEntry::new("ger", Some("German".into())),
            MapEntry::new("eng", Some("English".into())),
            MapEntry::new("ä", Some("ae".into())),
            MapEntry::new("äu", Some("aeu".into())),
        ];
        IndexMap::from([("lang".to_string(), table)])
    }

    fn run(name: &str, attrs: &[(&str, &str)], inputs: &[&str]) -> Vec<Option<String>> {
        let call = attrs
            .iter()
            .fold(FunctionCall::new(name), |call, (k, v)| call.with(*k, *v));
        let mut function = FunctionRegistry::with_builtins()
            .instantiate(&call, &maps())
            .unwrap();
        inputs
            .iter()
            .map(|v| function.apply(v.to_string()).unwrap())
            .collect()
    }

    fn one(name: &str, attrs: &[(&str, &str)], input: &str) -> Option<String> {
        run(name, attrs, &[input]).remove(0)
    }

    #[test_case("trim", &[], "  a b ", Some("a b"))]
    #[test_case("case", &[("to", "upper")], "abc", Some("ABC"))]
    #[test_case("case", &[("to", "lower")], "ÄBC", Some("äbc"))]
    #[test_case("constant", &[("value", "x")], "abc", Some("x"))]
    #[test_case("compose", &[("prefix", "<"), ("postfix", ">")], "a", Some("<a>"))]
    #[test_case("replace", &[("pattern", r"\s+"), ("with", "_")], "a  b c", Some("a_b_c"))]
    #[test_case("regexp", &[("match", r"(\d{4})-(\d{2})"), ("format", "${2}/${1}")], "on 2014-05", Some("05/2014"))]
    #[test_case("regexp", &[("match", r"(?P<y>\d{4})"), ("format", "year ${y}")], "in 1999", Some("year 1999"))]
    #[test_case("regexp", &[("match", r"\d+")], "ab12cd", Some("12"))]
    #[test_case("regexp", &[("match", r"\d+")], "abcd", None)]
    #[test_case("substring", &[("start", "1"), ("end", "3")], "äöüß", Some("öü"))]
    #[test_case("substring", &[("start", "2")], "abcdef", Some("cdef"))]
    #[test_case("substring", &[("start", "3"), ("end", "1")], "abcdef", Some(""))]
    #[test_case("lookup", &[("in", "lang")], "ger", Some("German"))]
    #[test_case("lookup", &[("in", "lang")], "fre", None)]
    #[test_case("lookup", &[("in", "lang"), ("default", "other")], "fre", Some("other"))]
    #[test_case("whitelist", &[("map", "lang")], "eng", Some("eng"))]
    #[test_case("whitelist", &[("map", "lang")], "fre", None)]
    #[test_case("blacklist", &[("map", "lang")], "eng", None)]
    #[test_case("blacklist", &[("map", "lang")], "fre", Some("fre"))]
    #[test_case("setreplace", &[("map", "lang")], "häuser ä ger", Some("haeuser ae German"))]
    #[test_case("equals", &[("string", "a")], "a", Some("a"))]
    #[test_case("equals", &[("string", "a")], "b", None)]
    #[test_case("not-equals", &[("string", "a")], "a", None)]
    fn test_value_function(name: &str, attrs: &[(&str, &str)], input: &str, expected: Option<&str>) {
        assert_eq!(one(name, attrs, input).as_deref(), expected);
    }

    #[test]
    fn test_occurrence_keeps_only_nth() {
        let out = run("occurrence", &[("only", "2")], &["a", "b", "c"]);
        assert_eq!(out, vec![None, Some("b".to_string()), None]);
    }

    #[test]
    fn test_unique_drops_repeats() {
        let out = run("unique", &[], &["a", "b", "a"]);
        assert_eq!(out, vec![Some("a".into()), Some("b".into()), None]);
    }

    #[test]
    fn test_reset_clears_record_state() {
        let mut function = FunctionRegistry::with_builtins()
            .instantiate(&FunctionCall::new("occurrence").with("only", "1"), &maps())
            .unwrap();
        assert!(function.apply("a".into()).unwrap().is_some());
        assert!(function.apply("b".into()).unwrap().is_none());
        function.reset();
        assert!(function.apply("c".into()).unwrap().is_some());
    }

    #[test_case("case", &[("to", "title")] ; "invalid case")]
    #[test_case("replace", &[("pattern", "("), ("with", "")] ; "invalid pattern")]
    #[test_case("substring", &[("start", "x")] ; "invalid start")]
    #[test_case("occurrence", &[("only", "0")] ; "zero occurrence")]
    fn test_invalid_arguments(name: &str, attrs: &[(&str, &str)]) {
        let call = attrs
            .iter()
            .fold(FunctionCall::new(name), |call, (k, v)| call.with(*k, *v));
        assert!(FunctionRegistry::with_builtins()
            .instantiate(&call, &maps())
            .is_err());
    }
}
