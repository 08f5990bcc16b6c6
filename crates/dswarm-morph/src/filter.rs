//! Source value filters
//!
//! Two dialects: `regex` (value must match) and `boolean`, a small
//! expression language over the current value:
//!
//! ```text
//! value == "x"   value != "x"   value =~ "^a+"   value contains "x"   empty
//! !expr          a && b         a || b          ( expr )
//! ```
//!
//! `&&` binds tighter than `||`; both are left-associative.

use chumsky::extra;
use chumsky::prelude::*;
use dswarm_core::{FilterDialect, FilterExpression};
use regex::Regex;

type Extra<'src> = extra::Err<Rich<'src, char>>;

/// A compiled filter
#[derive(Debug, Clone)]
pub enum ValueFilter {
    Regex(Regex),
    Boolean(BoolExpr),
}

impl ValueFilter {
    pub fn compile(filter: &FilterExpression) -> Result<Self, String> {
        match filter.dialect {
            FilterDialect::Regex => Regex::new(&filter.expression)
                .map(Self::Regex)
                .map_err(|e| e.to_string()),
            FilterDialect::Boolean => parse_boolean(&filter.expression).map(Self::Boolean),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(value),
            Self::Boolean(expr) => expr.eval(value),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BoolExpr {
    Empty,
    Equals(String),
    NotEquals(String),
    Matches(Regex),
    Contains(String),
    Not(Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
}

impl BoolExpr {
    pub fn eval(&self, value: &str) -> bool {
        match self {
            Self::Empty => value.is_empty(),
            Self::Equals(s) => value == s,
            Self::NotEquals(s) => value != s,
            Self::Matches(re) => re.is_match(value),
            Self::Contains(s) => value.contains(s.as_str()),
            Self::Not(inner) => !inner.eval(value),
            Self::And(a, b) => a.eval(value) && b.eval(value),
            Self::Or(a, b) => a.eval(value) || b.eval(value),
        }
    }
}

/// Parse a boolean-dialect expression
pub fn parse_boolean(input: &str) -> Result<BoolExpr, String> {
    expression()
        .padded()
        .then_ignore(end())
        .parse(input)
        .into_result()
        .map_err(|errs| format_errors(&errs, input))
}

fn kw<'src>(keyword: &'static str) -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    text::keyword::<&str, _, Extra<'src>>(keyword).ignored()
}

fn string_literal<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let single = just('\'')
        .ignore_then(none_of("'").repeated().to_slice())
        .then_ignore(just('\''));
    let double = just('"')
        .ignore_then(none_of("\"").repeated().to_slice())
        .then_ignore(just('"'));

    single
        .or(double)
        .map(|s: &str| s.to_string())
        .labelled("string literal")
}

fn expression<'src>() -> impl Parser<'src, &'src str, BoolExpr, Extra<'src>> {
    recursive(|expr| {
        let literal = string_literal().padded();

        let comparison = kw("value").padded().ignore_then(choice((
            just("==")
                .ignore_then(literal.clone())
                .map(BoolExpr::Equals),
            just("!=")
                .ignore_then(literal.clone())
                .map(BoolExpr::NotEquals),
            just("=~")
                .ignore_then(literal.clone())
                .try_map(|pattern: String, span| {
                    Regex::new(&pattern)
                        .map(BoolExpr::Matches)
                        .map_err(|e| Rich::custom(span, e.to_string()))
                }),
            kw("contains")
                .ignore_then(literal)
                .map(BoolExpr::Contains),
        )));

        let atom = choice((
            kw("empty").padded().to(BoolExpr::Empty),
            comparison,
            expr.delimited_by(just('(').padded(), just(')').padded()),
        ))
        .labelled("condition");

        let unary = just('!')
            .padded()
            .repeated()
            .foldr(atom, |_, inner| BoolExpr::Not(Box::new(inner)));

        let and = unary.clone().foldl(
            just("&&").padded().ignore_then(unary).repeated(),
            |a, b| BoolExpr::And(Box::new(a), Box::new(b)),
        );

        and.clone().foldl(
            just("||").padded().ignore_then(and).repeated(),
            |a, b| BoolExpr::Or(Box::new(a), Box::new(b)),
        )
    })
}

fn format_errors(errs: &[Rich<'_, char>], input: &str) -> String {
    errs.iter()
        .map(|e| {
            let start = e.span().start;
            let line = input[..start].lines().count().max(1);
            let col = start - input[..start].rfind('\n').map_or(0, |i| i + 1);
            let found = e
                .found()
                .map_or("end of input".to_string(), |c| format!("'{}'", c));
            format!("Line {}, column {}: {} (found {})", line, col + 1, e.reason(), found)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
