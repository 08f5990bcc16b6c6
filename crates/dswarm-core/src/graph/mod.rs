//! Graph data model
//!
//! Records are materialized as [`Statement`]s grouped per record URI in a
//! [`GraphModel`]. Predicates are minted from attribute names, and the
//! sequence of predicates leading from a record to a value is its
//! [`AttributePath`]; the set of observed paths is the model's schema.
//!
//! Two JSON forms exist:
//!
//! - identified ([`GraphModel::to_json`]): `[{"<record uri>": [{"subject", "predicate", "object"}]}]`
//! - raw ([`GraphModel::to_raw_json`]): the statement objects alone, flattened in record order
//!
//! `remove_record_id_fields(model.to_json()) == model.to_raw_json()` holds for every model.

mod model;
mod path;
mod statement;

pub use model::{remove_record_id_fields, GraphJsonError, GraphModel};
pub use path::{AttributePath, ATTRIBUTE_DELIMITER};
pub use statement::{InvalidStatement, Node, Statement};

use once_cell::sync::Lazy;
use regex::Regex;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Record class used when a run observed none
pub const DEFAULT_RECORD_CLASS: &str = "http://purl.org/ontology/bibo/Document";

static ABSOLUTE_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.\-]*://\S+|urn:\S+)$").expect("valid URI pattern")
});

/// True for hierarchical (`scheme://...`) or URN identifiers
///
/// Prefixed names such as `dc:title` are deliberately not URIs here.
pub fn is_absolute_uri(s: &str) -> bool {
    ABSOLUTE_URI.is_match(s)
}

/// Keep `local` if it already is a URI, otherwise append it to `base`
pub fn mint_uri(base: &str, local: &str) -> String {
    if is_absolute_uri(local) {
        local.to_string()
    } else {
        format!("{base}{local}")
    }
}

/// True for the names an encoder treats as `rdf:type`
pub fn is_rdf_type(name: &str) -> bool {
    name == RDF_TYPE || name == "rdf:type"
}
