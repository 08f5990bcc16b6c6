//! # dswarm morph
//!
//! Turns a job graph into a Metamorph script and runs that script over the
//! canonical event stream.
//!
//! ```text
//! Transformation ──MorphCompiler──▶ MorphScript ──render──▶ XML
//!                                        ▲                   │
//!                                        └──────parse────────┘
//! MorphScript + FunctionRegistry ──▶ Metamorph<R: StreamReceiver>
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dswarm_morph::{MorphCompiler, Metamorph};
//!
//! let compiler = MorphCompiler::default();
//! let script = compiler.compile(&transformation)?;
//! let mut morph = Metamorph::new(&script, compiler.registry(), downstream)?;
//! ```

pub mod compile;
pub mod filter;
pub mod functions;
pub mod metamorph;
pub mod parse;
pub mod render;
pub mod script;

pub use compile::MorphCompiler;
pub use filter::{BoolExpr, ValueFilter};
pub use functions::{
    Collector, CollectorArgs, FunctionArgs, FunctionRegistry, FunctionSignature, MorphFunction,
};
pub use metamorph::Metamorph;
pub use parse::{from_xml, ScriptError};
pub use render::{to_xml, RenderError};
pub use script::{CollectRule, DataRule, FunctionCall, LookupTable, MapEntry, MorphScript, Rule};
