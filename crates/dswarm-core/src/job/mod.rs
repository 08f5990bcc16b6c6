//! Job graph model
//!
//! A [`Transformation`] is an ordered list of [`Component`]s wired by id.
//! SOURCE components bind input attribute paths, TARGET components bind output
//! paths, FUNCTION and EXTENDED components transform values in between.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dswarm_core::job;
//!
//! let transformation = job::load(&std::fs::read_to_string("job.json")?)?;
//! ```

mod description;
mod model;
mod validate;

pub use description::{
    load, ComponentDescription, JobDescription, ParameterDescription, ParameterList,
    PayloadDescription,
};
pub use model::{
    Component, ComponentKind, FilterDialect, FilterExpression, Parameter, Payload,
    Transformation, FUNCTION_PARAMETER, ORDINAL_PARAMETER, PATH_PARAMETER,
};
pub use validate::validate;
