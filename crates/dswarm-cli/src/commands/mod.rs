pub mod compile;
pub mod run;
pub mod schema;
pub mod validate;
