//! Configuration sections, one per pipeline concern

pub mod data_model;
pub mod decoder;
pub mod logging;
pub mod memorydb;
pub mod pipeline;

pub use data_model::*;
pub use decoder::*;
pub use logging::*;
pub use memorydb::*;
pub use pipeline::*;
