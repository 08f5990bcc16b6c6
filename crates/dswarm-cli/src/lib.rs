//! dswarm CLI library
//!
//! The binary's argument model, the factory functions that turn
//! configuration into pipeline pieces, and one module per subcommand.

pub mod cli;
pub mod commands;
pub mod factories;
