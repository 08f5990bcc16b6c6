//! Pipeline Orchestration Layer
//!
//! Wires decoder, skip filter, timers, morph program and graph encoder into one
//! synchronous chain per task, and runs tasks against a graph sink.
//!
//! ## Architecture
//!
//! ```text
//! TaskRunner ──spawn_blocking──▶ TransformationFlow::apply(input)
//!                                   decoder
//!                                     └─▶ SkipFilter
//!                                          └─▶ StreamTimer("input")
//!                                               └─▶ ProgramStage (Metamorph | identity)
//!                                                    └─▶ StreamTimer("output")
//!                                                         └─▶ GraphEncoder ──▶ GraphModel
//!            ◀────────────── GraphSink::write(model) ◀──────────────────────────────┘
//! ```
//!
//! Every stage call returns only after the rest of the chain has handled the
//! event. A record is therefore fully encoded, or the task has failed, before
//! the decoder reads the next one.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dswarm_pipeline::{Task, TaskRunner, TransformationFlow};
//!
//! let flow = TransformationFlow::from_transformation(&compiler, &job, decoder, data_model)?;
//! let runner = TaskRunner::new(sink, publisher);
//! let output = runner.run(Task::new(Arc::new(flow), input)).await?;
//! ```

pub mod encoder;
pub mod flow;
pub mod program;
pub mod runner;
pub mod skip;
pub mod timer;

pub use encoder::GraphEncoder;
pub use flow::{FlowOptions, TransformationFlow};
pub use program::{Program, ProgramStage};
pub use runner::{Task, TaskOutput, TaskRunner};
pub use skip::{RecordRule, SkipFilter, SkipRules};
pub use timer::StreamTimer;
