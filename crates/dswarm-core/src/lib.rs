//! # dswarm core
//!
//! Shared building blocks for the dswarm transformation pipeline:
//!
//! - [`job`]: the job graph model (components, payloads, parameters) and its
//!   structural validation
//! - [`stream`]: the canonical record/entity/literal event contract every stage speaks
//! - [`graph`]: statements, attribute paths and the graph model produced by a run
//! - [`error`]: the error taxonomy shared by compiler, decoder, executor and sinks
//! - [`sink`], [`events`], [`data_model`]: capability traits for collaborators
//!   that live outside the pipeline (graph stores, metrics, schema descriptors)
//!
//! Nothing in this crate holds global state. Collaborators are passed as
//! `Arc<dyn Trait>` into the constructors that need them.

pub mod data_model;
pub mod error;
pub mod events;
pub mod graph;
pub mod job;
pub mod persisted;
pub mod sink;
pub mod stream;

pub use data_model::{DataModel, StaticDataModel};
pub use error::{
    CompileError, CompileIssue, CompileResult, DecodeError, DecodeResult, PipelineError,
    PipelineResult, StorageError, StorageResult, TransformError, TransformResult,
    ValidationIssue,
};
pub use events::{
    ChannelPublisher, EventPublisher, NoopPublisher, PipelineEvent, TimingStats,
    TracingPublisher,
};
pub use graph::{
    remove_record_id_fields, AttributePath, GraphModel, InvalidStatement, Node, Statement,
};
pub use job::{
    Component, ComponentKind, FilterDialect, FilterExpression, JobDescription, Parameter,
    Payload, Transformation,
};
pub use persisted::Persisted;
pub use sink::{DiscardSink, GraphSink};
pub use stream::{EventRecorder, StreamEvent, StreamReceiver};
