//! The transforming stage of a flow

use dswarm_core::{CompileResult, StreamReceiver, TransformResult};
use dswarm_morph::{FunctionRegistry, Metamorph, MorphScript};

/// What a flow runs between decoder and encoder
#[derive(Debug, Clone, PartialEq)]
pub enum Program {
    Morph(MorphScript),
    /// Pass decoder output through unchanged
    Identity,
}

impl Program {
    /// Instantiate the program in front of `receiver`
    pub fn stage<R: StreamReceiver>(
        &self,
        registry: &FunctionRegistry,
        receiver: R,
    ) -> CompileResult<ProgramStage<R>> {
        Ok(match self {
            Self::Morph(script) => ProgramStage::Morph(Metamorph::new(script, registry, receiver)?),
            Self::Identity => ProgramStage::Identity(receiver),
        })
    }
}

/// A running [`Program`]
pub enum ProgramStage<R> {
    Morph(Metamorph<R>),
    Identity(R),
}

impl<R: StreamReceiver> ProgramStage<R> {
    pub fn into_inner(self) -> R {
        match self {
            Self::Morph(morph) => morph.into_inner(),
            Self::Identity(receiver) => receiver,
        }
    }

    fn receiver(&mut self) -> &mut dyn StreamReceiver {
        match self {
            Self::Morph(morph) => morph,
            Self::Identity(receiver) => receiver,
        }
    }
}

impl<R: StreamReceiver> StreamReceiver for ProgramStage<R> {
    fn start_record(&mut self, id: &str) -> TransformResult<()> {
        self.receiver().start_record(id)
    }

    fn end_record(&mut self) -> TransformResult<()> {
        self.receiver().end_record()
    }

    fn start_entity(&mut self, name: &str) -> TransformResult<()> {
        self.receiver().start_entity(name)
    }

    fn end_entity(&mut self) -> TransformResult<()> {
        self.receiver().end_entity()
    }

    fn literal(&mut self, name: &str, value: &str) -> TransformResult<()> {
        self.receiver().literal(name, value)
    }

    fn close_stream(&mut self) -> TransformResult<()> {
        self.receiver().close_stream()
    }
}
