//! Transformation flow
//!
//! One flow is one configured chain:
//!
//! ```text
//! decoder ─▶ skip filter ─▶ input timer( program ─▶ output timer( graph encoder ) )
//! ```
//!
//! A timer measures everything downstream of it. The input timer sees the
//! decoded events, the output timer sees what the program emits.
//!
//! The chain is built fresh for every [`TransformationFlow::apply`] call, so
//! a flow can be shared between tasks without sharing any stage state.

use crate::encoder::GraphEncoder;
use crate::program::Program;
use crate::skip::{SkipFilter, SkipRules};
use crate::timer::StreamTimer;
use dswarm_core::graph::RDF_TYPE;
use dswarm_core::{
    CompileError, DataModel, EventPublisher, EventRecorder, GraphModel, Node, NoopPublisher,
    PipelineResult, Statement, StreamReceiver, TransformError, Transformation,
};
use dswarm_decoder::Decoder;
use dswarm_morph::{from_xml, to_xml, FunctionRegistry, Metamorph, MorphCompiler};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Flow behaviour beyond the chain itself
#[derive(Debug, Clone, Default)]
pub struct FlowOptions {
    /// Class asserted on every record when the run observed none
    pub default_record_class: Option<String>,
    pub skip: SkipRules,
}

pub struct TransformationFlow {
    program: Program,
    registry: Arc<FunctionRegistry>,
    decoder: Arc<dyn Decoder>,
    data_model: Arc<dyn DataModel>,
    publisher: Arc<dyn EventPublisher>,
    options: FlowOptions,
}

impl fmt::Debug for TransformationFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformationFlow")
            .field("program", &self.program)
            .field("decoder", &self.decoder.name())
            .field("data_model", &self.data_model.id())
            .field("options", &self.options)
            .finish()
    }
}

impl TransformationFlow {
    fn new(
        program: Program,
        registry: Arc<FunctionRegistry>,
        decoder: Arc<dyn Decoder>,
        data_model: Arc<dyn DataModel>,
    ) -> Self {
        Self {
            program,
            registry,
            decoder,
            data_model,
            publisher: Arc::new(NoopPublisher),
            options: FlowOptions::default(),
        }
    }

    /// Compile `transformation` and load the rendered document
    ///
    /// The program runs from its document form, the same path a stored script
    /// takes.
    pub fn from_transformation(
        compiler: &MorphCompiler,
        transformation: &Transformation,
        decoder: Arc<dyn Decoder>,
        data_model: Arc<dyn DataModel>,
    ) -> PipelineResult<Self> {
        let script = compiler.compile(transformation)?;
        let xml = to_xml(&script).map_err(|e| CompileError::script(e.to_string()))?;
        info!(
            transformation = %transformation.id,
            rules = script.rules.len(),
            "compiled transformation"
        );
        Self::from_script(&xml, Arc::clone(compiler.registry()), decoder, data_model)
    }

    /// Load a morph document
    ///
    /// Every rule is instantiated once up front, so a bad script fails here
    /// and never reaches a record.
    pub fn from_script(
        xml: &str,
        registry: Arc<FunctionRegistry>,
        decoder: Arc<dyn Decoder>,
        data_model: Arc<dyn DataModel>,
    ) -> PipelineResult<Self> {
        let script = from_xml(xml).map_err(|e| CompileError::script(e.to_string()))?;
        Metamorph::new(&script, &registry, EventRecorder::new())?;
        Ok(Self::new(Program::Morph(script), registry, decoder, data_model))
    }

    /// Flow without a program, for looking at decoder output
    pub fn identity(decoder: Arc<dyn Decoder>, data_model: Arc<dyn DataModel>) -> Self {
        Self::new(
            Program::Identity,
            Arc::new(FunctionRegistry::new()),
            decoder,
            data_model,
        )
    }

    pub fn with_options(mut self, options: FlowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn decoder(&self) -> &Arc<dyn Decoder> {
        &self.decoder
    }

    pub fn data_model(&self) -> &Arc<dyn DataModel> {
        &self.data_model
    }

    /// Run `input` through the chain and return the model of all its records
    ///
    /// The first error from any stage aborts the run. Statements of records
    /// already encoded are discarded with it.
    pub fn apply(&self, input: &str) -> PipelineResult<GraphModel> {
        let encoder = GraphEncoder::new(Arc::clone(&self.data_model));
        let output = StreamTimer::new("output", encoder, Arc::clone(&self.publisher));
        let program = self.program.stage(&self.registry, output)?;
        let input_timer = StreamTimer::new("input", program, Arc::clone(&self.publisher));
        let mut head = SkipFilter::new(self.options.skip.clone(), input_timer);

        let records = self.decoder.decode(input, &mut head)?;
        head.close_stream()?;

        let dropped = head.dropped_records();
        let encoder = head.into_inner().into_inner().into_inner().into_inner();
        let repeated = encoder.repeated_records();
        let mut model = encoder.into_model();
        self.assert_default_class(&mut model)?;

        debug!(
            decoder = self.decoder.name(),
            records,
            dropped,
            repeated,
            statements = model.len(),
            "flow applied"
        );
        Ok(model)
    }

    fn assert_default_class(&self, model: &mut GraphModel) -> PipelineResult<()> {
        let Some(class) = &self.options.default_record_class else {
            return Ok(());
        };
        if model.record_class_uri().is_some() {
            return Ok(());
        }

        let records: Vec<String> = model.record_uris().map(str::to_string).collect();
        for record in records {
            let statement = Statement::try_new(record.as_str(), RDF_TYPE, Node::resource(class.as_str()))
                .map_err(TransformError::from)?;
            model.add_statement(&record, statement);
        }
        model.set_record_class_uri(class.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dswarm_core::graph::DEFAULT_RECORD_CLASS;
    use dswarm_core::{ChannelPublisher, PipelineError, PipelineEvent, StaticDataModel};
    use dswarm_decoder::{JsonDecoder, OaiDecoder};

    const TRIM_SCRIPT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metamorph xmlns="http://www.culturegraph.org/metamorph" version="1" entityMarker=".">
  <rules>
    <data source="S1path" name="title"><trim/></data>
  </rules>
</metamorph>"#;

    fn trim_flow() -> TransformationFlow {
        TransformationFlow::from_script(
            TRIM_SCRIPT,
            Arc::new(FunctionRegistry::with_builtins()),
            Arc::new(JsonDecoder::default()),
            Arc::new(StaticDataModel::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_apply_produces_statements() {
        let model = trim_flow().apply(r#"{"S1path": " hello "}"#).unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.record_class_uri(), None);
    }

    #[test]
    fn test_default_class_is_added_when_none_was_seen() {
        let flow = trim_flow().with_options(FlowOptions {
            default_record_class: Some(DEFAULT_RECORD_CLASS.to_string()),
            ..Default::default()
        });
        let model = flow.apply(r#"[{"S1path": "a"}, {"S1path": "b"}]"#).unwrap();

        assert_eq!(model.len(), 4);
        assert_eq!(model.record_class_uri(), Some(DEFAULT_RECORD_CLASS));
    }

    #[test]
    fn test_timers_sit_around_the_program() {
        let publisher = Arc::new(ChannelPublisher::new(64));
        let mut rx = publisher.subscribe();
        let flow = trim_flow().with_publisher(publisher);

        flow.apply(r#"{"S1path": " hello ", "other": "x"}"#).unwrap();

        let mut literals = std::collections::BTreeMap::new();
        while let Ok(event) = rx.try_recv() {
            if let PipelineEvent::Timing { stage, kind, stats } = event {
                if kind == "literal" {
                    literals.insert(stage, stats.count);
                }
            }
        }
        // the program drops `other`, so only the output timer sees one literal
        assert_eq!(literals.get("output"), Some(&1));
        assert!(literals.get("input").is_some_and(|&n| n > 1));
    }

    #[test]
    fn test_unknown_function_fails_at_load() {
        let script = TRIM_SCRIPT.replace("<trim/>", "<frobnicate/>");
        let err = TransformationFlow::from_script(
            &script,
            Arc::new(FunctionRegistry::with_builtins()),
            Arc::new(JsonDecoder::default()),
            Arc::new(StaticDataModel::default()),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Compile(_)));
    }

    #[test]
    fn test_decode_error_aborts_apply() {
        let err = trim_flow().apply("{not json").unwrap_err();
        assert_eq!(err.category(), "decode");
    }

    #[test]
    fn test_identity_flow_keeps_decoder_structure() {
        let flow = TransformationFlow::identity(
            Arc::new(OaiDecoder::default()),
            Arc::new(StaticDataModel::default()),
        );
        let model = flow
            .apply(
                r#"<OAI-PMH xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/"
                            xmlns:dc="http://purl.org/dc/elements/1.1/">
                     <record><header><identifier>urn:r:1</identifier></header>
                     <metadata><oai_dc:dc><dc:title>Faust</dc:title></oai_dc:dc></metadata></record>
                     <record><header><identifier>urn:r:2</identifier></header>
                     <metadata><oai_dc:dc><dc:title>Woyzeck</dc:title></oai_dc:dc></metadata></record>
                   </OAI-PMH>"#,
            )
            .unwrap();

        assert_eq!(model.record_uris().collect::<Vec<_>>(), vec!["urn:r:1", "urn:r:2"]);
        for (record, title) in [("urn:r:1", "Faust"), ("urn:r:2", "Woyzeck")] {
            let statements = model.statements_for(record).unwrap();
            let literals: Vec<&str> = statements
                .iter()
                .filter(|s| matches!(s.object(), Node::Literal(_)))
                .map(|s| s.object().value())
                .collect();
            assert_eq!(literals, vec![record, title]);
            assert!(statements.iter().all(|s| s.subject().starts_with(record)));
        }
        let paths: Vec<String> = model
            .schema()
            .iter()
            .map(|p| {
                p.attributes()
                    .iter()
                    .map(|a| a.rsplit('#').next().unwrap_or(a).to_string())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect();
        assert_eq!(paths, vec!["header/identifier", "metadata/oai_dc:dc/dc:title"]);
    }
}
