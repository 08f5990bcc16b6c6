//! Factory functions for the pipeline pieces the commands need
//!
//! This module is the composition root: configuration goes in, concrete
//! decoders, data models and flows come out as trait objects.

use crate::cli::{InputFormat, ProgramArgs};
use anyhow::{bail, Context, Result};
use dswarm_config::{DataModelConfig, DecoderConfig, DswarmConfig, PipelineConfig, SkipConfig};
use dswarm_core::{DataModel, StaticDataModel};
use dswarm_decoder::{
    CsvDecoder, CsvOptions, Decoder, DecoderRegistry, JsonDecoder, JsonOptions, OaiDecoder,
    OaiOptions,
};
use dswarm_morph::MorphCompiler;
use dswarm_pipeline::{FlowOptions, SkipRules, TransformationFlow};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// All decoders, configured from `[decoder]`
pub fn create_decoder_registry(config: &DecoderConfig) -> Result<DecoderRegistry> {
    if !config.csv.delimiter.is_ascii() {
        bail!("CSV delimiter '{}' is not an ASCII character", config.csv.delimiter);
    }

    let mut registry = DecoderRegistry::new();
    registry.register(Arc::new(OaiDecoder::new(OaiOptions {
        record_tag: config.oai.record_tag.clone(),
        record_entity: config.oai.record_entity.clone(),
        sections: config.oai.sections.clone(),
        require_sections: config.oai.require_sections,
    })));
    registry.register(Arc::new(JsonDecoder::new(JsonOptions {
        id_field: config.json.id_field.clone(),
        record_path: config.json.record_path.clone(),
    })));
    registry.register(Arc::new(CsvDecoder::new(CsvOptions {
        delimiter: config.csv.delimiter as u8,
        has_headers: config.csv.has_headers,
        id_column: config.csv.id_column.clone(),
    })));
    Ok(registry)
}

/// Pick the decoder for `input`, letting `--format` override `[decoder] format`
pub fn create_decoder(
    config: &DecoderConfig,
    format: Option<InputFormat>,
    input: &str,
) -> Result<Arc<dyn Decoder>> {
    let name = format.map_or(config.format.as_str(), |f| f.as_str());
    let registry = create_decoder_registry(config)?;
    let decoder = registry
        .resolve(name, input)
        .with_context(|| format!("No decoder for format '{}' (known: {:?})", name, registry.names()))?;
    debug!(format = name, decoder = decoder.name(), "Selected decoder");
    Ok(decoder)
}

pub fn create_data_model(config: &DataModelConfig) -> Arc<dyn DataModel> {
    Arc::new(StaticDataModel {
        id: config.id.clone(),
        record_base_uri: config.record_base_uri.clone(),
        schema_base_uri: config.schema_base_uri.clone(),
        record_class_uri: config.record_class_uri.clone(),
    })
}

pub fn create_skip_rules(config: &SkipConfig) -> Result<SkipRules> {
    let mut rules = SkipRules::default();
    for entity in &config.entities {
        rules = rules.skip_entity(entity.clone());
    }
    for pattern in &config.literals {
        rules = rules
            .skip_literals(pattern)
            .with_context(|| format!("Invalid skip pattern '{}'", pattern))?;
    }
    for record in &config.records {
        rules = rules
            .skip_records_where(&record.path, &record.value)
            .with_context(|| format!("Invalid record skip rule for '{}'", record.path))?;
    }
    Ok(rules)
}

pub fn create_flow_options(config: &PipelineConfig) -> Result<FlowOptions> {
    Ok(FlowOptions {
        default_record_class: config.default_record_class().map(str::to_string),
        skip: create_skip_rules(&config.skip)?,
    })
}

/// Assemble the flow a `run` or `schema` command applies to `input`
pub fn create_flow(
    config: &DswarmConfig,
    program: &ProgramArgs,
    format: Option<InputFormat>,
    input: &str,
) -> Result<TransformationFlow> {
    let decoder = create_decoder(&config.decoder, format, input)?;
    let data_model = create_data_model(&config.data_model);
    let compiler = MorphCompiler::default();

    let flow = match (&program.job, &program.script) {
        (Some(job), _) => {
            let json = read_file(job)?;
            let transformation = dswarm_core::job::load(&json)
                .with_context(|| format!("Failed to load job {}", job.display()))?;
            TransformationFlow::from_transformation(&compiler, &transformation, decoder, data_model)
                .with_context(|| format!("Failed to compile job {}", job.display()))?
        }
        (None, Some(script)) => {
            let xml = read_file(script)?;
            TransformationFlow::from_script(&xml, Arc::clone(compiler.registry()), decoder, data_model)
                .with_context(|| format!("Failed to load script {}", script.display()))?
        }
        (None, None) => TransformationFlow::identity(decoder, data_model),
    };

    Ok(flow.with_options(create_flow_options(&config.pipeline)?))
}

pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
