use crate::cli::{InputFormat, ProgramArgs};
use crate::factories::{create_flow, read_file};
use anyhow::{Context, Result};
use dswarm_config::DswarmConfig;
use dswarm_core::{DiscardSink, EventPublisher, GraphModel, GraphSink, TracingPublisher};
use dswarm_memorydb::{MemoryDb, MemoryDbSink};
use dswarm_pipeline::{Task, TaskRunner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// What a run produced
#[derive(Debug)]
pub struct RunOutput {
    /// Models of all inputs, merged in input order
    pub model: GraphModel,
    /// Predicates of the MemoryDb table, when the run stored its model
    pub schema: Option<Vec<String>>,
}

/// Run the program over every input, one task per input
pub async fn run(
    config: &DswarmConfig,
    program: &ProgramArgs,
    inputs: &[PathBuf],
    format: Option<InputFormat>,
    store: bool,
) -> Result<RunOutput> {
    let db = Arc::new(MemoryDb::new());
    let sink: Arc<dyn GraphSink> = if store {
        Arc::new(MemoryDbSink::new(
            Arc::clone(&db),
            config.memorydb.resource.as_str(),
            config.memorydb.configuration.as_str(),
        ))
    } else {
        Arc::new(DiscardSink)
    };
    let publisher: Arc<dyn EventPublisher> = Arc::new(TracingPublisher);
    let runner = TaskRunner::new(sink, Arc::clone(&publisher))
        .with_max_concurrent(config.pipeline.workers);

    let mut tasks = Vec::with_capacity(inputs.len());
    for path in inputs {
        let input = read_file(path)?;
        let flow = create_flow(config, program, format, &input)?
            .with_publisher(Arc::clone(&publisher));
        tasks.push(Task::new(Arc::new(flow), input).with_id(path.display().to_string()));
    }

    let mut model = GraphModel::new();
    for (path, result) in inputs.iter().zip(runner.run_all(tasks).await) {
        let output = result.with_context(|| format!("Failed to run {}", path.display()))?;
        model.merge(output.model);
    }

    let schema = store.then(|| {
        db.schema(&config.memorydb.resource, &config.memorydb.configuration)
            .into_iter()
            .collect()
    });

    Ok(RunOutput { model, schema })
}

pub async fn execute(
    config: DswarmConfig,
    program: ProgramArgs,
    inputs: Vec<PathBuf>,
    format: Option<InputFormat>,
    raw: bool,
    store: bool,
) -> Result<()> {
    let output = run(&config, &program, &inputs, format, store).await?;
    info!(
        inputs = inputs.len(),
        records = output.model.record_count(),
        statements = output.model.len(),
        "Run complete"
    );

    let json = if raw {
        output.model.to_raw_json()
    } else {
        output.model.to_json()
    };
    println!("{}", serde_json::to_string_pretty(&json)?);

    if let Some(schema) = output.schema {
        println!();
        println!(
            "Stored in MemoryDb {}/{} ({} predicates):",
            config.memorydb.resource,
            config.memorydb.configuration,
            schema.len()
        );
        for predicate in schema {
            println!("  {}", predicate);
        }
    }

    Ok(())
}
