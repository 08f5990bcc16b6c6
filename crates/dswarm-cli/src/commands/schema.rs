use crate::cli::{InputFormat, ProgramArgs};
use crate::factories::{create_flow, read_file};
use anyhow::{Context, Result};
use dswarm_config::DswarmConfig;
use dswarm_core::{DiscardSink, TracingPublisher};
use dswarm_pipeline::{Task, TaskRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Attribute paths a run over `input` observes, in first-seen order
pub async fn schema(
    config: &DswarmConfig,
    program: &ProgramArgs,
    input: &Path,
    format: Option<InputFormat>,
) -> Result<Vec<Vec<String>>> {
    let text = read_file(input)?;
    let flow = create_flow(config, program, format, &text)?;
    let runner = TaskRunner::new(Arc::new(DiscardSink), Arc::new(TracingPublisher));

    let output = runner
        .run(Task::new(Arc::new(flow), text))
        .await
        .with_context(|| format!("Failed to run {}", input.display()))?;

    Ok(output
        .model
        .schema()
        .iter()
        .map(|path| path.attributes().to_vec())
        .collect())
}

pub async fn execute(
    config: DswarmConfig,
    program: ProgramArgs,
    input: PathBuf,
    format: Option<InputFormat>,
) -> Result<()> {
    for path in schema(&config, &program, &input, format).await? {
        println!("{}", path.join(" / "));
    }
    Ok(())
}
