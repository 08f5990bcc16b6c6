use crate::factories::read_file;
use anyhow::{Context, Result};
use dswarm_morph::MorphCompiler;
use std::path::{Path, PathBuf};
use tracing::info;

/// Compile the job at `job` into a morph document
pub fn compile(job: &Path) -> Result<String> {
    let json = read_file(job)?;
    let transformation = dswarm_core::job::load(&json)
        .with_context(|| format!("Failed to load job {}", job.display()))?;
    MorphCompiler::default()
        .compile_to_xml(&transformation)
        .with_context(|| format!("Failed to compile job {}", job.display()))
}

pub async fn execute(job: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let xml = compile(&job)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &xml)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(job = %job.display(), output = %path.display(), "Wrote morph document");
        }
        None => println!("{}", xml),
    }

    Ok(())
}
