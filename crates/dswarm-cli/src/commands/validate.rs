use crate::factories::read_file;
use anyhow::{bail, Result};
use dswarm_morph::MorphCompiler;
use std::path::PathBuf;

/// Every problem found in a job description
///
/// Structural problems are reported first. Function checks only run on a
/// job that is structurally sound.
pub fn issues(json: &str) -> Vec<String> {
    let compiler = MorphCompiler::default();
    match dswarm_core::job::load(json).and_then(|t| compiler.compile(&t)) {
        Ok(_) => Vec::new(),
        Err(e) => e.issues().iter().map(ToString::to_string).collect(),
    }
}

pub async fn execute(job: PathBuf) -> Result<()> {
    let json = read_file(&job)?;
    let issues = issues(&json);

    if issues.is_empty() {
        println!("{}: ok", job.display());
        return Ok(());
    }

    for issue in &issues {
        println!("{}: {}", job.display(), issue);
    }
    bail!("{} issue(s) found in {}", issues.len(), job.display())
}
