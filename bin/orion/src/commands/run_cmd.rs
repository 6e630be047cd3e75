use orion_agent::Pipeline;
use orion_core::Paths;
use std::path::Path;

use super::{open_session, render};

/// Process one request through the conversation facade.
pub async fn run(paths: &Paths, text: &str) -> anyhow::Result<()> {
    let session = open_session(paths)?;
    let result = session.conversation.process(text).await;
    session.close();
    println!("{}", render::result(&result?));
    Ok(())
}

/// Execute every step of a pipeline file, stopping at the first failure.
pub async fn pipeline(paths: &Paths, file: &Path) -> anyhow::Result<()> {
    let pipeline = Pipeline::load(file)
        .map_err(|e| anyhow::anyhow!("Failed to load pipeline {}: {}", file.display(), e))?;
    let session = open_session(paths)?;

    println!();
    println!("Pipeline '{}' ({} steps)", pipeline.name, pipeline.plan.len());
    let outcomes = session.runner().execute(&pipeline.plan, session.context()).await;
    session.close();
    let outcomes = outcomes?;

    println!("{}", render::plan_outcomes(&pipeline.plan, &outcomes));
    let completed = outcomes.len() == pipeline.plan.len() && outcomes.iter().all(|o| o.is_success());
    if !completed {
        anyhow::bail!("Pipeline '{}' stopped before completing", pipeline.name);
    }
    Ok(())
}
