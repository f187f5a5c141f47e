//! `build` command: build components in dependency order

use anyhow::{Context, Result};
use serde_json::json;

use super::GlobalOptions;
use crate::cli::output::status;
use crate::core::builder::{BuildMode, BuildOutcome, Builder};

/// Build the selected components
pub async fn execute(options: &GlobalOptions, components: &[String], missing: bool) -> Result<()> {
    let (config, registry) = options.load()?;
    tracing::info!(
        "Building for {} on {}",
        config.architectures.join(", "),
        config.platform
    );

    let builder = Builder::new(config, registry).quiet(!options.output.shows_progress());
    let outcomes = builder
        .build(components, missing)
        .await
        .context("Build failed")?;

    if options.output.json {
        let summary: Vec<_> = outcomes.iter().map(outcome_json).collect();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if options.output.shows_progress() {
        println!("{} Build complete!", status::SUCCESS);
        println!("  Components built: {}", outcomes.len());
        let merged: usize = outcomes
            .iter()
            .filter_map(|o| o.merge.as_ref())
            .map(|m| m.universalized.len())
            .sum();
        if merged > 0 {
            println!("  Files universalized: {merged}");
        }
    }
    Ok(())
}

fn outcome_json(outcome: &BuildOutcome) -> serde_json::Value {
    let mode = match outcome.mode {
        BuildMode::SinglePass => "single-pass",
        BuildMode::PerArchitecture => "per-architecture",
    };
    let universalized: Vec<_> = outcome
        .merge
        .iter()
        .flat_map(|m| m.universalized.iter())
        .map(|(path, by)| json!({ "path": path, "universalizer": by }))
        .collect();
    json!({
        "component": outcome.component,
        "mode": mode,
        "universalized": universalized,
    })
}
