use anyhow::{Context, Result};
use instrument::{ContributorSource, GitBlameSource, NoContributors};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

pub async fn run(
    path: PathBuf,
    project_id: String,
    output: Option<PathBuf>,
    upload: Option<String>,
    no_blame: bool,
) -> Result<()> {
    let contributors: Box<dyn ContributorSource> = if no_blame {
        Box::new(NoContributors)
    } else {
        match GitBlameSource::discover(&path) {
            Some(source) => Box::new(source),
            None => {
                warn!("Not a git repository; skipping contributor attribution");
                Box::new(NoContributors)
            }
        }
    };

    let inventory = instrument::run_census(&path, &project_id, contributors.as_ref())?;
    info!(
        "Collected {} functions for project \"{project_id}\"",
        inventory.functions.len()
    );

    match output {
        Some(file) => {
            fs::write(&file, serde_json::to_string_pretty(&inventory)?)?;
            info!("Wrote inventory to {}", file.display());
        }
        None if upload.is_none() => {
            println!("{}", serde_json::to_string_pretty(&inventory)?);
        }
        None => {}
    }

    if let Some(base_url) = upload {
        let url = format!(
            "{}/api/projects/{project_id}/inventory",
            base_url.trim_end_matches('/')
        );
        let response = reqwest::Client::new()
            .post(&url)
            .json(&inventory)
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;
        if response.status().is_success() {
            info!("Uploaded inventory to {url}");
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Inventory upload rejected ({status}): {body}");
        }
    }

    Ok(())
}
