//! Input files for the CLI: document specs to load into the sandbox and
//! scripted improvement projects. Both parse from YAML or JSON, decided by
//! file extension.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use improve_loop::GeneratedFile;
use page_model::DocumentSpec;

/// A scripted improvement project: the app being improved plus the change
/// requests the generation script replays in order.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectSpec {
    pub name: Option<String>,
    /// Document shown in the sandbox preview; the built-in demo when absent.
    pub document: Option<DocumentSpec>,
    /// Generated app files handed to the generation service as context.
    pub files: Vec<GeneratedFile>,
    /// Change requests, consumed one per cycle.
    pub requests: Vec<String>,
}

pub async fn load_project(path: &Path) -> Result<ProjectSpec> {
    let content = read(path).await?;
    parse(path, &content)
        .with_context(|| format!("failed to parse project file {}", path.display()))
}

pub async fn load_document(path: &Path) -> Result<DocumentSpec> {
    let content = read(path).await?;
    parse(path, &content)
        .with_context(|| format!("failed to parse document spec {}", path.display()))
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn parse<T: for<'de> Deserialize<'de>>(path: &Path, content: &str) -> Result<T> {
    let json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(serde_yaml::from_str(content)?)
    }
}
