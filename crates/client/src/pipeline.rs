use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use recipe_common::api::RecipeRecord;
use recipe_common::retry::{with_retry, RetryPolicy};

/// Turns extracted recipe text into a schema.org/Recipe document.
#[async_trait]
pub trait RecipeConverter: Send + Sync {
    async fn convert(&self, text: &str, tags: &[String]) -> Result<Value>;
}

/// Target recipe store.
#[async_trait]
pub trait RecipePublisher: Send + Sync {
    /// Create the recipe, returning its slug.
    async fn publish(&self, recipe: &Value) -> Result<String>;
    async fn tag(&self, slug: &str, tags: &[String]) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
}

/// Convert, publish and tag every record. A record that fails after its
/// retries are used up is logged and counted; the rest still run.
pub async fn run_import(
    records: &[RecipeRecord],
    converter: &dyn RecipeConverter,
    publisher: &dyn RecipePublisher,
    policy: &RetryPolicy,
) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for record in records {
        match import_one(record, converter, publisher, policy).await {
            Ok(slug) => {
                info!("imported {} as {slug}", record.name);
                summary.imported += 1;
            }
            Err(e) => {
                error!("failed to import {}: {e:#}", record.name);
                summary.failed += 1;
            }
        }
    }
    info!(
        "import finished: {} imported, {} failed",
        summary.imported, summary.failed
    );
    summary
}

async fn import_one(
    record: &RecipeRecord,
    converter: &dyn RecipeConverter,
    publisher: &dyn RecipePublisher,
    policy: &RetryPolicy,
) -> Result<String> {
    let what = format!("convert {}", record.name);
    let recipe = with_retry(policy, &what, || converter.convert(&record.content, &record.tags)).await?;

    let what = format!("publish {}", record.name);
    let slug = with_retry(policy, &what, || publisher.publish(&recipe)).await?;

    if !record.tags.is_empty() {
        let what = format!("tag {slug}");
        with_retry(policy, &what, || publisher.tag(&slug, &record.tags)).await?;
    }
    Ok(slug)
}
