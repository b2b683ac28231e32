use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::pipeline::RecipePublisher;

/// Mealie REST client.
pub struct MealieClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Deserialize)]
struct TagPage {
    items: Vec<Tag>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipeGroup {
    group_id: Option<String>,
}

impl MealieClient {
    pub fn new(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /api/organizers/tags?perPage=-1: every tag on the server.
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let page: TagPage = self
            .client
            .get(self.url("/api/organizers/tags"))
            .query(&[("perPage", "-1")])
            .bearer_auth(&self.token)
            .send()
            .await
            .context("GET /api/organizers/tags")?
            .error_for_status()
            .context("GET /api/organizers/tags status")?
            .json()
            .await
            .context("parsing tag list")?;
        Ok(page.items)
    }

    /// POST /api/organizers/tags
    pub async fn create_tag(&self, name: &str) -> Result<Tag> {
        let tag: Tag = self
            .client
            .post(self.url("/api/organizers/tags"))
            .bearer_auth(&self.token)
            .json(&json!({ "name": name, "slug": tag_slug(name) }))
            .send()
            .await
            .context("POST /api/organizers/tags")?
            .error_for_status()
            .with_context(|| format!("creating tag {name}"))?
            .json()
            .await
            .context("parsing created tag")?;
        info!("created tag {name}");
        Ok(tag)
    }

    /// Existing tags for `names`, matched case-insensitively, creating any
    /// that are missing. Order follows `names`.
    pub async fn resolve_tags(&self, names: &[String]) -> Result<Vec<Tag>> {
        let mut known = self.list_tags().await?;
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            let found = known
                .iter()
                .find(|t| t.name.to_lowercase() == name.to_lowercase())
                .cloned();
            let tag = match found {
                Some(t) => t,
                None => {
                    let t = self.create_tag(name).await?;
                    known.push(t.clone());
                    t
                }
            };
            resolved.push(tag);
        }
        Ok(resolved)
    }

    async fn group_id(&self, slug: &str) -> Result<String> {
        let path = format!("/api/recipes/{}", urlencoding::encode(slug));
        let recipe: RecipeGroup = self
            .client
            .get(self.url(&path))
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("GET {path}"))?
            .error_for_status()
            .with_context(|| format!("GET {path} status"))?
            .json()
            .await
            .context("parsing recipe")?;
        recipe
            .group_id
            .filter(|g| !g.is_empty())
            .ok_or_else(|| anyhow!("recipe {slug} has no groupId"))
    }
}

#[async_trait]
impl RecipePublisher for MealieClient {
    /// POST /api/recipes/create/html-or-json: returns the new recipe's slug.
    async fn publish(&self, recipe: &Value) -> Result<String> {
        let data = serde_json::to_string(recipe)?;
        let created: Value = self
            .client
            .post(self.url("/api/recipes/create/html-or-json"))
            .bearer_auth(&self.token)
            .json(&json!({ "includeTags": true, "data": data }))
            .send()
            .await
            .context("POST /api/recipes/create/html-or-json")?
            .error_for_status()
            .context("POST /api/recipes/create/html-or-json status")?
            .json()
            .await
            .context("parsing create response")?;
        created
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("unexpected create response: {created}"))
    }

    /// PATCH /api/recipes/<slug>: replace the recipe's tags.
    async fn tag(&self, slug: &str, tags: &[String]) -> Result<()> {
        let group_id = self.group_id(slug).await?;
        let tags = self.resolve_tags(tags).await?;
        let path = format!("/api/recipes/{}", urlencoding::encode(slug));
        self.client
            .patch(self.url(&path))
            .bearer_auth(&self.token)
            .json(&json!({ "groupId": group_id, "tags": tags }))
            .send()
            .await
            .with_context(|| format!("PATCH {path}"))?
            .error_for_status()
            .with_context(|| format!("PATCH {path} status"))?;
        info!("tagged {slug} with {} tags", tags.len());
        Ok(())
    }
}

/// Lowercase with whitespace runs replaced by `-`.
fn tag_slug(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}
