use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use recipe_common::config::OpenAiConfig;

use crate::pipeline::RecipeConverter;

const SYSTEM_PROMPT: &str =
    "You are a recipe parser that converts recipe text to schema.org/Recipe JSON format.";

/// Chat-completion backed [`RecipeConverter`].
pub struct OpenAiConverter {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    output_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiConverter {
    pub fn new(client: Client, cfg: &OpenAiConfig) -> Self {
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            output_dir: cfg.output_dir.as_ref().map(PathBuf::from),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let req = ChatRequest {
            model: &self.model,
            messages: [
                Message { role: "system", content: SYSTEM_PROMPT },
                Message { role: "user", content: prompt },
            ],
            temperature: self.temperature,
        };
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("POST /chat/completions")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("OpenAI API error {status}: {body}");
        }
        let parsed: ChatResponse = resp.json().await.context("parsing chat completion")?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat completion had no content"))
    }

    async fn save(&self, dir: &std::path::Path, recipe: &Value) -> Result<PathBuf> {
        let path = dir.join(format!("{}.json", slugify(recipe_name(recipe))));
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        let pretty = serde_json::to_string_pretty(recipe)?;
        tokio::fs::write(&path, pretty)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

#[async_trait]
impl RecipeConverter for OpenAiConverter {
    async fn convert(&self, text: &str, tags: &[String]) -> Result<Value> {
        let content = self.complete(&build_prompt(text, tags)).await?;
        let recipe = parse_recipe_json(&content)?;
        let name = recipe_name(&recipe);
        debug!("converted recipe {name:?}");
        if let Some(dir) = &self.output_dir {
            let path = self.save(dir, &recipe).await?;
            info!("wrote {}", path.display());
        }
        Ok(recipe)
    }
}

pub fn build_prompt(text: &str, tags: &[String]) -> String {
    format!(
        "Convert this recipe text into a JSON format following the schema.org/Recipe standard.\n\
         Include the following tags: {}\n\
         \n\
         Recipe text:\n\
         {text}\n\
         \n\
         Return only the JSON with no other text.",
        tags.join(", ")
    )
}

/// Parse the model's reply as a JSON object, tolerating a Markdown code fence
/// around it.
pub fn parse_recipe_json(content: &str) -> Result<Value> {
    let body = strip_code_fence(content.trim());
    let value: Value = serde_json::from_str(body).context("model reply is not valid JSON")?;
    if !value.is_object() {
        bail!("model reply is JSON but not an object");
    }
    Ok(value)
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the info string ("json") up to the first newline.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// The recipe's `name`, or `"recipe"` when the model left it out.
fn recipe_name(recipe: &Value) -> &str {
    recipe.get("name").and_then(Value::as_str).unwrap_or("recipe")
}

/// Lowercase, with every character outside `[a-z0-9]` replaced by `-`.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect()
}
