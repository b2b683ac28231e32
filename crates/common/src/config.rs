use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub mealie: MealieConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Root folder of the walk.
    #[serde(default)]
    pub folder_id: String,

    /// Tag every recipe with the root folder's own name as well.
    #[serde(default)]
    pub include_root_folder_as_tag: bool,

    /// `authorized_user` JSON holding a refresh token.
    #[serde(default = "default_token_file")]
    pub token_file: String,

    /// Pre-issued access token; skips the refresh exchange when set.
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_drive_api_base")]
    pub api_base: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            folder_id: String::new(),
            include_root_folder_as_tag: false,
            token_file: default_token_file(),
            access_token: None,
            api_base: default_drive_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// When set, every converted recipe is also written here as JSON.
    #[serde(default)]
    pub output_dir: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            base_url: default_openai_base_url(),
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealieConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Regexes matched against `"<target>: <message>"`; matching events are dropped.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Directory for `combined.log`. Console only when unset.
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_token_file() -> String {
    "google-token.json".into()
}

fn default_drive_api_base() -> String {
    "https://www.googleapis.com/drive/v3".into()
}

fn default_model() -> String {
    "gpt-3.5-turbo".into()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_max_attempts() -> u32 { 3 }
fn default_base_delay_ms() -> u64 { 1000 }

/// `$XDG_CONFIG_HOME/recipe-import/config.toml`, falling back to `~/.config`.
pub fn default_config_path() -> String {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("recipe-import")
        .join("config.toml")
        .to_string_lossy()
        .into_owned()
}

pub fn parse_import_config(s: &str) -> Result<ImportConfig> {
    toml::from_str(s).context("parsing import config")
}

/// `"true"` in any case, or `"1"`.
pub fn str_to_bool(s: &str) -> bool {
    s.eq_ignore_ascii_case("true") || s == "1"
}

impl ImportConfig {
    /// Overlay the environment variables the importer has always honoured.
    /// `lookup` is `std::env::var(..).ok()` outside of tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GOOGLE_DRIVE_FOLDER_ID") {
            self.drive.folder_id = v;
        }
        if let Some(v) = lookup("INCLUDE_ROOT_FOLDER_AS_TAG") {
            self.drive.include_root_folder_as_tag = str_to_bool(&v);
        }
        if let Some(v) = lookup("GOOGLE_DRIVE_TOKEN_FILE") {
            self.drive.token_file = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = v;
        }
        if let Some(v) = lookup("MEALIE_API_URL") {
            self.mealie.url = v;
        }
        if let Some(v) = lookup("MEALIE_API_KEY") {
            self.mealie.token = v;
        }
    }

    /// Check the values needed for a full import. `needs_publish` is false for
    /// dry runs, which never talk to OpenAI or Mealie.
    pub fn validate(&self, needs_publish: bool) -> Result<()> {
        let mut missing = Vec::new();
        if self.drive.folder_id.trim().is_empty() {
            missing.push("drive.folder_id (GOOGLE_DRIVE_FOLDER_ID)");
        }
        if needs_publish {
            if self.openai.api_key.trim().is_empty() {
                missing.push("openai.api_key (OPENAI_API_KEY)");
            }
            if self.mealie.url.trim().is_empty() {
                missing.push("mealie.url (MEALIE_API_URL)");
            }
            if self.mealie.token.trim().is_empty() {
                missing.push("mealie.token (MEALIE_API_KEY)");
            }
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if !missing.is_empty() {
            bail!("missing required settings: {}", missing.join(", "));
        }
        Ok(())
    }
}
