use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use recipe_common::config::DriveConfig;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Bearer token for Drive requests.
#[derive(Clone)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into() }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").field("access_token", &"<redacted>").finish()
    }
}

/// Saved `authorized_user` credentials, as written by Google's client libraries.
#[derive(Debug, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Obtain a Drive credential from configuration: the configured access token
/// if there is one, otherwise a refresh of the saved token file.
pub async fn authenticate(http: &Client, cfg: &DriveConfig) -> Result<Credential> {
    if let Some(token) = cfg.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
        info!("using configured Drive access token");
        return Ok(Credential::new(token));
    }

    let user = read_token_file(&cfg.token_file).await?;
    let credential = refresh_access_token(http, GOOGLE_TOKEN_URL, &user).await?;
    info!("refreshed Drive access token from {}", cfg.token_file);
    Ok(credential)
}

pub async fn read_token_file(path: &str) -> Result<AuthorizedUser> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading Google token file {path}"))?;
    let user: AuthorizedUser = serde_json::from_str(&raw)
        .with_context(|| format!("parsing Google token file {path}"))?;
    if user.refresh_token.trim().is_empty() {
        bail!("Google token file {path} has no refresh_token");
    }
    Ok(user)
}

/// Exchange a refresh token for an access token.
pub async fn refresh_access_token(
    http: &Client,
    token_url: &str,
    user: &AuthorizedUser,
) -> Result<Credential> {
    let resp: TokenResponse = http
        .post(token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", user.client_id.as_str()),
            ("client_secret", user.client_secret.as_str()),
            ("refresh_token", user.refresh_token.as_str()),
        ])
        .send()
        .await
        .context("POST token endpoint")?
        .error_for_status()
        .context("refreshing Google access token")?
        .json()
        .await
        .context("parsing token response")?;
    Ok(Credential::new(resp.access_token))
}
