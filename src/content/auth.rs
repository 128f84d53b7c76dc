//! Access token exchange
//!
//! The web API is authorized with short-lived bearer tokens. A long-lived
//! refresh token (stored in the keyring) is traded for one at startup using the
//! OAuth refresh-token grant.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Default web API base URL
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// Default accounts service base URL
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
    /// Present when the service rotates the refresh token
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Form parameters for the refresh-token grant
fn refresh_params<'a>(client_id: &'a str, refresh_token: &'a str) -> Vec<(&'static str, &'a str)> {
    vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", client_id),
    ]
}

/// Exchange a refresh token for an access token
pub async fn refresh_access_token(
    accounts_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<AccessToken> {
    let url = format!("{}/api/token", accounts_url.trim_end_matches('/'));
    debug!("Requesting access token from {}", url);

    let response = reqwest::Client::new()
        .post(&url)
        .form(&refresh_params(client_id, refresh_token))
        .send()
        .await
        .context("Failed to reach the accounts service")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Error fetching token: {}, {}", status, body);
    }

    let token: AccessToken = response
        .json()
        .await
        .context("Failed to parse token response")?;

    debug!("Access token valid for {}s", token.expires_in);
    Ok(token)
}
