//! Keyring-based credential storage and session setup

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use keyring::Entry;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::content::WebApiClient;
use crate::content::auth::refresh_access_token;

const KEYRING_SERVICE: &str = "tunegrab";

/// Account credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub refresh_token: String,
    /// Loaded from the keyring, so rotated tokens are written back there
    pub from_keyring: bool,
}

/// Manages authentication credentials storage
pub struct AuthManager;

impl AuthManager {
    /// Prompt for missing credentials, verify them and store them
    ///
    /// Stored credentials are reused unless `force` is set.
    pub async fn authenticate(
        config: &Config,
        username: Option<String>,
        token: Option<String>,
        force: bool,
    ) -> Result<(Credentials, WebApiClient)> {
        if !force {
            if let Ok(creds) = Self::load() {
                info!("Found existing credentials in keyring");
                let client = Self::session(config, &creds).await?;
                return Ok((creds, client));
            }
        } else {
            debug!("Force flag set, ignoring stored credentials");
        }

        let username = match username {
            Some(u) => u,
            None => Input::new()
                .with_prompt("Username")
                .interact_text()
                .context("Failed to read username")?,
        };

        let refresh_token = match token {
            Some(t) => t,
            None => Password::new()
                .with_prompt("Refresh token")
                .interact()
                .context("Failed to read refresh token")?,
        };

        let mut creds = Credentials {
            username,
            refresh_token: refresh_token.trim().to_string(),
            from_keyring: false,
        };

        // Verify before storing
        let client = Self::session(config, &creds).await?;

        Self::store(&creds)?;
        creds.from_keyring = true;
        info!("Credentials stored in keyring");

        Ok((creds, client))
    }

    /// Credentials given on the command line or environment, else from the keyring
    pub fn resolve(username: Option<String>, token: Option<String>) -> Result<Credentials> {
        match (username, token) {
            (Some(username), Some(refresh_token)) => Ok(Credentials {
                username,
                refresh_token,
                from_keyring: false,
            }),
            _ => Self::load().map_err(|_| {
                anyhow::anyhow!("No credentials found. Run 'tunegrab auth' first to configure.")
            }),
        }
    }

    /// Load credentials from keyring
    pub fn load() -> Result<Credentials> {
        let username = Self::get_entry("username")?
            .get_password()
            .context("No username in keyring")?;

        let refresh_token = Self::get_entry("refresh_token")?
            .get_password()
            .context("No refresh token in keyring")?;

        Ok(Credentials {
            username,
            refresh_token,
            from_keyring: true,
        })
    }

    /// Store credentials in keyring
    pub fn store(creds: &Credentials) -> Result<()> {
        Self::get_entry("username")?
            .set_password(&creds.username)
            .context("Failed to store username in keyring")?;

        Self::get_entry("refresh_token")?
            .set_password(&creds.refresh_token)
            .context("Failed to store refresh token in keyring")?;

        debug!("Credentials stored in keyring");
        Ok(())
    }

    /// Clear stored credentials
    pub fn clear() -> Result<()> {
        let _ = Self::get_entry("username")?.delete_credential();
        let _ = Self::get_entry("refresh_token")?.delete_credential();
        info!("Credentials cleared from keyring");
        Ok(())
    }

    /// Trade the refresh token for an access token and build an API client
    pub async fn session(config: &Config, creds: &Credentials) -> Result<WebApiClient> {
        let client_id = config.client_id.as_deref().ok_or_else(|| {
            anyhow::anyhow!("No client_id configured. Set \"client_id\" in the config file.")
        })?;

        debug!("Opening session for {}", creds.username);
        let token = refresh_access_token(&config.accounts_url, client_id, &creds.refresh_token)
            .await
            .context("Failed to authenticate")?;

        if let Some(rotated) = token.refresh_token.as_deref() {
            if creds.from_keyring && rotated != creds.refresh_token {
                let updated = Credentials {
                    refresh_token: rotated.to_string(),
                    ..creds.clone()
                };
                if let Err(e) = Self::store(&updated) {
                    warn!("Could not store rotated refresh token: {:#}", e);
                }
            }
        }

        WebApiClient::new(
            &config.api_url,
            &token.access_token,
            &config.language,
            config.stream_endpoint.as_deref(),
        )
    }

    /// Get a keyring entry for a given key
    fn get_entry(key: &str) -> Result<Entry> {
        let entry_key = format!("account:{}", key);
        Entry::new(KEYRING_SERVICE, &entry_key).context("Failed to access keyring")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_credentials_skip_keyring() {
        let creds = AuthManager::resolve(Some("me".into()), Some("token".into())).unwrap();
        assert_eq!(creds.username, "me");
        assert_eq!(creds.refresh_token, "token");
        assert!(!creds.from_keyring);
    }

    #[tokio::test]
    async fn test_session_requires_client_id() {
        let creds = Credentials {
            username: "me".into(),
            refresh_token: "token".into(),
            from_keyring: false,
        };
        let err = AuthManager::session(&Config::default(), &creds)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("client_id"));
    }
}
