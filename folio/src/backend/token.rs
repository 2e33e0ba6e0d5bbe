//! Bearer tokens for the engine connection.
//!
//! Three modes: no auth, a fixed token, or OAuth2 client credentials with
//! the token cached until shortly before it expires.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::AuthConfig;
use crate::error::{Error, Result};

pub struct TokenProvider {
    mode: Mode,
    cache: Mutex<Option<CachedToken>>,
}

enum Mode {
    None,
    Fixed(String),
    ClientCredentials(ClientCredentials),
}

struct ClientCredentials {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_slack: Duration,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

impl TokenProvider {
    pub fn none() -> Self {
        Self {
            mode: Mode::None,
            cache: Mutex::new(None),
        }
    }

    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            mode: Mode::Fixed(token.into()),
            cache: Mutex::new(None),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Result<Self> {
        match auth.mode.as_str() {
            "none" => Ok(Self::none()),
            "static" => {
                let token = auth.resolved_static_token();
                if token.is_empty() {
                    return Err(Error::Auth(
                        "static auth mode needs static_token or FOLIO_BEARER_TOKEN".to_string(),
                    ));
                }
                Ok(Self::fixed(token))
            }
            "client_credentials" => {
                if auth.token_url.is_empty() || auth.client_id.is_empty() {
                    return Err(Error::Auth(
                        "client_credentials auth mode needs token_url and client_id".to_string(),
                    ));
                }
                Ok(Self {
                    mode: Mode::ClientCredentials(ClientCredentials {
                        client: reqwest::Client::new(),
                        token_url: auth.token_url.clone(),
                        client_id: auth.client_id.clone(),
                        client_secret: auth.resolved_client_secret(),
                        refresh_slack: Duration::from_secs(auth.refresh_slack_secs),
                    }),
                    cache: Mutex::new(None),
                })
            }
            other => Err(Error::Auth(format!("unknown auth mode '{other}'"))),
        }
    }

    /// The token to attach, if any. Client-credentials tokens are fetched
    /// lazily and reused until they run into the refresh slack.
    pub async fn bearer(&self) -> Result<Option<String>> {
        let creds = match &self.mode {
            Mode::None => return Ok(None),
            Mode::Fixed(token) => return Ok(Some(token.clone())),
            Mode::ClientCredentials(creds) => creds,
        };

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(Some(cached.token.clone()));
            }
            tracing::debug!("cached backend token expired, refreshing");
        }
        let fresh = fetch(creds).await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(Some(token))
    }
}

async fn fetch(creds: &ClientCredentials) -> Result<CachedToken> {
    let response = creds
        .client
        .post(&creds.token_url)
        .basic_auth(&creds.client_id, Some(&creds.client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Auth(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let token: TokenResponse = response.json().await?;
    let lifetime = Duration::from_secs(token.expires_in).saturating_sub(creds.refresh_slack);
    Ok(CachedToken {
        token: token.access_token,
        expires_at: Instant::now() + lifetime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn none_mode_attaches_nothing() {
        let provider = TokenProvider::from_config(&AuthConfig::default()).unwrap();
        assert_eq!(provider.bearer().await.unwrap(), None);
    }

    #[tokio::test]
    async fn fixed_tokens_are_returned_verbatim() {
        let provider = TokenProvider::fixed("sesame");
        assert_eq!(provider.bearer().await.unwrap(), Some("sesame".to_string()));
    }

    #[test]
    fn static_mode_without_a_token_is_rejected() {
        let auth = AuthConfig {
            mode: "static".to_string(),
            ..AuthConfig::default()
        };
        assert!(matches!(
            TokenProvider::from_config(&auth),
            Err(Error::Auth(_))
        ));
    }

    #[test]
    fn client_credentials_needs_endpoint_and_id() {
        let auth = AuthConfig {
            mode: "client_credentials".to_string(),
            ..AuthConfig::default()
        };
        assert!(matches!(
            TokenProvider::from_config(&auth),
            Err(Error::Auth(_))
        ));
    }

    #[test]
    fn unknown_modes_are_rejected() {
        let auth = AuthConfig {
            mode: "kerberos".to_string(),
            ..AuthConfig::default()
        };
        assert!(matches!(
            TokenProvider::from_config(&auth),
            Err(Error::Auth(_))
        ));
    }
}
