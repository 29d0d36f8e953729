//! Client for the remote track search API.
//!
//! Searches are authenticated with an app-level token from the
//! client-credentials flow. The token is kept in memory and in the database,
//! and only requested again once it is about to expire.

use crate::database::{DbError, StoredToken, TokenDb};
use serde::Deserialize;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Tokens this close to expiry are treated as expired.
const TOKEN_MARGIN: Duration = Duration::seconds(30);

pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("no search API credentials configured")]
    NoCredentials,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} endpoint answered {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("token cache: {0}")]
    Db(#[from] DbError),
    #[error("token lifetime out of range: {expires_in} seconds")]
    Lifetime { expires_in: i64 },
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

fn expiry(now: OffsetDateTime, expires_in: i64) -> Result<OffsetDateTime, UpstreamError> {
    now.checked_add(Duration::seconds(expires_in))
        .ok_or(UpstreamError::Lifetime { expires_in })
}

pub struct Upstream {
    http: reqwest::Client,
    credentials: Option<Credentials>,
    token_url: String,
    search_url: String,
    db: TokenDb,
    // Also serializes refreshes, so concurrent searches fetch one token.
    token: Mutex<Option<StoredToken>>,
}

impl Upstream {
    pub fn new(
        http: reqwest::Client,
        credentials: Option<Credentials>,
        db: TokenDb,
        token_url: String,
        search_url: String,
    ) -> Self {
        Self {
            http,
            credentials,
            token_url,
            search_url,
            db,
            token: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String, UpstreamError> {
        let mut cached = self.token.lock().await;
        let now = OffsetDateTime::now_utc();
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now, TOKEN_MARGIN) {
                return Ok(token.access_token.clone());
            }
        }
        if let Some(token) = self.db.get()? {
            if token.is_fresh(now, TOKEN_MARGIN) {
                debug!(message = "using token from database", expires_at = %token.expires_at);
                let access_token = token.access_token.clone();
                *cached = Some(token);
                return Ok(access_token);
            }
        }

        let token = self.request_token(now).await?;
        info!(message = "fetched search API token", expires_at = %token.expires_at);
        self.db.put(&token)?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn request_token(&self, now: OffsetDateTime) -> Result<StoredToken, UpstreamError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(UpstreamError::NoCredentials)?;
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                endpoint: "token",
                status,
            });
        }
        let body: TokenResponse = response.json().await?;
        Ok(StoredToken {
            expires_at: expiry(now, body.expires_in)?,
            access_token: body.access_token,
        })
    }

    /// Runs a track search and returns the upstream JSON untouched.
    pub async fn search(&self, query: &str) -> Result<serde_json::Value, UpstreamError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(&self.search_url)
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", "50")])
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // revoked early; make the next search fetch a new one
            *self.token.lock().await = None;
            self.db.clear()?;
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                endpoint: "search",
                status,
            });
        }
        Ok(response.json().await?)
    }
}
