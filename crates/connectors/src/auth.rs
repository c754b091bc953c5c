use crate::error::SourceError;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A service-account credential as shipped by the warehouse/spreadsheet provider's
/// JSON key file. Parsing and signing are isolated behind this module so the
/// metadata map built elsewhere never carries the private key through the
/// unredacted logging path (design notes §9: credential handling).
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountCredential {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: chrono::DateTime<Utc>,
}

/// Caches one access token per scope (§4.1: "one token per scope: warehouse and
/// spreadsheet scopes are independent"), refreshing 60 seconds before expiry.
pub struct TokenCache {
    http: reqwest::Client,
    credential: ServiceAccountCredential,
    scope: String,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(http: reqwest::Client, credential: ServiceAccountCredential, scope: impl Into<String>) -> Self {
        Self {
            http,
            credential,
            scope: scope.into(),
            cached: RwLock::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String, SourceError> {
        let cutoff = Utc::now() + ChronoDuration::seconds(60);
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.expires_at > cutoff {
                return Ok(cached.access_token.clone());
            }
        }
        self.refresh().await
    }

    async fn refresh(&self) -> Result<String, SourceError> {
        let jwt = self.sign_jwt()?;
        let response = self
            .http
            .post(&self.credential.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::SourceUnavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(SourceError::PermissionDenied(
                "token exchange rejected by provider".into(),
            ));
        }
        if !response.status().is_success() {
            return Err(SourceError::SourceUnavailable(format!(
                "token exchange failed: HTTP {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::SourceUnavailable(e.to_string()))?;

        let expires_at = Utc::now() + ChronoDuration::seconds(body.expires_in);
        *self.cached.write().await = Some(CachedToken {
            access_token: body.access_token.clone(),
            expires_at,
        });
        Ok(body.access_token)
    }

    fn sign_jwt(&self) -> Result<String, SourceError> {
        let now = Utc::now();
        let claims = Claims {
            iss: self.credential.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.credential.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + ChronoDuration::minutes(60)).timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(self.credential.private_key.as_bytes())
            .map_err(|e| SourceError::PermissionDenied(format!("invalid service-account key: {e}")))?;
        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SourceError::PermissionDenied(format!("JWT signing failed: {e}")))
    }
}
