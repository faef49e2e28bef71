use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Identity returned by the external provider for a verified credential.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Verifies bearer credentials against the identity provider. Stateless;
/// every mutating call re-verifies.
#[derive(Clone)]
pub struct AuthGuard {
    http: reqwest::Client,
    user_endpoint: String,
    api_key: String,
}

impl AuthGuard {
    pub fn new(auth_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            user_endpoint: format!("{}/auth/v1/user", auth_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    pub async fn verify(&self, headers: &HeaderMap) -> ApiResult<AuthUser> {
        let token = bearer_token(headers)
            .ok_or_else(|| ApiError::unauthenticated("authentication required"))?;

        let response = self
            .http
            .get(&self.user_endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|err| {
                ApiError::unauthenticated(format!("identity provider unreachable: {err}"))
            })?;

        if !response.status().is_success() {
            return Err(ApiError::unauthenticated(provider_message(response).await));
        }

        response
            .json::<AuthUser>()
            .await
            .map_err(|err| ApiError::unauthenticated(format!("malformed identity response: {err}")))
    }
}

/// Extracts the token from an `Authorization: Bearer …` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}

async fn provider_message(response: reqwest::Response) -> String {
    let fallback = "invalid or expired session".to_string();
    match response.json::<serde_json::Value>().await {
        Ok(body) => body
            .get("message")
            .or_else(|| body.get("msg"))
            .or_else(|| body.get("error_description"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or(fallback),
        Err(_) => fallback,
    }
}
