//! Delegated token verification.
//!
//! The gateway holds no signing secret and never decodes a token itself:
//! every bearer token is sent to the auth collaborator for verification.
//! Anything other than a positive answer within the deadline is Invalid.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use common::UserId;
use reservation::ReservationJournal;
use serde::Deserialize;
use stock_ledger::StockLedger;

use crate::error::GatewayError;
use crate::invoice::InvoiceGenerator;
use crate::state::AppState;

/// Trait for token verifier implementations.
///
/// `None` means Invalid, uniformly covering a malformed token, an expired
/// one, an unknown subject, and a verifier that is unreachable or answering
/// non-200. Causes are logged, not propagated.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Turns a bearer token into a user identity, or nothing.
    async fn verify(&self, token: &str) -> Option<UserId>;
}

/// Token verifier that delegates to the auth collaborator over HTTP.
#[derive(Clone)]
pub struct AuthServiceVerifier {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct VerifyResponse {
    user_id: i64,
}

impl AuthServiceVerifier {
    /// Creates a verifier for the given auth service base URL.
    ///
    /// The timeout must be short: a slow verifier degrades to fast
    /// rejection rather than hanging the gateway.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl TokenVerifier for AuthServiceVerifier {
    async fn verify(&self, token: &str) -> Option<UserId> {
        let url = format!("{}/api/verify", self.base_url.trim_end_matches('/'));
        let response = match self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "access": token }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "token verify request failed");
                return None;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            tracing::warn!(status = %response.status(), "token verify rejected");
            return None;
        }

        match response.json::<VerifyResponse>().await {
            Ok(body) => Some(UserId::new(body.user_id)),
            Err(err) => {
                tracing::warn!(error = %err, "token verify response malformed");
                None
            }
        }
    }
}

/// In-memory token verifier for testing.
#[derive(Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: Arc<RwLock<HashMap<String, UserId>>>,
}

impl StaticTokenVerifier {
    /// Creates a verifier that accepts no tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token as valid for the given user.
    pub fn insert(&self, token: impl Into<String>, user_id: UserId) {
        self.tokens.write().unwrap().insert(token.into(), user_id);
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Option<UserId> {
        self.tokens.read().unwrap().get(token).copied()
    }
}

/// The authenticated caller of a protected route.
///
/// Extracted per request by asking the verifier; the user id is then a
/// plain value passed into handlers rather than ambient request state.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    if token.is_empty() { None } else { Some(token) }
}

impl<L, J, V, G> FromRequestParts<Arc<AppState<L, J, V, G>>> for AuthenticatedUser
where
    L: StockLedger + 'static,
    J: ReservationJournal + 'static,
    V: TokenVerifier + 'static,
    G: InvoiceGenerator + 'static,
{
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<L, J, V, G>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(GatewayError::InvalidToken)?;
        match state.verifier.verify(token).await {
            Some(user_id) => Ok(AuthenticatedUser(user_id)),
            None => {
                metrics::counter!("auth_rejected_total").increment(1);
                Err(GatewayError::InvalidToken)
            }
        }
    }
}
