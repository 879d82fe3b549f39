//! Bearer-token authentication.
//!
//! Token issuance lives outside this service. Handlers only see the decoded
//! [`Identity`] produced by an [`IdentityVerifier`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::UserId;
use domain::UserRole;
use store::MarketplaceStore;

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: UserId,
    pub roles: Vec<UserRole>,
}

/// Turns a bearer token into an identity.
pub trait IdentityVerifier: Send + Sync {
    /// Returns None when the token is not accepted.
    fn verify(&self, token: &str) -> Option<Identity>;
}

/// Verifier backed by a fixed token table, for development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as `identity`.
    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    /// Parses `token=user-uuid:ROLE+ROLE;...`. Empty entries are ignored.
    pub fn parse(table: &str) -> Result<Self, ConfigError> {
        let mut verifier = Self::new();

        for entry in table.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = |reason: &str| ConfigError::InvalidToken {
                entry: entry.to_string(),
                reason: reason.to_string(),
            };

            let (token, rest) = entry
                .split_once('=')
                .ok_or_else(|| invalid("expected token=user:ROLES"))?;
            let (user, roles) = rest.split_once(':').unwrap_or((rest, ""));

            let user = UserId::parse(user.trim()).map_err(|e| invalid(&e.to_string()))?;
            let roles = roles
                .split('+')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(|r| r.parse::<UserRole>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| invalid(&e))?;

            verifier = verifier.with_token(token.trim(), Identity { user, roles });
        }

        Ok(verifier)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl IdentityVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).cloned()
    }
}

/// Extractor for routes that require a bearer token.
///
/// Missing or malformed `Authorization` header → 401; token rejected by the
/// verifier → 403.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl<S: MarketplaceStore> FromRequestParts<Arc<AppState<S>>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Token no proporcionado.".to_string()))?;

        let identity = state
            .verifier
            .verify(token)
            .ok_or_else(|| ApiError::Forbidden("Token inválido.".to_string()))?;

        Ok(Authenticated(identity))
    }
}
