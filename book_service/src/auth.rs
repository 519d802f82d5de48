//! Bearer token authentication and the role check guarding write endpoints.
//!
//! Token validation itself is delegated to a [`TokenVerifier`], the handlers only see
//! the resulting [`Principal`].

use std::collections::HashMap;
use std::sync::Arc;

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest};
use anyhow::Context;
use paperclip::actix::Apiv2Security;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;
use serde::Deserialize;

use crate::error::ApiError;

pub const MANAGE_BOOKS: &str = "manage_books";

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(name: &str, roles: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|granted| granted == role)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Bearer token is missing")]
    MissingToken,

    #[error("Bearer token is invalid: {0}")]
    InvalidToken(String),

    #[error("User {0} lacks role {1}")]
    MissingRole(String, String),

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Validates the token and returns the identity it was issued for
    async fn verify(&self, bearer_token: &str) -> Result<Principal, AuthError>;
}

/// Verifier with a fixed set of known tokens
#[derive(Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenVerifier {
    pub fn with_token(mut self, token: &str, principal: Principal) -> Self {
        self.tokens.insert(token.to_string(), principal);
        self
    }
}

#[async_trait::async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<Principal, AuthError> {
        self.tokens
            .get(bearer_token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string()))
    }
}

pub struct KeycloakTokenVerifierConfig {
    pub keycloak_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Asks Keycloak token introspection endpoint about every token
pub struct KeycloakTokenVerifier {
    introspection_url: String,
    client_id: String,
    client_secret: String,
    client: ClientWithMiddleware,
}

#[derive(Debug, Default, Deserialize)]
struct RoleSet {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    active: bool,
    preferred_username: Option<String>,
    sub: Option<String>,
    #[serde(default)]
    realm_access: RoleSet,
    #[serde(default)]
    resource_access: HashMap<String, RoleSet>,
}

impl KeycloakTokenVerifier {
    pub fn new(config: KeycloakTokenVerifierConfig) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            introspection_url: format!(
                "{}/realms/{}/protocol/openid-connect/token/introspect",
                config.keycloak_url.trim_end_matches('/'),
                config.realm
            ),
            client_id: config.client_id,
            client_secret: config.client_secret,
            client,
        })
    }

    fn principal_from(&self, response: IntrospectionResponse) -> Result<Principal, AuthError> {
        if !response.active {
            return Err(AuthError::InvalidToken("token is not active".to_string()));
        }
        let name = response
            .preferred_username
            .or(response.sub)
            .ok_or_else(|| AuthError::InvalidToken("token has no subject".to_string()))?;

        let mut roles = response.realm_access.roles;
        if let Some(client_roles) = response.resource_access.get(&self.client_id) {
            roles.extend(client_roles.roles.iter().cloned());
        }
        Ok(Principal { name, roles })
    }
}

#[async_trait::async_trait]
impl TokenVerifier for KeycloakTokenVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<Principal, AuthError> {
        let response = self
            .client
            .post(&self.introspection_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", bearer_token)])
            .send()
            .await
            .map_err(|err| AuthError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Unavailable(format!(
                "introspection returned {}",
                response.status()
            )));
        }

        let introspection: IntrospectionResponse = response
            .json()
            .await
            .map_err(|err| AuthError::Unavailable(err.to_string()))?;
        self.principal_from(introspection)
    }
}

/// Verifier together with the role needed to modify books
pub struct AuthorizationGate {
    verifier: Arc<dyn TokenVerifier>,
    required_role: String,
}

impl AuthorizationGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>, required_role: &str) -> Self {
        Self {
            verifier,
            required_role: required_role.to_string(),
        }
    }

    pub async fn authorize(&self, bearer_token: Option<&str>) -> Result<Principal, AuthError> {
        let token = bearer_token.ok_or(AuthError::MissingToken)?;
        let principal = self.verifier.verify(token).await?;
        if principal.has_role(&self.required_role) {
            Ok(principal)
        } else {
            Err(AuthError::MissingRole(
                principal.name,
                self.required_role.clone(),
            ))
        }
    }
}

/// Bearer token from the `Authorization` header, if any.
/// Extraction never fails, the token is checked by [`AuthorizationGate::authorize_bearer`]
/// before the handler touches the request body.
#[derive(Apiv2Security)]
#[openapi(
    apiKey,
    in = "header",
    name = "Authorization",
    description = "Use format 'Bearer TOKEN'"
)]
pub struct BearerToken {
    token: Option<String>,
}

impl BearerToken {
    fn from_header(req: &HttpRequest) -> Option<String> {
        let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
            Some(token.trim().to_string())
        } else {
            None
        }
    }
}

impl FromRequest for BearerToken {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Self {
            token: Self::from_header(req),
        }))
    }
}

impl AuthorizationGate {
    /// Resolves the caller allowed to modify books, rejections are mapped to 401/403/500
    pub async fn authorize_bearer(
        &self,
        bearer_token: &BearerToken,
        path: &str,
    ) -> Result<Principal, ApiError> {
        self.authorize(bearer_token.token.as_deref())
            .await
            .map_err(|err| {
                tracing::info!("Request to {} rejected: {}", path, err);
                ApiError::from_auth(err, path)
            })
    }
}
