use std::env;

use anyhow::Context;
use serde::Deserialize;

pub fn bookservice_url() -> String {
    env::var("BOOKSERVICE_URL").unwrap_or("http://127.0.0.1:8080".to_string())
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Returns a token of a user holding the manage_books role
pub async fn access_token() -> anyhow::Result<String> {
    if let Ok(token) = env::var("BOOKSERVICE_ACCESS_TOKEN") {
        return Ok(token);
    }

    let keycloak_url = env::var("KEYCLOAK_URL").unwrap_or("http://127.0.0.1:8080".to_string());
    let client_secret = env::var("KEYCLOAK_CLIENT_SECRET").context("KEYCLOAK_CLIENT_SECRET")?;
    let username = env::var("KEYCLOAK_USERNAME").unwrap_or("ivan.franchin".to_string());
    let password = env::var("KEYCLOAK_PASSWORD").unwrap_or("123".to_string());

    let response = reqwest::Client::new()
        .post(format!(
            "{}/realms/company-services/protocol/openid-connect/token",
            keycloak_url
        ))
        .form(&[
            ("grant_type", "password"),
            ("client_id", "book-service"),
            ("client_secret", client_secret.as_str()),
            ("username", username.as_str()),
            ("password", password.as_str()),
        ])
        .send()
        .await
        .context("Failed to call keycloak")?
        .error_for_status()
        .context("Keycloak refused to grant token")?;

    let token: TokenResponse = response.json().await.context("Invalid token response")?;
    Ok(token.access_token)
}
