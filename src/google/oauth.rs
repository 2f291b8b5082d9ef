use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{AppError, AppResult};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUser {
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Authorization-code flow against Google; yields the signed-in email.
#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuth {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    pub fn authorization_url(&self) -> AppResult<String> {
        Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", "email profile"),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "select_account"),
            ],
        )
        .map(String::from)
        .map_err(|e| AppError::Config(format!("cannot build authorization url: {e}")))
    }

    async fn exchange_code(&self, code: &str) -> AppResult<String> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Authentication(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "OAuth token endpoint rejected the code");
            return Err(AppError::Authentication(format!(
                "token endpoint returned {status}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Authentication(format!("bad token response: {e}")))?;
        token
            .access_token
            .ok_or_else(|| AppError::Authentication("no access token in response".into()))
    }

    async fn user_info(&self, access_token: &str) -> AppResult<GoogleUser> {
        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Authentication(format!("userinfo request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Authentication(format!(
                "userinfo endpoint returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Authentication(format!("bad userinfo response: {e}")))
    }

    /// Exchanges an authorization code and returns the account's email.
    pub async fn email_for_code(&self, code: &str) -> AppResult<String> {
        let access_token = self.exchange_code(code).await?;
        let user = self.user_info(&access_token).await?;
        debug!(name = ?user.name, "Fetched Google user info");

        user.email
            .filter(|e| !e.trim().is_empty())
            .map(|e| e.trim().to_string())
            .ok_or_else(|| AppError::Authentication("Google account has no email".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_carries_flow_parameters() {
        let mut config = Config::for_tests();
        config.google_client_id = "client-123".into();
        config.redirect_uri = "https://kintai.example.com/".into();

        let oauth = GoogleOAuth::new(reqwest::Client::new(), &config);
        let url = Url::parse(&oauth.authorization_url().unwrap()).unwrap();
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert!(params.contains(&("client_id".into(), "client-123".into())));
        assert!(params.contains(&("redirect_uri".into(), "https://kintai.example.com/".into())));
        assert!(params.contains(&("scope".into(), "email profile".into())));
        assert!(params.contains(&("prompt".into(), "select_account".into())));
    }
}
