//! OAuth sign-in providers
//!
//! Authorization-code flow for GitHub and Google: build the authorize URL,
//! exchange the code for an access token and fetch the user's profile.

use crate::config::{OAuthConfig, OAuthProviderConfig};
use crate::db::repositories::ProviderColumn;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const USER_AGENT: &str = "devnest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Github,
    Google,
}

impl OAuthProvider {
    pub fn column(&self) -> ProviderColumn {
        match self {
            OAuthProvider::Github => ProviderColumn::Github,
            OAuthProvider::Google => ProviderColumn::Google,
        }
    }

    pub fn settings<'a>(&self, config: &'a OAuthConfig) -> &'a OAuthProviderConfig {
        match self {
            OAuthProvider::Github => &config.github,
            OAuthProvider::Google => &config.google,
        }
    }

    /// URL the browser is redirected to for consent
    pub fn authorize_url(&self, settings: &OAuthProviderConfig, state: &str) -> String {
        let (base, scope) = match self {
            OAuthProvider::Github => ("https://github.com/login/oauth/authorize", "read:user user:email"),
            OAuthProvider::Google => (
                "https://accounts.google.com/o/oauth2/v2/auth",
                "openid email profile",
            ),
        };
        let mut url = format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}",
            base,
            urlencoding::encode(&settings.client_id),
            urlencoding::encode(&settings.redirect_url),
            urlencoding::encode(scope),
            urlencoding::encode(state),
        );
        if *self == OAuthProvider::Google {
            url.push_str("&response_type=code");
        }
        url
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OAuthProvider::Github => write!(f, "github"),
            OAuthProvider::Google => write!(f, "google"),
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(OAuthProvider::Github),
            "google" => Ok(OAuthProvider::Google),
            _ => Err(anyhow!("Unknown OAuth provider: {}", s)),
        }
    }
}

/// Profile returned by a provider after a successful code exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider_id: String,
    /// Login or email local part, used to derive a username
    pub login: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Exchanges authorization codes for profiles
#[async_trait]
pub trait OAuthClient: Send + Sync {
    async fn fetch_profile(
        &self,
        provider: OAuthProvider,
        settings: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile>;
}

/// `OAuthClient` backed by the providers' HTTP APIs
pub struct HttpOAuthClient {
    client: reqwest::Client,
}

impl HttpOAuthClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    async fn github(&self, settings: &OAuthProviderConfig, code: &str) -> Result<OAuthProfile> {
        let token: TokenResponse = self
            .client
            .post("https://github.com/login/oauth/access_token")
            .header("Accept", "application/json")
            .form(&[
                ("client_id", settings.client_id.as_str()),
                ("client_secret", settings.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", settings.redirect_url.as_str()),
            ])
            .send()
            .await
            .context("GitHub token request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid GitHub token response")?;
        let access_token = token.into_access_token()?;

        let user: GithubUser = self
            .client
            .get("https://api.github.com/user")
            .bearer_auth(&access_token)
            .send()
            .await
            .context("GitHub user request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid GitHub user response")?;

        let email = match user.email {
            Some(email) => Some(email),
            None => self.github_primary_email(&access_token).await?,
        };

        Ok(OAuthProfile {
            provider_id: user.id.to_string(),
            login: user.login,
            email,
            name: user.name,
            avatar_url: user.avatar_url,
        })
    }

    async fn github_primary_email(&self, access_token: &str) -> Result<Option<String>> {
        let emails: Vec<GithubEmail> = self
            .client
            .get("https://api.github.com/user/emails")
            .bearer_auth(access_token)
            .send()
            .await
            .context("GitHub email request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid GitHub email response")?;
        Ok(emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email))
    }

    async fn google(&self, settings: &OAuthProviderConfig, code: &str) -> Result<OAuthProfile> {
        let token: TokenResponse = self
            .client
            .post("https://oauth2.googleapis.com/token")
            .form(&[
                ("client_id", settings.client_id.as_str()),
                ("client_secret", settings.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", settings.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("Google token request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid Google token response")?;
        let access_token = token.into_access_token()?;

        let user: GoogleUser = self
            .client
            .get("https://openidconnect.googleapis.com/v1/userinfo")
            .bearer_auth(&access_token)
            .send()
            .await
            .context("Google userinfo request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid Google userinfo response")?;

        let login = user
            .email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .unwrap_or("user")
            .to_string();
        Ok(OAuthProfile {
            provider_id: user.sub,
            login,
            email: user.email.filter(|_| user.email_verified.unwrap_or(false)),
            name: user.name,
            avatar_url: user.picture,
        })
    }
}

#[async_trait]
impl OAuthClient for HttpOAuthClient {
    async fn fetch_profile(
        &self,
        provider: OAuthProvider,
        settings: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile> {
        match provider {
            OAuthProvider::Github => self.github(settings, code).await,
            OAuthProvider::Google => self.google(settings, code).await,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_access_token(self) -> Result<String> {
        match self.access_token {
            Some(token) => Ok(token),
            None => Err(anyhow!(
                "Code exchange failed: {}",
                self.error_description
                    .or(self.error)
                    .unwrap_or_else(|| "no access token".to_string())
            )),
        }
    }
}

#[derive(Deserialize)]
struct GithubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

#[derive(Deserialize)]
struct GoogleUser {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("GitHub".parse::<OAuthProvider>().unwrap(), OAuthProvider::Github);
        assert_eq!("google".parse::<OAuthProvider>().unwrap(), OAuthProvider::Google);
        assert!("gitlab".parse::<OAuthProvider>().is_err());
    }

    #[test]
    fn test_authorize_url_encodes_parameters() {
        let settings = OAuthProviderConfig {
            client_id: "abc".to_string(),
            client_secret: "s".to_string(),
            redirect_url: "http://localhost:8080/api/v1/auth/oauth/google/callback".to_string(),
        };
        let url = OAuthProvider::Google.authorize_url(&settings, "xyz");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?client_id=abc"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.ends_with("&response_type=code"));

        let url = OAuthProvider::Github.authorize_url(&settings, "xyz");
        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("state=xyz"));
    }

    #[test]
    fn test_token_response_error() {
        let response = TokenResponse {
            access_token: None,
            error: Some("bad_verification_code".to_string()),
            error_description: None,
        };
        let err = response.into_access_token().unwrap_err();
        assert!(err.to_string().contains("bad_verification_code"));
    }
}
