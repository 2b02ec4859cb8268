//! Authentication service
//!
//! Account lifecycle: registration (the first account becomes admin), login,
//! email verification, password reset/change and OAuth sign-in. Successful
//! sign-ins return the user together with a signed access token.

use crate::config::OAuthConfig;
use crate::db::repositories::target::is_unique_violation;
use crate::db::repositories::{TokenRepository, UserRepository};
use crate::models::{User, UserRole};
use crate::services::email::EmailService;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::oauth::{OAuthClient, OAuthProfile, OAuthProvider};
use crate::services::password::{
    hash_password, is_acceptable_password, verify_password, MIN_PASSWORD_LEN,
};
use crate::services::token::{hash_token, JwtManager, OneTimeToken};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const EMAIL_VERIFICATION_HOURS: i64 = 24;
const PASSWORD_RESET_HOURS: i64 = 1;
const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 30;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,30}$").expect("valid username regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

/// Returned by every successful sign-in
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    token_repo: Arc<dyn TokenRepository>,
    email: Arc<EmailService>,
    jwt: JwtManager,
    oauth_config: OAuthConfig,
    oauth_client: Arc<dyn OAuthClient>,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        token_repo: Arc<dyn TokenRepository>,
        email: Arc<EmailService>,
        jwt: JwtManager,
        oauth_config: OAuthConfig,
        oauth_client: Arc<dyn OAuthClient>,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            email,
            jwt,
            oauth_config,
            oauth_client,
        }
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    pub async fn register(&self, input: RegisterInput) -> ServiceResult<AuthResponse> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();

        if !USERNAME_RE.is_match(&username) {
            return Err(ServiceError::validation(format!(
                "Username must be {}-{} characters of letters, digits, '_' or '-'",
                MIN_USERNAME_LEN, MAX_USERNAME_LEN
            )));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(ServiceError::validation("Invalid email address"));
        }
        if !is_acceptable_password(&input.password) {
            return Err(ServiceError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(ServiceError::conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(ServiceError::conflict("Email is already registered"));
        }

        let role = self.role_for_new_account().await?;
        let password_hash = hash_password(&input.password)?;
        let user = self
            .insert_user(User::new(username, email, Some(password_hash), role))
            .await?;

        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        self.issue_email_verification(&user).await?;

        self.respond(user)
    }

    pub async fn login(&self, input: LoginInput) -> ServiceResult<AuthResponse> {
        let invalid = || ServiceError::Unauthorized("Invalid username or password".to_string());

        let identifier = input.username_or_email.trim();
        let user = if identifier.contains('@') {
            self.user_repo.get_by_email(identifier).await
        } else {
            self.user_repo.get_by_username(identifier).await
        }
        .context("Failed to look up user")?
        .filter(|u| !u.is_deleted)
        .ok_or_else(invalid)?;

        let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
        if !verify_password(&input.password, hash)? {
            return Err(invalid());
        }

        tracing::info!(user_id = user.id, "User logged in");
        self.respond(user)
    }

    /// Load the live user an access token belongs to
    pub async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let claims = self
            .jwt
            .verify(token)
            .map_err(|_| ServiceError::Unauthorized("Invalid or expired token".to_string()))?;

        self.user_repo
            .get_by_id(claims.sub)
            .await
            .context("Failed to load user")?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| ServiceError::Unauthorized("User no longer exists".to_string()))
    }

    pub async fn verify_email(&self, token: &str) -> ServiceResult<User> {
        let invalid = || ServiceError::validation("Invalid or expired verification token");

        let verification = self
            .token_repo
            .get_email_verification(&hash_token(token))
            .await
            .context("Failed to load verification token")?
            .ok_or_else(invalid)?;
        if verification.is_expired(Utc::now()) {
            return Err(invalid());
        }

        self.user_repo
            .mark_email_verified(verification.user_id)
            .await
            .context("Failed to mark email verified")?;
        self.token_repo
            .delete_email_verifications(verification.user_id)
            .await
            .context("Failed to delete verification tokens")?;

        let user = self
            .user_repo
            .get_by_id(verification.user_id)
            .await
            .context("Failed to load user")?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        tracing::info!(user_id = user.id, "Email verified");
        Ok(user)
    }

    pub async fn resend_verification(&self, user: &User) -> ServiceResult<()> {
        if user.is_email_verified {
            return Err(ServiceError::validation("Email is already verified"));
        }
        self.issue_email_verification(user).await
    }

    /// Always succeeds so callers cannot probe which emails are registered
    pub async fn forgot_password(&self, email: &str) -> ServiceResult<()> {
        let user = self
            .user_repo
            .get_by_email(email.trim())
            .await
            .context("Failed to look up user")?;

        let Some(user) = user.filter(|u| !u.is_deleted) else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = OneTimeToken::generate();
        self.token_repo
            .create_password_reset(
                user.id,
                &token.hash,
                Utc::now() + Duration::hours(PASSWORD_RESET_HOURS),
            )
            .await
            .context("Failed to store password reset")?;

        if let Err(e) = self
            .email
            .send_password_reset(&user.email, &user.username, &token.plain)
            .await
        {
            tracing::warn!(user_id = user.id, "Failed to send password reset email: {}", e);
        }
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> ServiceResult<()> {
        let invalid = || ServiceError::validation("Invalid or expired reset token");

        if !is_acceptable_password(new_password) {
            return Err(ServiceError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let reset = self
            .token_repo
            .get_password_reset(&hash_token(token))
            .await
            .context("Failed to load reset token")?
            .ok_or_else(invalid)?;
        if !reset.is_usable(Utc::now()) {
            return Err(invalid());
        }
        // Guards against two concurrent uses of the same token
        if !self
            .token_repo
            .mark_password_reset_used(reset.id)
            .await
            .context("Failed to consume reset token")?
        {
            return Err(invalid());
        }

        let hash = hash_password(new_password)?;
        self.user_repo
            .set_password(reset.user_id, &hash)
            .await
            .context("Failed to update password")?;

        tracing::info!(user_id = reset.user_id, "Password reset");
        Ok(())
    }

    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        let current_ok = match user.password_hash.as_deref() {
            Some(hash) => verify_password(current_password, hash)?,
            None => false,
        };
        if !current_ok {
            return Err(ServiceError::validation("Current password is incorrect"));
        }
        if !is_acceptable_password(new_password) {
            return Err(ServiceError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let hash = hash_password(new_password)?;
        self.user_repo
            .set_password(user.id, &hash)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    /// Authorize URL for a configured provider
    pub fn oauth_authorize_url(&self, provider: &str, state: &str) -> ServiceResult<String> {
        let provider = parse_provider(provider)?;
        let settings = provider.settings(&self.oauth_config);
        if !settings.is_configured() {
            return Err(ServiceError::validation(format!(
                "OAuth provider '{}' is not configured",
                provider
            )));
        }
        Ok(provider.authorize_url(settings, state))
    }

    /// Exchange an authorization code and sign the matching user in.
    ///
    /// Links to an existing account by provider id, then by email; otherwise
    /// creates a new, already verified account.
    pub async fn oauth_login(&self, provider: &str, code: &str) -> ServiceResult<AuthResponse> {
        let provider = parse_provider(provider)?;
        let settings = provider.settings(&self.oauth_config);
        if !settings.is_configured() {
            return Err(ServiceError::validation(format!(
                "OAuth provider '{}' is not configured",
                provider
            )));
        }
        if code.trim().is_empty() {
            return Err(ServiceError::validation("Missing authorization code"));
        }

        let profile = self
            .oauth_client
            .fetch_profile(provider, settings, code)
            .await
            .map_err(|e| {
                tracing::warn!(%provider, "OAuth code exchange failed: {}", e);
                ServiceError::Unauthorized("OAuth sign-in failed".to_string())
            })?;

        let user = self.find_or_create_oauth_user(provider, profile).await?;
        if user.is_deleted {
            return Err(ServiceError::Unauthorized("Account is disabled".to_string()));
        }

        tracing::info!(user_id = user.id, %provider, "OAuth login");
        self.respond(user)
    }

    async fn find_or_create_oauth_user(
        &self,
        provider: OAuthProvider,
        profile: OAuthProfile,
    ) -> ServiceResult<User> {
        if let Some(user) = self
            .user_repo
            .get_by_provider_id(provider.column(), &profile.provider_id)
            .await
            .context("Failed to look up linked account")?
        {
            return Ok(user);
        }

        if let Some(email) = profile.email.as_deref() {
            if let Some(mut user) = self
                .user_repo
                .get_by_email(email)
                .await
                .context("Failed to look up user by email")?
            {
                set_provider_id(&mut user, provider, profile.provider_id);
                user.is_email_verified = true;
                if user.avatar_url.is_none() {
                    user.avatar_url = profile.avatar_url;
                }
                let user = self
                    .user_repo
                    .update(&user)
                    .await
                    .context("Failed to link account")?;
                return Ok(user);
            }
        }

        let username = self.unique_username(&profile.login).await?;
        let email = profile
            .email
            .clone()
            .unwrap_or_else(|| format!("{}-{}@users.noreply.devnest", provider, profile.provider_id));
        let role = self.role_for_new_account().await?;

        let mut user = User::new(username, email.to_lowercase(), None, role);
        user.display_name = profile.name;
        user.avatar_url = profile.avatar_url;
        user.is_email_verified = true;
        set_provider_id(&mut user, provider, profile.provider_id);

        let user = self.insert_user(user).await?;
        tracing::info!(user_id = user.id, %provider, "User registered through OAuth");
        Ok(user)
    }

    /// Derive a free username from a provider login
    async fn unique_username(&self, login: &str) -> ServiceResult<String> {
        let base = username_base(login);
        for suffix in 0..100 {
            let candidate = if suffix == 0 {
                base.clone()
            } else {
                let tail = format!("-{}", suffix + 1);
                let keep = MAX_USERNAME_LEN - tail.len();
                format!("{}{}", truncate_chars(&base, keep), tail)
            };
            if self
                .user_repo
                .get_by_username(&candidate)
                .await
                .context("Failed to check username")?
                .is_none()
            {
                return Ok(candidate);
            }
        }
        let tail = uuid::Uuid::new_v4().simple().to_string();
        Ok(format!("{}-{}", truncate_chars(&base, 21), &tail[..8]))
    }

    async fn role_for_new_account(&self) -> ServiceResult<UserRole> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(if count == 0 {
            UserRole::Admin
        } else {
            UserRole::User
        })
    }

    async fn insert_user(&self, user: User) -> ServiceResult<User> {
        match self.user_repo.create(&user).await {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(ServiceError::conflict(
                "Username or email is already registered",
            )),
            Err(e) => Err(e.context("Failed to create user").into()),
        }
    }

    async fn issue_email_verification(&self, user: &User) -> ServiceResult<()> {
        let token = OneTimeToken::generate();
        self.token_repo
            .create_email_verification(
                user.id,
                &token.hash,
                Utc::now() + Duration::hours(EMAIL_VERIFICATION_HOURS),
            )
            .await
            .context("Failed to store verification token")?;

        if let Err(e) = self
            .email
            .send_verification(&user.email, &user.username, &token.plain)
            .await
        {
            tracing::warn!(user_id = user.id, "Failed to send verification email: {}", e);
        }
        Ok(())
    }

    fn respond(&self, user: User) -> ServiceResult<AuthResponse> {
        let token = self.jwt.issue(&user)?;
        Ok(AuthResponse { user, token })
    }
}

fn parse_provider(name: &str) -> ServiceResult<OAuthProvider> {
    name.parse()
        .map_err(|_| ServiceError::NotFound(format!("Unknown OAuth provider '{}'", name)))
}

fn set_provider_id(user: &mut User, provider: OAuthProvider, id: String) {
    match provider {
        OAuthProvider::Github => user.github_id = Some(id),
        OAuthProvider::Google => user.google_id = Some(id),
    }
}

/// Keep allowed characters, cap the length and pad very short names
fn username_base(login: &str) -> String {
    let cleaned: String = login
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_USERNAME_LEN)
        .collect();
    if cleaned.len() >= MIN_USERNAME_LEN {
        cleaned
    } else {
        format!("{}{}", cleaned, "user").chars().take(MAX_USERNAME_LEN).collect()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OAuthProviderConfig, SmtpConfig};
    use crate::db::repositories::{SqlxTokenRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DbPool};
    use async_trait::async_trait;

    struct FakeOAuthClient {
        profile: OAuthProfile,
    }

    #[async_trait]
    impl OAuthClient for FakeOAuthClient {
        async fn fetch_profile(
            &self,
            _provider: OAuthProvider,
            _settings: &OAuthProviderConfig,
            code: &str,
        ) -> anyhow::Result<OAuthProfile> {
            if code == "bad" {
                anyhow::bail!("bad code");
            }
            Ok(self.profile.clone())
        }
    }

    fn github_profile() -> OAuthProfile {
        OAuthProfile {
            provider_id: "1001".to_string(),
            login: "octo cat".to_string(),
            email: Some("octo@example.com".to_string()),
            name: Some("Octo".to_string()),
            avatar_url: None,
        }
    }

    async fn setup_test_service() -> (DbPool, AuthService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let mut oauth_config = OAuthConfig::default();
        oauth_config.github = OAuthProviderConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: "http://localhost/callback".to_string(),
        };

        let service = AuthService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxTokenRepository::boxed(pool.clone()),
            Arc::new(EmailService::new(SmtpConfig::default(), "http://localhost:3000")),
            JwtManager::new("test-secret", 1),
            oauth_config,
            Arc::new(FakeOAuthClient {
                profile: github_profile(),
            }),
        );
        (pool, service)
    }

    fn register_input(username: &str, email: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
        }
    }

    /// Store a known verification token for the user, replacing the emailed one
    async fn known_verification_token(pool: &DbPool, user_id: i64, hours: i64) -> String {
        let token = OneTimeToken::generate();
        SqlxTokenRepository::new(pool.clone())
            .create_email_verification(user_id, &token.hash, Utc::now() + Duration::hours(hours))
            .await
            .unwrap();
        token.plain
    }

    #[tokio::test]
    async fn test_first_user_is_admin() {
        let (_pool, service) = setup_test_service().await;

        let first = service
            .register(register_input("admin", "admin@example.com"))
            .await
            .unwrap();
        let second = service
            .register(register_input("bob", "bob@example.com"))
            .await
            .unwrap();

        assert_eq!(first.user.role, UserRole::Admin);
        assert_eq!(second.user.role, UserRole::User);
        assert!(!second.user.is_email_verified);
        assert_eq!(service.jwt().verify(&second.token).unwrap().sub, second.user.id);
    }

    #[tokio::test]
    async fn test_register_validation_and_conflicts() {
        let (_pool, service) = setup_test_service().await;

        for input in [
            register_input("ab", "ab@example.com"),
            register_input("has space", "x@example.com"),
            register_input("valid", "not-an-email"),
            RegisterInput {
                password: "short".to_string(),
                ..register_input("valid", "v@example.com")
            },
        ] {
            assert!(matches!(
                service.register(input).await,
                Err(ServiceError::ValidationError(_))
            ));
        }

        service
            .register(register_input("alice", "alice@example.com"))
            .await
            .unwrap();
        assert!(matches!(
            service.register(register_input("alice", "other@example.com")).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            service.register(register_input("alice2", "ALICE@example.com")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let (pool, service) = setup_test_service().await;
        let registered = service
            .register(register_input("alice", "alice@example.com"))
            .await
            .unwrap();

        let by_name = service
            .login(LoginInput {
                username_or_email: "alice".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(by_name.user.id, registered.user.id);

        let by_email = service
            .login(LoginInput {
                username_or_email: "Alice@Example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(by_email.user.id, registered.user.id);

        let wrong = service
            .login(LoginInput {
                username_or_email: "alice".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(ServiceError::Unauthorized(_))));

        sqlx::query("UPDATE users SET is_deleted = 1 WHERE id = ?")
            .bind(registered.user.id)
            .execute(&pool)
            .await
            .unwrap();
        let deleted = service
            .login(LoginInput {
                username_or_email: "alice".to_string(),
                password: "password123".to_string(),
            })
            .await;
        assert!(matches!(deleted, Err(ServiceError::Unauthorized(_))));
        assert!(matches!(
            service.authenticate(&registered.token).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_email() {
        let (pool, service) = setup_test_service().await;
        let user = service
            .register(register_input("alice", "alice@example.com"))
            .await
            .unwrap()
            .user;

        let expired = known_verification_token(&pool, user.id, -1).await;
        assert!(matches!(
            service.verify_email(&expired).await,
            Err(ServiceError::ValidationError(_))
        ));

        let token = known_verification_token(&pool, user.id, 24).await;
        let verified = service.verify_email(&token).await.unwrap();
        assert!(verified.is_email_verified);

        // Consumed
        assert!(matches!(
            service.verify_email(&token).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.resend_verification(&verified).await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let (pool, service) = setup_test_service().await;
        let user = service
            .register(register_input("alice", "alice@example.com"))
            .await
            .unwrap()
            .user;

        // Unknown emails succeed silently
        service.forgot_password("nobody@example.com").await.unwrap();
        service.forgot_password("alice@example.com").await.unwrap();

        let token = OneTimeToken::generate();
        SqlxTokenRepository::new(pool.clone())
            .create_password_reset(user.id, &token.hash, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert!(matches!(
            service.reset_password(&token.plain, "short").await,
            Err(ServiceError::ValidationError(_))
        ));
        service
            .reset_password(&token.plain, "new-password-1")
            .await
            .unwrap();
        assert!(matches!(
            service.reset_password(&token.plain, "new-password-2").await,
            Err(ServiceError::ValidationError(_))
        ));

        let login = service
            .login(LoginInput {
                username_or_email: "alice".to_string(),
                password: "new-password-1".to_string(),
            })
            .await;
        assert!(login.is_ok());
    }

    #[tokio::test]
    async fn test_change_password() {
        let (_pool, service) = setup_test_service().await;
        let user = service
            .register(register_input("alice", "alice@example.com"))
            .await
            .unwrap()
            .user;

        assert!(matches!(
            service.change_password(&user, "wrong", "another-pass").await,
            Err(ServiceError::ValidationError(_))
        ));
        service
            .change_password(&user, "password123", "another-pass")
            .await
            .unwrap();
        assert!(service
            .login(LoginInput {
                username_or_email: "alice".to_string(),
                password: "another-pass".to_string(),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_oauth_creates_then_reuses_account() {
        let (_pool, service) = setup_test_service().await;

        let first = service.oauth_login("github", "code").await.unwrap();
        assert_eq!(first.user.username, "octocat");
        assert!(first.user.is_email_verified);
        assert_eq!(first.user.github_id.as_deref(), Some("1001"));
        assert_eq!(first.user.role, UserRole::Admin);

        let again = service.oauth_login("GitHub", "code").await.unwrap();
        assert_eq!(again.user.id, first.user.id);
    }

    #[tokio::test]
    async fn test_oauth_links_existing_email() {
        let (_pool, service) = setup_test_service().await;
        let existing = service
            .register(register_input("octo", "octo@example.com"))
            .await
            .unwrap()
            .user;

        let linked = service.oauth_login("github", "code").await.unwrap();
        assert_eq!(linked.user.id, existing.id);
        assert_eq!(linked.user.github_id.as_deref(), Some("1001"));
    }

    #[tokio::test]
    async fn test_oauth_errors() {
        let (_pool, service) = setup_test_service().await;

        assert!(matches!(
            service.oauth_login("gitlab", "code").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.oauth_login("google", "code").await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.oauth_login("github", "bad").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(service.oauth_authorize_url("github", "s").is_ok());
    }

    #[tokio::test]
    async fn test_unique_username_suffix() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(register_input("octocat", "someone@example.com"))
            .await
            .unwrap();
        assert_eq!(service.unique_username("octo cat").await.unwrap(), "octocat-2");
    }

    #[test]
    fn test_username_base() {
        assert_eq!(username_base("Jane.Doe"), "JaneDoe");
        assert_eq!(username_base("x"), "xuser");
        assert_eq!(username_base(&"a".repeat(50)).len(), MAX_USERNAME_LEN);
    }
}
