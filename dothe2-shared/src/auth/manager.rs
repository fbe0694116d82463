//! Login token lifecycle
//!
//! [`AuthTokenManager`] owns the passwordless flow:
//!
//! ```text
//! request_login(email) ─► find or create user ─► issue token ─► notify
//! verify_code(email, code) ─┐
//! verify_link(token) ───────┴► redeem (atomic, once) ─► owning user
//! sweep_expired(now) ─► delete tokens past expires_at
//! ```
//!
//! Tokens are persisted before any notification goes out. A failed send is
//! logged and reported in [`LoginRequestOutcome::delivery`]; the token stays
//! valid and the request still succeeds.

use crate::auth::secret::{is_valid_code_format, SecretSource};
use crate::clock::{Clock, SharedClock};
use crate::error::{CoreError, CoreResult};
use crate::models::auth_token::{AuthToken, NewAuthToken, RequestMetadata};
use crate::models::user::{
    normalize_email, username_base, username_candidate, NewUser, User, NAME_MAX_CHARS,
};
use crate::notify::messages::{login_message, welcome_message};
use crate::notify::NotificationSender;
use crate::store::{AuthTokenRepository, StoreError, UserDirectory};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use validator::{ValidateEmail, ValidateLength};

/// Codes drawn before accepting a collision with a live token
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Username candidates tried for a new account
pub const MAX_USERNAME_ATTEMPTS: u32 = 100;

/// Longest bearer token the store can hold
const MAX_TOKEN_CHARS: usize = 64;

/// Longest email address accepted
const MAX_EMAIL_CHARS: u64 = 254;

/// Default token lifetime
pub fn default_token_ttl() -> Duration {
    Duration::minutes(15)
}

/// Token lifetime and link construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    ttl: Duration,
    public_base_url: String,
    app_url: String,
}

impl TokenPolicy {
    /// # Errors
    ///
    /// [`CoreError::Validation`] when `ttl` is zero or negative
    pub fn new(ttl: Duration, public_base_url: impl Into<String>) -> CoreResult<Self> {
        if ttl <= Duration::zero() {
            return Err(CoreError::Validation(
                "Token lifetime must be positive".to_string(),
            ));
        }
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            ttl,
            app_url: public_base_url.clone(),
            public_base_url,
        })
    }

    /// Sets the URL linked from the welcome message
    pub fn with_app_url(mut self, app_url: impl Into<String>) -> Self {
        self.app_url = app_url.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Link that redeems `token` when opened
    pub fn magic_link(&self, token: &str) -> String {
        format!("{}/v1/auth/verify?token={}", self.public_base_url, token)
    }
}

/// Whether the sign-in notification went out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The token is still valid; the reason is for logs only
    Failed(String),
}

/// Result of [`AuthTokenManager::request_login`]
#[derive(Debug, Clone)]
pub struct LoginRequestOutcome {
    pub user: User,
    /// The account was created by this request
    pub created: bool,
    pub token: AuthToken,
    pub delivery: Delivery,
}

/// Issues, redeems and sweeps login tokens
#[derive(Clone)]
pub struct AuthTokenManager {
    users: Arc<dyn UserDirectory>,
    tokens: Arc<dyn AuthTokenRepository>,
    notifier: Arc<dyn NotificationSender>,
    secrets: Arc<dyn SecretSource>,
    clock: SharedClock,
    policy: TokenPolicy,
}

impl AuthTokenManager {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        tokens: Arc<dyn AuthTokenRepository>,
        notifier: Arc<dyn NotificationSender>,
        secrets: Arc<dyn SecretSource>,
        clock: SharedClock,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            users,
            tokens,
            notifier,
            secrets,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Mints and persists a token for `user_id`
    pub async fn issue(&self, user_id: i64, metadata: RequestMetadata) -> CoreResult<AuthToken> {
        let now = self.clock.utc();
        let token = self.secrets.bearer_token();
        let code = self.unused_code(now).await?;

        let stored = self
            .tokens
            .insert_token(NewAuthToken {
                user_id,
                token,
                code,
                created_at: now,
                expires_at: now + self.policy.ttl,
                metadata,
            })
            .await?;

        debug!(user_id, token_id = stored.id, expires_at = %stored.expires_at, "Auth token issued");
        Ok(stored)
    }

    async fn unused_code(&self, now: DateTime<Utc>) -> CoreResult<String> {
        let mut code = self.secrets.code();
        for _ in 1..MAX_CODE_ATTEMPTS {
            if !self.tokens.live_code_exists(&code, now).await? {
                return Ok(code);
            }
            code = self.secrets.code();
        }
        if self.tokens.live_code_exists(&code, now).await? {
            warn!(
                attempts = MAX_CODE_ATTEMPTS,
                "Code still collides with a live token, issuing anyway"
            );
        }
        Ok(code)
    }

    /// Starts a login: finds or creates the user, issues a token and sends it
    pub async fn request_login(
        &self,
        email: &str,
        metadata: RequestMetadata,
    ) -> CoreResult<LoginRequestOutcome> {
        let email = normalize_email(email);
        validate_email(&email)?;

        let (user, created) = self.find_or_create_user(&email).await?;
        if created {
            let welcome = welcome_message(&user.email, &user.name, &self.policy.app_url);
            if let Err(e) = self.notifier.send(&welcome).await {
                error!(user_id = user.id, error = %e, "Failed to send welcome email");
            }
        }

        let token = self.issue(user.id, metadata).await?;

        let message = login_message(
            &user.email,
            &user.name,
            &self.policy.magic_link(&token.token),
            &token.code,
            self.policy.ttl.num_minutes(),
        );
        let delivery = match self.notifier.send(&message).await {
            Ok(()) => {
                info!(user_id = user.id, "Login email sent");
                Delivery::Sent
            }
            Err(e) => {
                error!(user_id = user.id, error = %e, "Failed to send login email");
                Delivery::Failed(e.to_string())
            }
        };

        Ok(LoginRequestOutcome {
            user,
            created,
            token,
            delivery,
        })
    }

    async fn find_or_create_user(&self, email: &str) -> CoreResult<(User, bool)> {
        if let Some(user) = self.users.find_user_by_email(email).await? {
            return Ok((user, false));
        }

        let base = username_base(email);
        let name: String = base.chars().take(NAME_MAX_CHARS).collect();

        for attempt in 0..MAX_USERNAME_ATTEMPTS {
            let username = username_candidate(&base, attempt);
            if self.users.username_taken(&username).await? {
                continue;
            }

            let new_user = NewUser {
                email: email.to_string(),
                name: name.clone(),
                username,
            };
            match self.users.insert_user(new_user, self.clock.utc()).await {
                Ok(user) => {
                    info!(user_id = user.id, username = %user.username, "New user created");
                    return Ok((user, true));
                }
                Err(StoreError::Duplicate(constraint)) => {
                    // Email registered concurrently, or the username was
                    // claimed between the check and the insert.
                    if let Some(user) = self.users.find_user_by_email(email).await? {
                        return Ok((user, false));
                    }
                    if constraint.contains("email") {
                        warn!("Login requested for a deactivated account");
                        return Err(CoreError::Forbidden("Account is deactivated".to_string()));
                    }
                    debug!(%constraint, "Username taken concurrently, trying next");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::Duplicate("users.username".to_string()).into())
    }

    /// Redeems the newest live token of `email` carrying `code`
    ///
    /// Wrong, expired, already used and malformed codes all fail the same way.
    pub async fn redeem_by_code(&self, email: &str, code: &str) -> CoreResult<AuthToken> {
        if !is_valid_code_format(code) {
            return Err(CoreError::InvalidOrExpiredCode);
        }
        let email = normalize_email(email);

        match self
            .tokens
            .redeem_by_code(&email, code, self.clock.utc())
            .await?
        {
            Some(token) => {
                info!(user_id = token.user_id, token_id = token.id, "Code redeemed");
                Ok(token)
            }
            None => Err(CoreError::InvalidOrExpiredCode),
        }
    }

    /// Redeems the token behind a magic link
    pub async fn redeem_by_token(&self, token: &str) -> CoreResult<AuthToken> {
        if token.is_empty() || token.len() > MAX_TOKEN_CHARS {
            return Err(CoreError::InvalidOrExpiredToken);
        }

        match self.tokens.redeem_by_token(token, self.clock.utc()).await? {
            Some(token) => {
                info!(user_id = token.user_id, token_id = token.id, "Magic link redeemed");
                Ok(token)
            }
            None => Err(CoreError::InvalidOrExpiredToken),
        }
    }

    /// Redeems a code and returns the account it belongs to
    pub async fn verify_code(&self, email: &str, code: &str) -> CoreResult<User> {
        let token = self.redeem_by_code(email, code).await?;
        self.current_user(token.user_id).await
    }

    /// Redeems a magic-link token and returns the account it belongs to
    pub async fn verify_link(&self, token: &str) -> CoreResult<User> {
        let token = self.redeem_by_token(token).await?;
        self.current_user(token.user_id).await
    }

    /// Looks up a live account
    pub async fn current_user(&self, user_id: i64) -> CoreResult<User> {
        self.users
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User", user_id))
    }

    /// Deletes every token that expired before `now`
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> CoreResult<u64> {
        sweep_expired(self.tokens.as_ref(), now).await
    }
}

/// Deletes tokens with `expires_at < now`, redeemed or not
///
/// Free-standing so the sweeper can run it with only a token repository.
pub async fn sweep_expired(
    tokens: &dyn AuthTokenRepository,
    now: DateTime<Utc>,
) -> CoreResult<u64> {
    let removed = tokens.delete_expired(now).await?;
    if removed > 0 {
        info!(removed, "Expired auth tokens swept");
    } else {
        debug!("No expired auth tokens");
    }
    Ok(removed)
}

fn validate_email(email: &str) -> CoreResult<()> {
    if email.validate_length(None, Some(MAX_EMAIL_CHARS), None) && email.validate_email() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("Invalid email address '{}'", email)))
    }
}
