//! Authentication token model
//!
//! An auth token backs one login request. It carries two secrets that redeem
//! the same record: a URL-safe bearer token embedded in the magic link, and a
//! 6-digit code the user can type instead.
//!
//! # State Machine
//!
//! ```text
//! Issued → Redeemed        (terminal)
//! Issued ⇢ expired         (derived: now >= expires_at, never stored)
//! ```
//!
//! Redemption is a one-way transition. Nothing moves a token out of
//! `Redeemed`, and an expired token can no longer be redeemed even though its
//! stored state is still `Issued`.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE auth_tokens (
//!     id BIGSERIAL PRIMARY KEY,
//!     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     token VARCHAR(64) NOT NULL UNIQUE,
//!     code VARCHAR(6) NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     expires_at TIMESTAMPTZ NOT NULL,
//!     redeemed_at TIMESTAMPTZ,
//!     ip_address VARCHAR(45),
//!     user_agent VARCHAR(200),
//!     CHECK (expires_at > created_at)
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of digits in a one-time code
pub const CODE_LENGTH: usize = 6;

/// User agents longer than this are truncated before storage
pub const USER_AGENT_MAX_CHARS: usize = 200;

/// Longest textual IP address (IPv6 with embedded IPv4)
pub const IP_ADDRESS_MAX_CHARS: usize = 45;

/// Where a login request came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Client address
    pub ip_address: Option<String>,

    /// Client descriptor (`User-Agent`), at most 200 characters
    pub user_agent: Option<String>,
}

impl RequestMetadata {
    /// Builds metadata, truncating both fields to their column widths
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address: ip_address.map(|ip| truncate_chars(&ip, IP_ADDRESS_MAX_CHARS)),
            user_agent: user_agent.map(|ua| truncate_chars(&ua, USER_AGENT_MAX_CHARS)),
        }
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Stored redemption state of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TokenState {
    /// Issued and not yet used
    Issued,

    /// Used once; terminal
    Redeemed {
        /// When the token was redeemed
        at: DateTime<Utc>,
    },
}

impl TokenState {
    /// Maps the nullable `redeemed_at` column onto the state
    pub fn from_redeemed_at(redeemed_at: Option<DateTime<Utc>>) -> Self {
        match redeemed_at {
            Some(at) => TokenState::Redeemed { at },
            None => TokenState::Issued,
        }
    }

    /// Inverse of [`TokenState::from_redeemed_at`]
    pub fn redeemed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            TokenState::Issued => None,
            TokenState::Redeemed { at } => Some(*at),
        }
    }
}

/// Why a token cannot be redeemed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RedeemError {
    /// Token was already used
    #[error("token already redeemed")]
    AlreadyRedeemed,

    /// Token lifetime has elapsed
    #[error("token expired")]
    Expired,
}

/// Authentication token record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Primary key
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Bearer secret embedded in the magic link
    pub token: String,

    /// 6-digit one-time code
    pub code: String,

    /// When the token was issued
    pub created_at: DateTime<Utc>,

    /// First instant at which the token is no longer redeemable
    pub expires_at: DateTime<Utc>,

    /// Redemption state; only [`AuthToken::redeem`] moves it
    state: TokenState,

    /// Client address of the login request
    pub ip_address: Option<String>,

    /// Client descriptor of the login request
    pub user_agent: Option<String>,
}

impl AuthToken {
    /// Rebuilds a stored token from its insert record and `redeemed_at` column
    pub fn from_record(
        id: i64,
        record: NewAuthToken,
        redeemed_at: Option<DateTime<Utc>>,
    ) -> Self {
        AuthToken {
            id,
            user_id: record.user_id,
            token: record.token,
            code: record.code,
            created_at: record.created_at,
            expires_at: record.expires_at,
            state: TokenState::from_redeemed_at(redeemed_at),
            ip_address: record.metadata.ip_address,
            user_agent: record.metadata.user_agent,
        }
    }

    pub fn state(&self) -> TokenState {
        self.state
    }

    /// When the token was redeemed, if it was
    pub fn redeemed_at(&self) -> Option<DateTime<Utc>> {
        self.state.redeemed_at()
    }

    /// True once the token has been used
    pub fn is_redeemed(&self) -> bool {
        matches!(self.state, TokenState::Redeemed { .. })
    }

    /// True when `now` is at or past the expiry instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True iff the token is unused and unexpired at `now`
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.is_redeemed() && !self.is_expired(now)
    }

    /// Performs the `Issued → Redeemed` transition
    ///
    /// # Errors
    ///
    /// - [`RedeemError::AlreadyRedeemed`] if the token was used before
    /// - [`RedeemError::Expired`] if `now` is past the expiry
    pub fn redeem(&mut self, now: DateTime<Utc>) -> Result<(), RedeemError> {
        if self.is_redeemed() {
            return Err(RedeemError::AlreadyRedeemed);
        }
        if self.is_expired(now) {
            return Err(RedeemError::Expired);
        }
        self.state = TokenState::Redeemed { at: now };
        Ok(())
    }
}

/// Input for persisting a freshly minted token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthToken {
    /// Owning user
    pub user_id: i64,

    /// Bearer secret
    pub token: String,

    /// One-time code
    pub code: String,

    /// Issue instant
    pub created_at: DateTime<Utc>,

    /// Expiry instant, strictly after `created_at`
    pub expires_at: DateTime<Utc>,

    /// Request origin
    pub metadata: RequestMetadata,
}
