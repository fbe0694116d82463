/// Authentication endpoints
///
/// Passwordless login: the client asks for a login email, then proves
/// ownership of the address either with the 6-digit code or by opening the
/// magic link. Both paths end with a JWT access token.
///
/// # Endpoints
///
/// - `POST /v1/auth/request-login` - Send a magic link and code
/// - `POST /v1/auth/verify-code` - Exchange email + code for a token
/// - `GET /v1/auth/verify?token=` - Magic link target, redirects to the frontend
/// - `GET /v1/auth/me` - Current user (JWT)
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use dothe2_shared::{
    auth::{
        jwt::{create_token, Claims},
        middleware::AuthContext,
    },
    error::CoreError,
    models::{auth_token::RequestMetadata, user::User},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct RequestLoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Code verification request
///
/// The code is not shape-checked here; a malformed code fails exactly like a
/// wrong one.
#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

/// Magic link query
#[derive(Debug, Deserialize)]
pub struct VerifyLinkQuery {
    pub token: String,
}

/// Access token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Always `"bearer"`
    pub token_type: String,
}

/// Request a login email
///
/// ```text
/// POST /v1/auth/request-login
/// Content-Type: application/json
///
/// { "email": "user@example.com" }
/// ```
///
/// Creates the account on first use. Responds `204 No Content` whether or not
/// the email could be delivered; the token is valid either way.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: malformed email
/// - `403 Forbidden`: the account is deactivated
pub async fn request_login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<RequestLoginRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;

    let metadata = request_metadata(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let outcome = state.services.auth.request_login(&req.email, metadata).await?;

    tracing::debug!(
        user_id = outcome.user.id,
        created = outcome.created,
        delivery = ?outcome.delivery,
        "Login requested"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Exchange a code for an access token
///
/// ```text
/// POST /v1/auth/verify-code
/// Content-Type: application/json
///
/// { "email": "user@example.com", "code": "123456" }
/// ```
///
/// ```json
/// { "access_token": "eyJ...", "token_type": "bearer" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: wrong, expired, used or malformed code
/// - `404 Not Found`: the account no longer exists
pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state.services.auth.verify_code(&req.email, &req.code).await?;
    let access_token = issue_access_token(&state, &user)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// Magic link target
///
/// ```text
/// GET /v1/auth/verify?token=<token>
/// ```
///
/// Always answers `302 Found`:
/// - success: `{frontend}/auth/success?token=<jwt>`
/// - unknown, expired or used token: `{frontend}/auth/error?reason=invalid_token`
/// - account gone: `{frontend}/auth/error?reason=user_not_found`
pub async fn verify_magic_link(
    State(state): State<AppState>,
    Query(query): Query<VerifyLinkQuery>,
) -> ApiResult<Response> {
    let frontend = &state.config.login.frontend_url;

    let user = match state.services.auth.verify_link(&query.token).await {
        Ok(user) => user,
        Err(CoreError::InvalidOrExpiredToken) => {
            return Ok(found(format!("{}/auth/error?reason=invalid_token", frontend)));
        }
        Err(CoreError::NotFound { .. }) => {
            return Ok(found(format!("{}/auth/error?reason=user_not_found", frontend)));
        }
        Err(e) => return Err(e.into()),
    };

    let access_token = issue_access_token(&state, &user)?;
    Ok(found(format!(
        "{}/auth/success?token={}",
        frontend, access_token
    )))
}

/// Current user
///
/// ```text
/// GET /v1/auth/me
/// Authorization: Bearer <jwt>
/// ```
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = state.services.auth.current_user(auth.user_id).await?;
    Ok(Json(user))
}

fn issue_access_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    let claims = Claims::new(user.id, user.email.clone(), state.config.access_token_ttl());
    Ok(create_token(&claims, state.jwt_secret())?)
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Client address and user agent of a login request
///
/// Prefers the first `X-Forwarded-For` hop over the socket address.
fn request_metadata(headers: &HeaderMap, peer: Option<SocketAddr>) -> RequestMetadata {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());
    let ip_address = forwarded.or_else(|| peer.map(|addr| addr.ip().to_string()));

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    RequestMetadata::new(ip_address, user_agent)
}
