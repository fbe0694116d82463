/// Authentication for Dothe2
///
/// Passwordless: a login request mails a magic link and a 6-digit code, and
/// redeeming either one yields a JWT session token.
///
/// # Modules
///
/// - [`manager`]: token issuance, redemption and sweeping
/// - [`secret`]: bearer token and code generation
/// - [`jwt`]: session token creation and validation
/// - [`middleware`]: Axum layer validating session tokens
///
/// # Example
///
/// ```
/// use dothe2_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(1, "alice@example.com", Duration::days(7));
/// let token = create_token(&claims, "a-secret-key-that-is-at-least-32-bytes")?;
/// assert_eq!(validate_token(&token, "a-secret-key-that-is-at-least-32-bytes")?.email, "alice@example.com");
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod manager;
pub mod middleware;
pub mod secret;
