/// Secret generation for login tokens
///
/// Each login request gets two secrets:
///
/// - **Bearer token**: 32 bytes from the OS CSPRNG, URL-safe base64 without
///   padding (43 characters), embedded in the magic link
/// - **Code**: 6 decimal digits, typed by the user
///
/// Generation sits behind [`SecretSource`] so tests can make it deterministic.
///
/// # Example
///
/// ```
/// use dothe2_shared::auth::secret::{is_valid_code_format, OsSecretSource, SecretSource};
///
/// let source = OsSecretSource;
/// let token = source.bearer_token();
/// assert_eq!(token.len(), 43);
/// assert!(is_valid_code_format(&source.code()));
/// ```
use crate::models::auth_token::CODE_LENGTH;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

/// Random bytes behind a bearer token
pub const TOKEN_BYTES: usize = 32;

/// Source of login secrets
pub trait SecretSource: Send + Sync {
    /// Opaque, URL-safe bearer token
    fn bearer_token(&self) -> String;

    /// 6-digit numeric code, zero-padded
    fn code(&self) -> String;
}

/// [`SecretSource`] backed by the operating system RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSecretSource;

impl SecretSource for OsSecretSource {
    fn bearer_token(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn code(&self) -> String {
        let value: u32 = OsRng.gen_range(0..1_000_000);
        format!("{:06}", value)
    }
}

/// True for exactly six ASCII digits
pub fn is_valid_code_format(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}
