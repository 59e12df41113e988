//! Random token generation.
//!
//! Session tokens and upload link tokens are hex strings, which are URL-safe
//! without further escaping.

use rand::Rng;

/// Default number of random bytes in a token.
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// Generate a hex-encoded token from `bytes` random bytes.
///
/// # Examples
///
/// ```
/// use cloudvault::token::generate_token;
///
/// let token = generate_token(16);
/// assert_eq!(token.len(), 32);
/// assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill(&mut buf[..]);
    hex::encode(buf)
}
