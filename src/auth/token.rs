use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const ARGON2_MEMORY: u32 = 64 * 1024; // 64KB
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

const TOKEN_PREFIX: &str = "curation";
const LOOKUP_LENGTH: usize = 8;
const SECRET_LENGTH: usize = 24;
const SECRET_BYTES: usize = 12;

const CHANNEL_TOKEN_LENGTH: usize = 10;
const SESSION_KEY_BYTES: usize = 32;

pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .expect("invalid argon2 params");

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Generates a new API token with the format: curation_<lookup>_<secret>
    /// Returns (raw_token, lookup, hash)
    pub fn generate(&self) -> Result<(String, String, String)> {
        let lookup = generate_lookup();
        let secret = generate_secret();
        let raw_token = build_token(&lookup, &secret);
        let hash = self.hash(&raw_token)?;
        Ok((raw_token, lookup, hash))
    }

    /// Hashes a raw token using Argon2id
    pub fn hash(&self, token: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(token.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("failed to hash token: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verifies a raw token against a stored hash
    pub fn verify(&self, token: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Config(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(token.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Config(format!("failed to verify token: {e}"))),
        }
    }
}

/// Generates the lookup portion of the token (first 8 chars of a UUID)
#[must_use]
fn generate_lookup() -> String {
    let uuid = uuid::Uuid::new_v4();
    uuid.to_string()[..LOOKUP_LENGTH].to_string()
}

#[must_use]
fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)[..SECRET_LENGTH].to_string()
}

#[must_use]
fn build_token(lookup: &str, secret: &str) -> String {
    format!("{TOKEN_PREFIX}_{lookup}_{secret}")
}

/// Parses a token string into its components (lookup, secret)
pub fn parse_token(token: &str) -> Result<(String, String)> {
    let prefix = format!("{TOKEN_PREFIX}_");
    if !token.starts_with(&prefix) {
        return Err(Error::InvalidTokenFormat);
    }

    let parts: Vec<&str> = token.split('_').collect();
    if parts.len() != 3 {
        return Err(Error::InvalidTokenFormat);
    }

    let lookup = parts[1];
    let secret = parts[2];

    if lookup.len() != LOOKUP_LENGTH || secret.len() != SECRET_LENGTH {
        return Err(Error::InvalidTokenFormat);
    }

    Ok((lookup.to_string(), secret.to_string()))
}

/// Generates a shareable channel token: 10 lowercase alphanumerics.
#[must_use]
pub fn generate_channel_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CHANNEL_TOKEN_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Splits a channel token for display: `abcdefghij` -> `abcde-fghij`.
#[must_use]
pub fn format_channel_token(token: &str) -> String {
    match token.char_indices().nth(5) {
        Some((idx, _)) => format!("{}-{}", &token[..idx], &token[idx..]),
        None => format!("{token}-"),
    }
}

/// Generates a random session key for the `sessionid` cookie.
#[must_use]
pub fn generate_session_key() -> String {
    let mut bytes = [0u8; SESSION_KEY_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Sessions are stored by digest so a leaked database does not leak live cookies.
#[must_use]
pub fn hash_session_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_parses_and_verifies() {
        let generator = TokenGenerator::new();
        let (token, lookup, hash) = generator.generate().unwrap();

        let (parsed_lookup, secret) = parse_token(&token).unwrap();
        assert_eq!(parsed_lookup, lookup);
        assert_eq!(token, format!("curation_{lookup}_{secret}"));
        assert!(generator.verify(&token, &hash).unwrap());

        let other = generator.generate().unwrap().0;
        assert!(!generator.verify(&other, &hash).unwrap());
    }

    #[test]
    fn test_parse_token_rejects_malformed() {
        for raw in [
            "",
            "curation",
            "curation_12345678",
            "studio_12345678_123456789012345678901234",
            "curation_1234567_123456789012345678901234",
            "curation_12345678_12345678901234567890123",
            "curation_12345678_123456789012345678901234_extra",
            "x-token",
        ] {
            assert!(
                matches!(parse_token(raw), Err(Error::InvalidTokenFormat)),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn test_channel_token_shape() {
        let token = generate_channel_token();
        assert_eq!(token.len(), 10);
        assert!(token.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_format_channel_token() {
        assert_eq!(format_channel_token("abcdefghij"), "abcde-fghij");
        assert_eq!(format_channel_token("abc"), "abc-");
    }

    #[test]
    fn test_session_key_hash_is_stable() {
        let key = generate_session_key();
        assert_eq!(key.len(), 64);
        assert_eq!(hash_session_key(&key), hash_session_key(&key));
        assert_ne!(hash_session_key(&key), key);
    }
}
