use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use chrono::Utc;

use super::password::verify_password;
use super::token::{TokenGenerator, generate_session_key, hash_session_key, parse_token};
use crate::error;
use crate::store::Store;
use crate::types::{Session, Token, User};

pub const SESSION_COOKIE: &str = "sessionid";

/// Username that marks an API token sent through Basic auth.
const TOKEN_BASIC_USERNAME: &str = "x-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Token,
    Basic,
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Token(String),
    Basic { username: String, password: String },
    Session(String),
}

impl Credential {
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        match self {
            Credential::Token(_) => Scheme::Token,
            Credential::Basic { .. } => Scheme::Basic,
            Credential::Session(_) => Scheme::Session,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CredentialError {
    InvalidScheme,
    InvalidToken,
    InvalidCredentials,
    TokenExpired,
    SessionExpired,
    InternalError,
}

/// Decodes `Basic base64(username:password)`.
pub fn extract_basic_auth(header: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (username, password) = credentials.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Finds the session key in the Cookie header, if any.
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Reads a credential from the request headers.
/// The Authorization header wins over the session cookie.
/// Returns None if the request carries no credential at all.
pub fn extract_credential(headers: &HeaderMap) -> Result<Option<Credential>, CredentialError> {
    let auth_header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());

    match auth_header {
        Some(header) => {
            if let Some(token) = header
                .strip_prefix("Token ")
                .or_else(|| header.strip_prefix("Bearer "))
            {
                return Ok(Some(Credential::Token(token.trim().to_string())));
            }
            if header.starts_with("Basic ") {
                let (username, password) =
                    extract_basic_auth(header).ok_or(CredentialError::InvalidCredentials)?;
                return Ok(Some(Credential::Basic { username, password }));
            }
            Err(CredentialError::InvalidScheme)
        }
        None => Ok(extract_session_cookie(headers).map(Credential::Session)),
    }
}

/// Validates a raw API token against the store and returns its owner.
pub fn validate_api_token(store: &dyn Store, raw_token: &str) -> Result<User, CredentialError> {
    let (lookup, _secret) = parse_token(raw_token).map_err(|_| CredentialError::InvalidToken)?;

    let token = store
        .get_token_by_lookup(&lookup)
        .map_err(|_| CredentialError::InternalError)?
        .ok_or(CredentialError::InvalidToken)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(raw_token, &token.token_hash)
        .map_err(|_| CredentialError::InternalError)?
    {
        return Err(CredentialError::InvalidToken);
    }

    if let Some(expires_at) = &token.expires_at {
        if expires_at < &Utc::now() {
            return Err(CredentialError::TokenExpired);
        }
    }

    let user = store
        .get_user(&token.user_id)
        .map_err(|_| CredentialError::InternalError)?
        .ok_or(CredentialError::InvalidToken)?;

    if let Err(e) = store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    Ok(user)
}

fn validate_password(store: &dyn Store, email: &str, password: &str) -> Result<User, CredentialError> {
    let user = store
        .get_user_by_email(email)
        .map_err(|_| CredentialError::InternalError)?
        .ok_or(CredentialError::InvalidCredentials)?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or(CredentialError::InvalidCredentials)?;

    if !verify_password(password, hash).map_err(|_| CredentialError::InternalError)? {
        return Err(CredentialError::InvalidCredentials);
    }

    Ok(user)
}

fn validate_session(store: &dyn Store, key: &str) -> Result<User, CredentialError> {
    let key_hash = hash_session_key(key);
    let session = store
        .get_session(&key_hash)
        .map_err(|_| CredentialError::InternalError)?
        .ok_or(CredentialError::InvalidCredentials)?;

    if session.expires_at < Utc::now() {
        if let Err(e) = store.delete_session(&key_hash) {
            tracing::warn!("Failed to delete expired session: {e}");
        }
        return Err(CredentialError::SessionExpired);
    }

    store
        .get_user(&session.user_id)
        .map_err(|_| CredentialError::InternalError)?
        .ok_or(CredentialError::InvalidCredentials)
}

/// Creates an API token for the user and returns the raw value. Only its hash is stored.
pub fn issue_api_token(store: &dyn Store, user_id: &str) -> error::Result<String> {
    let generator = TokenGenerator::new();
    let (raw_token, lookup, hash) = generator.generate()?;

    store.create_token(&Token {
        id: uuid::Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id: user_id.to_string(),
        created_at: Utc::now(),
        expires_at: None,
        last_used_at: None,
    })?;

    Ok(raw_token)
}

/// Opens a session for the user and returns the raw key to place in the cookie.
pub fn start_session(store: &dyn Store, user_id: &str, ttl: chrono::Duration) -> error::Result<String> {
    let key = generate_session_key();
    let now = Utc::now();
    let expires_at = now
        .checked_add_signed(ttl)
        .ok_or_else(|| error::Error::Config("session lifetime out of range".to_string()))?;
    store.create_session(&Session {
        key_hash: hash_session_key(&key),
        user_id: user_id.to_string(),
        created_at: now,
        expires_at,
    })?;
    Ok(key)
}

/// Ends the session identified by the raw cookie key. Returns false if it was unknown.
pub fn end_session(store: &dyn Store, key: &str) -> error::Result<bool> {
    store.delete_session(&hash_session_key(key))
}

/// Resolves a credential to the user it belongs to.
pub fn authenticate(store: &dyn Store, credential: &Credential) -> Result<User, CredentialError> {
    match credential {
        Credential::Token(raw) => validate_api_token(store, raw),
        Credential::Basic { username, password } if username == TOKEN_BASIC_USERNAME => {
            validate_api_token(store, password)
        }
        Credential::Basic { username, password } => validate_password(store, username, password),
        Credential::Session(key) => validate_session(store, key),
    }
}
