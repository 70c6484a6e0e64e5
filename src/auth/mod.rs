mod helpers;
mod middleware;
mod password;
mod token;
mod users;

pub use helpers::{
    Credential, CredentialError, SESSION_COOKIE, Scheme, authenticate, end_session,
    extract_credential, extract_session_cookie, issue_api_token, start_session,
};
pub use middleware::{AuthError, MaybeUser, RequireApiUser, RequireUser, authenticate_parts};
pub use password::{hash_password, verify_password};
pub use token::{
    TokenGenerator, format_channel_token, generate_channel_token, generate_session_key,
    hash_session_key, parse_token,
};
pub use users::{NewUser, register_user};
