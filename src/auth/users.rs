use chrono::Utc;
use uuid::Uuid;

use super::password::hash_password;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::User;

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Users without a password can only sign in with an API token.
    pub password: Option<String>,
    pub is_admin: bool,
    pub policies_accepted: bool,
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(Error::BadRequest(format!("'{email}' is not a valid email address"))),
    }
}

/// Creates a user, hashing the password if one is given.
pub fn register_user(store: &dyn Store, new: NewUser) -> Result<User> {
    let email = new.email.trim().to_lowercase();
    validate_email(&email)?;

    let password_hash = new.password.as_deref().map(hash_password).transpose()?;
    let now = Utc::now();

    let user = User {
        id: Uuid::new_v4().simple().to_string(),
        email,
        first_name: new.first_name,
        last_name: new.last_name,
        password_hash,
        is_admin: new.is_admin,
        policies_accepted: new.policies_accepted,
        content_defaults: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    tracing::info!(user_id = %user.id, is_admin = user.is_admin, "Registered user");
    Ok(user)
}
