use std::sync::Arc;

use crate::auth::{NewUser, SESSION_COOKIE, issue_api_token, register_user, start_session};
use crate::config::ServerConfig;
use crate::server::AppState;
use crate::store::{SqliteStore, Store};
use crate::types::User;

pub fn test_state() -> Arc<AppState> {
    let store = SqliteStore::in_memory().unwrap();
    store.initialize().unwrap();
    Arc::new(AppState::new(Arc::new(store), ServerConfig::default()))
}

pub struct TestUser {
    pub user: User,
    pub session_key: String,
    pub api_token: String,
}

impl TestUser {
    pub fn create(state: &AppState, email: &str) -> Self {
        Self::builder(email).build(state)
    }

    pub fn builder(email: &str) -> TestUserBuilder {
        TestUserBuilder {
            email: email.to_string(),
            is_admin: false,
            policies_accepted: true,
        }
    }

    pub fn cookie(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.session_key)
    }

    pub fn bearer(&self) -> String {
        format!("Token {}", self.api_token)
    }
}

pub struct TestUserBuilder {
    email: String,
    is_admin: bool,
    policies_accepted: bool,
}

impl TestUserBuilder {
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn policies_accepted(mut self, accepted: bool) -> Self {
        self.policies_accepted = accepted;
        self
    }

    pub fn build(self, state: &AppState) -> TestUser {
        let store: &dyn Store = state.store.as_ref();
        let user = register_user(
            store,
            NewUser {
                email: self.email,
                is_admin: self.is_admin,
                policies_accepted: self.policies_accepted,
                ..Default::default()
            },
        )
        .unwrap();
        let session_key = start_session(store, &user.id, chrono::Duration::hours(1)).unwrap();
        let api_token = issue_api_token(store, &user.id).unwrap();

        TestUser {
            user,
            session_key,
            api_token,
        }
    }
}
