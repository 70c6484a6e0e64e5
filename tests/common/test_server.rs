use std::sync::Arc;

use curation::auth::{NewUser, issue_api_token, register_user};
use curation::config::ServerConfig;
use curation::server::{AppState, create_router};
use curation::store::{SqliteStore, Store};
use curation::types::User;
use tempfile::TempDir;
use tokio::task::JoinHandle;

pub const TEST_PASSWORD: &str = "correct horse battery";

/// A user seeded directly in the store, with an API token.
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub store: Arc<SqliteStore>,
    pub admin: TestUser,
    server_task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let store = Arc::new(SqliteStore::new(config.db_path()).expect("open store"));
        store.initialize().expect("initialize store");

        let admin = seed_user(&store, "admin@example.com", true);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let base_url = format!("http://127.0.0.1:{port}");

        let state = Arc::new(AppState::new(store.clone(), config));
        let app = create_router(state);
        let server_task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            temp_dir,
            base_url,
            store,
            admin,
            server_task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn create_user(&self, email: &str) -> TestUser {
        seed_user(&self.store, email, false)
    }

    /// Client that reports redirects instead of following them.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("build client")
    }
}

fn seed_user(store: &SqliteStore, email: &str, is_admin: bool) -> TestUser {
    let user = register_user(
        store,
        NewUser {
            email: email.to_string(),
            password: Some(TEST_PASSWORD.to_string()),
            is_admin,
            policies_accepted: true,
            ..Default::default()
        },
    )
    .expect("create user");
    let token = issue_api_token(store, &user.id).expect("create token");
    TestUser { user, token }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}
