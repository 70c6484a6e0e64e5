//! HTTP tests against an in-process server backed by a temp-dir database.

mod common;

use chrono::Utc;
use curation::catalog::{NewChannel, NewNode, add_node, create_channel, create_staging_tree};
use curation::store::Store;
use curation::types::{Channel, ContentKind, Invitation, ShareMode};
use reqwest::StatusCode;
use serde_json::{Value, json};

use common::test_server::{TEST_PASSWORD, TestServer, TestUser};

const POST_ONLY_ENDPOINTS: &[&str] = &[
    "/api/publish_channel",
    "/api/activate_channel",
    "/api/get_staged_diff",
    "/api/accept_channel_invite",
    "/api/add_bookmark",
    "/api/remove_bookmark",
    "/api/set_channel_priority",
    "/api/save_token_to_channels/abcdefghij",
    "/accounts/logout",
];

fn channel(server: &TestServer, new: NewChannel) -> Channel {
    create_channel(server.store.as_ref(), new).expect("create channel")
}

fn main_root(channel: &Channel) -> String {
    channel.main_tree_id.clone().expect("main tree")
}

async fn post_json(server: &TestServer, user: &TestUser, path: &str, body: Value) -> reqwest::Response {
    server
        .client()
        .post(server.url(path))
        .bearer_auth(&user.token)
        .json(&body)
        .send()
        .await
        .expect("send request")
}

async fn get_as(server: &TestServer, user: &TestUser, path: &str) -> reqwest::Response {
    server
        .client()
        .get(server.url(path))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("send request")
}

#[tokio::test]
async fn test_health_and_stealth() {
    let server = TestServer::start().await;
    let client = server.client();

    let body = client.get(server.url("/healthz")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "No channels created yet!");

    channel(&server, NewChannel::named("First"));
    let body = client.get(server.url("/healthz")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "First");

    let body = client.get(server.url("/stealthz")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "<3");
}

#[tokio::test]
async fn test_post_only_endpoints_reject_get() {
    let server = TestServer::start().await;
    let client = server.client();

    for path in POST_ONLY_ENDPOINTS {
        let resp = client
            .get(server.url(path))
            .bearer_auth(&server.admin.token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "GET {path}");
        assert_eq!(
            resp.text().await.unwrap(),
            "Only POST requests are allowed on this endpoint."
        );
    }
}

#[tokio::test]
async fn test_accessible_channels_visibility() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");
    let bob = server.create_user("bob@example.com");

    let public = channel(&server, NewChannel::named("Public").public());
    let edited = channel(&server, NewChannel::named("Edited").edited_by(alice.id()));
    let viewed = channel(&server, NewChannel::named("Viewed").edited_by(bob.id()));
    server.store.add_channel_viewer(&viewed.id, alice.id()).unwrap();
    let deleted = channel(&server, NewChannel::named("Deleted").public().edited_by(alice.id()));
    server.store.set_channel_deleted(&deleted.id, true).unwrap();
    let private = channel(&server, NewChannel::named("Private").edited_by(bob.id()));

    let resp = get_as(&server, &alice, &format!("/api/accessible_channels/{}", edited.id)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();

    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Public", "Viewed"]);

    // Without an exclusion match, the edited channel shows up too.
    let resp = get_as(&server, &alice, "/api/accessible_channels/none").await;
    let body: Value = resp.json().await.unwrap();
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&main_root(&edited).as_str()));
    assert!(!ids.contains(&main_root(&deleted).as_str()));
    assert!(!ids.contains(&main_root(&private).as_str()));

    // Public channels are visible to everyone except when excluded.
    let resp = get_as(&server, &bob, &format!("/api/accessible_channels/{}", public.id)).await;
    let body: Value = resp.json().await.unwrap();
    assert!(
        body.as_array()
            .unwrap()
            .iter()
            .all(|c| c["id"] != main_root(&public).as_str())
    );
}

#[tokio::test]
async fn test_accessible_channels_shape() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");

    let full = channel(&server, NewChannel::named("Full").public());
    let root = main_root(&full);
    let topic = add_node(server.store.as_ref(), &root, NewNode::topic("Unit 1")).unwrap();
    let video = add_node(server.store.as_ref(), &root, NewNode::resource(ContentKind::Video, "c1")).unwrap();
    add_node(server.store.as_ref(), &topic.id, NewNode::resource(ContentKind::Video, "c1")).unwrap();
    add_node(server.store.as_ref(), &topic.id, NewNode::resource(ContentKind::Exercise, "c2")).unwrap();

    let empty = channel(&server, NewChannel::named("Empty").public());

    let resp = get_as(&server, &alice, "/api/accessible_channels/none").await;
    let body: Value = resp.json().await.unwrap();
    let channels = body.as_array().unwrap();

    let empty_entry = &channels[0];
    assert_eq!(
        empty_entry,
        &json!({
            "id": main_root(&empty),
            "title": "Empty",
            "metadata": { "resource_count": 0 },
            "children": [],
        })
    );

    let full_entry = &channels[1];
    assert_eq!(full_entry["id"], root.as_str());
    assert_eq!(full_entry["title"], "Full");
    // Two nodes share content_id c1, so they count once.
    assert_eq!(full_entry["metadata"]["resource_count"], 2);

    let mut children: Vec<&str> = full_entry["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    children.sort_unstable();
    let mut expected = vec![topic.id.as_str(), video.id.as_str()];
    expected.sort_unstable();
    assert_eq!(children, expected);
}

#[tokio::test]
async fn test_accessible_channels_requires_token_or_session() {
    let server = TestServer::start().await;
    let client = server.client();

    let resp = client
        .get(server.url("/api/accessible_channels/none"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(server.url("/api/accessible_channels/none"))
        .basic_auth("admin@example.com", Some(TEST_PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_public_channels_are_cached() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");
    channel(&server, NewChannel::named("Early").public());
    channel(&server, NewChannel::named("Hidden"));

    let body: Value = get_as(&server, &alice, "/api/public_channels").await.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Early");

    channel(&server, NewChannel::named("Late").public());
    let body: Value = get_as(&server, &alice, "/api/public_channels").await.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bookmarks() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");
    let bob = server.create_user("bob@example.com");
    let target = channel(&server, NewChannel::named("Target").public());

    let resp = post_json(
        &server,
        &alice,
        "/api/add_bookmark",
        json!({ "user_id": alice.id(), "channel_id": "missing" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = post_json(
        &server,
        &alice,
        "/api/add_bookmark",
        json!({ "user_id": alice.id(), "channel_id": target.id }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "success": true }));
    assert!(server.store.is_bookmarked(&target.id, alice.id()).unwrap());

    let resp = post_json(
        &server,
        &bob,
        "/api/remove_bookmark",
        json!({ "user_id": alice.id(), "channel_id": target.id }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = post_json(
        &server,
        &alice,
        "/api/remove_bookmark",
        json!({ "user_id": alice.id(), "channel_id": target.id }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!server.store.is_bookmarked(&target.id, alice.id()).unwrap());
}

#[tokio::test]
async fn test_set_channel_priority() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");
    let bob = server.create_user("bob@example.com");
    let mine = channel(&server, NewChannel::named("Mine").edited_by(alice.id()));

    let resp = post_json(
        &server,
        &alice,
        "/api/set_channel_priority",
        json!({ "channel_id": "missing", "priority": 3 }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = post_json(
        &server,
        &bob,
        "/api/set_channel_priority",
        json!({ "channel_id": mine.id, "priority": 3 }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = post_json(
        &server,
        &alice,
        "/api/set_channel_priority",
        json!({ "channel_id": mine.id, "priority": 3 }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(server.store.get_channel(&mine.id).unwrap().unwrap().priority, 3);
}

#[tokio::test]
async fn test_publish_channel_queues_export() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");
    let mine = channel(&server, NewChannel::named("Mine").edited_by(alice.id()));

    let resp = post_json(&server, &alice, "/api/publish_channel", json!({})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = post_json(&server, &alice, "/api/publish_channel", json!({ "channel_id": mine.id })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let task: Value = resp.json().await.unwrap();
    assert_eq!(task["task_type"], "export-channel");
    assert_eq!(task["status"], "QUEUED");
    assert_eq!(task["metadata"]["affects"]["channels"], json!([mine.id]));

    let stored = server.store.get_task(task["id"].as_str().unwrap()).unwrap().unwrap();
    assert_eq!(stored.args["channel_id"], mine.id.as_str());
    assert_eq!(stored.user_id, alice.id());
}

#[tokio::test]
async fn test_staged_diff_and_activation() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");
    let bob = server.create_user("bob@example.com");
    let mine = channel(&server, NewChannel::named("Mine").edited_by(alice.id()));
    add_node(server.store.as_ref(), &main_root(&mine), NewNode::resource(ContentKind::Video, "c1")).unwrap();

    let body = json!({ "channel_id": mine.id });

    let resp = post_json(&server, &alice, "/api/get_staged_diff", body.clone()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = post_json(&server, &alice, "/api/activate_channel", body.clone()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let staged = create_staging_tree(server.store.as_ref(), &mine.id).unwrap();
    add_node(server.store.as_ref(), &staged, NewNode::resource(ContentKind::Video, "c1")).unwrap();
    add_node(server.store.as_ref(), &staged, NewNode::resource(ContentKind::Audio, "c2")).unwrap();

    let resp = post_json(&server, &alice, "/api/get_staged_diff", body.clone()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rows: Value = resp.json().await.unwrap();
    let resources = rows
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["field"] == "# of Resources")
        .unwrap();
    assert_eq!(resources["live"], 1);
    assert_eq!(resources["staged"], 2);
    assert_eq!(resources["difference"], 1);

    let resp = post_json(&server, &bob, "/api/activate_channel", body.clone()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = post_json(&server, &alice, "/api/activate_channel", body).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "success": true }));

    let activated = server.store.get_channel(&mine.id).unwrap().unwrap();
    assert_eq!(activated.main_tree_id.as_deref(), Some(staged.as_str()));
    assert_eq!(activated.previous_tree_id, mine.main_tree_id);
    assert_eq!(activated.staging_tree_id, None);
}

#[tokio::test]
async fn test_accept_channel_invite() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");
    let bob = server.create_user("bob@example.com");
    let shared = channel(&server, NewChannel::named("Shared").edited_by(bob.id()));

    let invitation = Invitation {
        id: "inv-1".to_string(),
        channel_id: shared.id.clone(),
        email: "alice@example.com".to_string(),
        invited_id: None,
        sender_id: Some(bob.id().to_string()),
        share_mode: ShareMode::View,
        created_at: Utc::now(),
    };
    server.store.create_invitation(&invitation).unwrap();

    let resp = post_json(&server, &bob, "/api/accept_channel_invite", json!({ "invitation_id": "inv-1" })).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = post_json(&server, &alice, "/api/accept_channel_invite", json!({ "invitation_id": "missing" })).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = post_json(&server, &alice, "/api/accept_channel_invite", json!({ "invitation_id": "inv-1" })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], shared.id.as_str());
    assert_eq!(body["is_view_only"], true);

    assert!(server.store.is_channel_viewer(&shared.id, alice.id()).unwrap());
    assert!(server.store.get_invitation("inv-1").unwrap().is_none());
}

#[tokio::test]
async fn test_save_token_to_channels() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");
    let bob = server.create_user("bob@example.com");
    let first = channel(&server, NewChannel::named("First").edited_by(alice.id()));
    let second = channel(&server, NewChannel::named("Second").edited_by(alice.id()));
    let theirs = channel(&server, NewChannel::named("Theirs").edited_by(bob.id()));
    let token = server.store.get_primary_secret_token(&first.id).unwrap().unwrap();

    let resp = post_json(&server, &alice, "/api/save_token_to_channels/zzzzzzzzzz", json!([first.id])).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let path = format!("/api/save_token_to_channels/{}", token.token);
    let resp = post_json(&server, &alice, &path, json!([theirs.id])).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = post_json(&server, &alice, &path, json!([first.id, second.id, "unknown"])).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let names: Vec<String> = server
        .store
        .list_secret_token_channels(&token.id)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["First", "Second"]);
}

#[tokio::test]
async fn test_download_channel_content_csv() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");
    let mine = channel(&server, NewChannel::named("Mine").edited_by(alice.id()));

    let resp = get_as(&server, &alice, "/api/download_channel_content_csv/missing").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = get_as(&server, &alice, &format!("/api/download_channel_content_csv/{}", mine.id)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "success": true }));
}

#[tokio::test]
async fn test_constants() {
    let server = TestServer::start().await;
    let client = server.client();

    let kinds: Value = client
        .get(server.url("/api/constants/ContentKind"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(kinds.as_array().unwrap().len(), ContentKind::ALL.len());

    let resp = client.get(server.url("/api/constants/Language")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_prober_channel_is_admin_only() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");

    let resp = get_as(&server, &alice, "/api/probers/get_prober_channel").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let first: Value = get_as(&server, &server.admin, "/api/probers/get_prober_channel")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(first["name"], "Prober channel");

    let second: Value = get_as(&server, &server.admin, "/api/probers/get_prober_channel")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(first["id"], second["id"]);
}

#[tokio::test]
async fn test_user_channel_sets() {
    let server = TestServer::start().await;
    let alice = server.create_user("alice@example.com");
    let mine = channel(&server, NewChannel::named("Mine").edited_by(alice.id()));

    let token = curation::types::SecretToken {
        id: "set-token".to_string(),
        token: "abcdefghij".to_string(),
        is_primary: false,
    };
    server.store.create_secret_token(&token).unwrap();
    server.store.add_channel_secret_token(&mine.id, &token.id).unwrap();
    server
        .store
        .create_channel_set(
            &curation::types::ChannelSet {
                id: "set-1".to_string(),
                name: "Starter pack".to_string(),
                description: String::new(),
                secret_token_id: token.id.clone(),
                created_at: Utc::now(),
            },
            &[alice.id().to_string()],
        )
        .unwrap();

    let body: Value = get_as(&server, &alice, "/api/get_user_channel_sets").await.json().await.unwrap();
    assert_eq!(body[0]["name"], "Starter pack");
    assert_eq!(body[0]["secret_token"]["display_token"], "abcde-fghij");
    assert_eq!(body[0]["secret_token"]["channels"], json!([mine.id]));
}

#[tokio::test]
async fn test_login_session_and_pages() {
    let server = TestServer::start().await;
    let client = server.client();

    let resp = client.get(server.url("/channels")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/accounts/login?next=%2Fchannels");

    let resp = client
        .post(server.url("/accounts/login"))
        .form(&[("email", "admin@example.com"), ("password", "wrong password")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(server.url("/accounts/login"))
        .form(&[
            ("email", "admin@example.com"),
            ("password", TEST_PASSWORD),
            ("next", "/sandbox"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/sandbox");
    let cookie = resp.headers()["set-cookie"]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("sessionid="));

    let resp = client
        .get(server.url("/channels"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("admin@example.com"));

    let resp = client
        .get(server.url("/"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["location"], "/channels");

    let resp = client
        .post(server.url("/accounts/logout"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client
        .get(server.url("/channels"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_sandbox_lists_authored_and_imported_nodes() {
    let server = TestServer::start().await;
    let mine = channel(&server, NewChannel::named("Mine").edited_by(server.admin.id()));
    let root = main_root(&mine);
    add_node(server.store.as_ref(), &root, NewNode::resource(ContentKind::Video, "v1")).unwrap();
    add_node(
        server.store.as_ref(),
        &root,
        NewNode::resource(ContentKind::Document, "d1").imported(),
    )
    .unwrap();

    let resp = get_as(&server, &server.admin, "/sandbox").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("\"content_id\":\"v1\""));
    assert!(html.contains("\"content_id\":\"d1\""));
    assert!(html.contains(&format!("\"channel\":\"{}\"", mine.id)));
}
