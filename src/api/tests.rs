//! Router-level tests
//!
//! Each test builds the full `/api/v1` router over a fresh in-memory
//! database and drives it with `axum-test`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use crate::api::{build_router, AppState};
use crate::config::{Config, OAuthProviderConfig};
use crate::db::{create_test_pool, migrations};
use crate::services::{OAuthClient, OAuthProfile, OAuthProvider};

struct NoOAuth;

#[async_trait]
impl OAuthClient for NoOAuth {
    async fn fetch_profile(
        &self,
        _provider: OAuthProvider,
        _settings: &OAuthProviderConfig,
        _code: &str,
    ) -> anyhow::Result<OAuthProfile> {
        anyhow::bail!("OAuth is not available in tests")
    }
}

async fn test_server() -> TestServer {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();
    let state = AppState::new(pool, &Config::default(), Arc::new(NoOAuth));
    TestServer::new(build_router(state, "http://localhost:3000")).unwrap()
}

/// Register an account and return its bearer token
async fn register(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "correct-horse",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["token"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_health() {
    let server = test_server().await;
    let response = server.get("/api/v1/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["database"], "ok");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let server = test_server().await;
    let token = register(&server, "alice").await;

    let me = server
        .get("/api/v1/auth/me")
        .authorization_bearer(&token)
        .await;
    me.assert_status_ok();
    let body = me.json::<Value>();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "admin");
    assert!(body.get("password_hash").is_none());

    let login = server
        .post("/api/v1/auth/login")
        .json(&json!({"username_or_email": "alice@example.com", "password": "correct-horse"}))
        .await;
    login.assert_status_ok();
    assert!(login.json::<Value>()["token"].is_string());

    let duplicate = server
        .post("/api/v1/auth/register")
        .json(&json!({"username": "alice", "email": "other@example.com", "password": "correct-horse"}))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let server = test_server().await;

    let missing = server.get("/api/v1/auth/me").await;
    missing.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json::<Value>()["error"]["code"], "UNAUTHORIZED");

    let bad = server
        .post("/api/v1/posts")
        .authorization_bearer("not-a-jwt")
        .json(&json!({"title": "t", "content": "c"}))
        .await;
    bad.assert_status(StatusCode::UNAUTHORIZED);

    // A bad token on a public route is treated as anonymous
    server
        .get("/api/v1/posts")
        .authorization_bearer("not-a-jwt")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let server = test_server().await;
    let admin = register(&server, "root").await;
    let member = register(&server, "bob").await;

    server
        .get("/api/v1/admin/stats")
        .authorization_bearer(&member)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let stats = server
        .get("/api/v1/admin/stats")
        .authorization_bearer(&admin)
        .await;
    stats.assert_status_ok();
    assert_eq!(stats.json::<Value>()["users"], 2);
}

#[tokio::test]
async fn test_failed_logins_are_rate_limited() {
    let server = test_server().await;
    register(&server, "carol").await;

    for _ in 0..5 {
        server
            .post("/api/v1/auth/login")
            .json(&json!({"username_or_email": "carol", "password": "wrong-password"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    let limited = server
        .post("/api/v1/auth/login")
        .json(&json!({"username_or_email": "carol", "password": "correct-horse"}))
        .await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.json::<Value>()["error"]["details"]["retry_after"], 900);
}

#[tokio::test]
async fn test_post_lifecycle() {
    let server = test_server().await;
    let author = register(&server, "alice").await;
    let other = register(&server, "bob").await;

    let created = server
        .post("/api/v1/posts")
        .authorization_bearer(&author)
        .json(&json!({"title": "Hello", "content": "First post", "tags": ["Rust", "rust", "axum"]}))
        .await;
    created.assert_status(StatusCode::CREATED);
    let post = created.json::<Value>();
    let id = post["id"].as_i64().unwrap();
    assert_eq!(post["tags"], json!(["axum", "rust"]));

    let viewed = server.get(&format!("/api/v1/posts/{}", id)).await;
    viewed.assert_status_ok();
    assert_eq!(viewed.json::<Value>()["views_count"], 1);

    server
        .put(&format!("/api/v1/posts/{}", id))
        .authorization_bearer(&other)
        .json(&json!({"title": "Hijacked"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let listed = server.get("/api/v1/posts?author=alice&tag=rust").await;
    listed.assert_status_ok();
    assert_eq!(listed.json::<Value>()["total"], 1);

    server
        .delete(&format!("/api/v1/posts/{}", id))
        .authorization_bearer(&author)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get(&format!("/api/v1/posts/{}", id))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_issue_solution_accept_flow() {
    let server = test_server().await;
    let asker = register(&server, "asker").await;
    let helper = register(&server, "helper").await;

    let issue = server
        .post("/api/v1/issues")
        .authorization_bearer(&asker)
        .json(&json!({"title": "Borrow error", "description": "E0502 in a loop"}))
        .await;
    issue.assert_status(StatusCode::CREATED);
    let issue_id = issue.json::<Value>()["id"].as_i64().unwrap();

    let solution = server
        .post(&format!("/api/v1/issues/{}/solutions", issue_id))
        .authorization_bearer(&helper)
        .json(&json!({"content": "Clone the key first"}))
        .await;
    solution.assert_status(StatusCode::CREATED);
    let solution_id = solution.json::<Value>()["id"].as_i64().unwrap();

    server
        .post(&format!("/api/v1/solutions/{}/accept", solution_id))
        .authorization_bearer(&helper)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let accepted = server
        .post(&format!("/api/v1/solutions/{}/accept", solution_id))
        .authorization_bearer(&asker)
        .await;
    accepted.assert_status_ok();
    assert_eq!(accepted.json::<Value>()["is_accepted"], true);

    let issue = server.get(&format!("/api/v1/issues/{}", issue_id)).await;
    let issue = issue.json::<Value>();
    assert_eq!(issue["status"], "resolved");
    assert_eq!(issue["accepted_solution_id"], solution_id);

    let resolved = server.get("/api/v1/issues?status=resolved").await;
    assert_eq!(resolved.json::<Value>()["total"], 1);
    server
        .get("/api/v1/issues?status=bogus")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_votes_toggle() {
    let server = test_server().await;
    let asker = register(&server, "asker").await;
    let voter = register(&server, "voter").await;

    let issue = server
        .post("/api/v1/issues")
        .authorization_bearer(&asker)
        .json(&json!({"title": "Lifetime question", "description": "Why 'static?"}))
        .await;
    let issue_id = issue.json::<Value>()["id"].as_i64().unwrap();

    let vote = |is_dislike: bool| {
        server
            .post("/api/v1/votes")
            .authorization_bearer(&voter)
            .json(&json!({"target_type": "issue", "target_id": issue_id, "is_dislike": is_dislike}))
    };

    let first = vote(false).await.json::<Value>();
    assert_eq!(first["outcome"], "created");
    assert_eq!(first["likes_count"], 1);

    let flipped = vote(true).await.json::<Value>();
    assert_eq!(flipped["outcome"], "changed");
    assert_eq!(flipped["likes_count"], 0);
    assert_eq!(flipped["dislikes_count"], 1);

    let removed = vote(true).await.json::<Value>();
    assert_eq!(removed["outcome"], "removed");
    assert_eq!(removed["dislikes_count"], 0);

    let mine = server
        .get(&format!("/api/v1/votes/issue/{}", issue_id))
        .authorization_bearer(&voter)
        .await;
    assert_eq!(mine.json::<Value>()["voted"], false);
}

#[tokio::test]
async fn test_comment_replies_are_threaded() {
    let server = test_server().await;
    let token = register(&server, "alice").await;

    let post = server
        .post("/api/v1/posts")
        .authorization_bearer(&token)
        .json(&json!({"title": "Threads", "content": "Reply below"}))
        .await;
    let post_id = post.json::<Value>()["id"].as_i64().unwrap();

    let root = server
        .post("/api/v1/comments")
        .authorization_bearer(&token)
        .json(&json!({"target_type": "post", "target_id": post_id, "content": "root"}))
        .await;
    root.assert_status(StatusCode::CREATED);
    let root_id = root.json::<Value>()["id"].as_i64().unwrap();

    server
        .post("/api/v1/comments")
        .authorization_bearer(&token)
        .json(&json!({
            "target_type": "post",
            "target_id": post_id,
            "parent_id": root_id,
            "content": "reply",
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let tree = server
        .get(&format!("/api/v1/comments?target_type=post&target_id={}", post_id))
        .await
        .json::<Value>();
    assert_eq!(tree.as_array().unwrap().len(), 1);
    assert_eq!(tree[0]["replies"][0]["content"], "reply");
}

#[tokio::test]
async fn test_private_collection_is_hidden() {
    let server = test_server().await;
    let owner = register(&server, "owner").await;
    let stranger = register(&server, "stranger").await;

    let created = server
        .post("/api/v1/collections")
        .authorization_bearer(&owner)
        .json(&json!({"name": "Reading list", "is_public": false}))
        .await;
    created.assert_status(StatusCode::CREATED);
    let id = created.json::<Value>()["id"].as_i64().unwrap();
    let path = format!("/api/v1/collections/{}", id);

    server.get(&path).await.assert_status_not_found();
    server
        .get(&path)
        .authorization_bearer(&stranger)
        .await
        .assert_status_not_found();
    server
        .get(&path)
        .authorization_bearer(&owner)
        .await
        .assert_status_ok();

    server
        .post(&format!("{}/collaborators", path))
        .authorization_bearer(&owner)
        .json(&json!({"username": "stranger"}))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .get(&path)
        .authorization_bearer(&stranger)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_follow_and_profile() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    register(&server, "bob").await;

    server
        .post("/api/v1/users/bob/follow")
        .authorization_bearer(&alice)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let status = server
        .get("/api/v1/users/bob/follow")
        .authorization_bearer(&alice)
        .await;
    assert_eq!(status.json::<Value>()["following"], true);

    let followers = server.get("/api/v1/users/bob/followers").await;
    assert_eq!(followers.json::<Value>()["items"][0]["username"], "alice");

    server
        .get("/api/v1/users/nobody")
        .await
        .assert_status_not_found();
}
