//! Integration tests for the messaging REST surface:
//! sidebar listing, history, and the persist-then-route send path.

use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Helper: start the server on a random port and return the base URL.
async fn start_test_server() -> (String, SocketAddr) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = parley_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = parley_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");

    let state = parley_server::state::AppState {
        db,
        jwt_secret,
        connections: Arc::new(parley_server::ws::ConnectionRegistry::new()),
    };

    let app = parley_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    (format!("http://{}", addr), addr)
}

/// Register a user and return (user_id, session_token).
async fn register_user(base_url: &str, client: &reqwest::Client, name: &str) -> (String, String) {
    let resp = client
        .post(format!("{base_url}/api/auth/register"))
        .json(&json!({
            "fullname": format!("{name} Example"),
            "username": name,
            "email": format!("{name}@example.com"),
            "password": "correct-horse-battery",
            "confirm_password": "correct-horse-battery",
            "gender": "female",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let token = resp
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            v.strip_prefix("token=")
                .map(|rest| rest.split(';').next().unwrap_or("").to_string())
        })
        .expect("session cookie should be set");

    let body: serde_json::Value = resp.json().await.unwrap();
    (body["id"].as_str().unwrap().to_string(), token)
}

#[tokio::test]
async fn sidebar_lists_everyone_but_self() {
    let (base_url, _) = start_test_server().await;
    let client = reqwest::Client::new();

    let (_alice_id, alice_token) = register_user(&base_url, &client, "alice").await;
    let (bob_id, _bob_token) = register_user(&base_url, &client, "bob").await;

    let resp = client
        .get(format!("{base_url}/api/messages/users"))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let users: serde_json::Value = resp.json().await.unwrap();
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], bob_id.as_str());
    assert_eq!(users[0]["fullname"], "bob Example");
    assert!(users[0]["avatar_url"].as_str().unwrap().contains("girl"));
}

#[tokio::test]
async fn send_persists_and_history_is_ascending() {
    let (base_url, _) = start_test_server().await;
    let client = reqwest::Client::new();

    let (alice_id, alice_token) = register_user(&base_url, &client, "alice").await;
    let (bob_id, bob_token) = register_user(&base_url, &client, "bob").await;

    // History before any message is an empty list, not an error
    let resp = client
        .get(format!("{base_url}/api/messages/{bob_id}"))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let history: serde_json::Value = resp.json().await.unwrap();
    assert!(history.as_array().unwrap().is_empty());

    // Sending while the recipient is offline still succeeds: durability does
    // not depend on delivery.
    let resp = client
        .post(format!("{base_url}/api/messages/{bob_id}"))
        .bearer_auth(&alice_token)
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let sent: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(sent["body"], "hi");
    assert_eq!(sent["sender_id"], alice_id.as_str());

    let resp = client
        .post(format!("{base_url}/api/messages/{alice_id}"))
        .bearer_auth(&bob_token)
        .json(&json!({"message": "yo"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Both sides see the same history, oldest first
    for token in [&alice_token, &bob_token] {
        let peer = if token == &alice_token { &bob_id } else { &alice_id };
        let resp = client
            .get(format!("{base_url}/api/messages/{peer}"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let history: serde_json::Value = resp.json().await.unwrap();
        let bodies: Vec<&str> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["body"].as_str().unwrap())
            .collect();
        assert_eq!(bodies, ["hi", "yo"]);
    }
}

#[tokio::test]
async fn send_rejects_bad_targets() {
    let (base_url, _) = start_test_server().await;
    let client = reqwest::Client::new();

    let (alice_id, alice_token) = register_user(&base_url, &client, "alice").await;

    // Unknown recipient
    let resp = client
        .post(format!("{base_url}/api/messages/no-such-user"))
        .bearer_auth(&alice_token)
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Messaging yourself
    let resp = client
        .post(format!("{base_url}/api/messages/{alice_id}"))
        .bearer_auth(&alice_token)
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Empty body
    let resp = client
        .post(format!("{base_url}/api/messages/{alice_id}"))
        .bearer_auth(&alice_token)
        .json(&json!({"message": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // No auth
    let resp = client
        .post(format!("{base_url}/api/messages/{alice_id}"))
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}
