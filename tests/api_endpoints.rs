//! Integration tests for picochain API endpoints
//!
//! Each test runs a node with an empty peer registry, so peer sync is a
//! no-op and the endpoints exercise local ledger behavior end to end.

use axum_test::TestServer;
use picochain::api::{build_router, AppState};
use picochain::blockchain::Blockchain;
use picochain::registry::NodeRegistry;
use serde_json::{json, Value};
use tempfile::TempDir;

fn test_server() -> (TestServer, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let registry = NodeRegistry::new(dir.path().join("nodes.json"));
    let state = AppState::new(
        Blockchain::new(1, 100),
        registry,
        "http://localhost:0".to_string(),
    );
    let server = TestServer::new(build_router(state)).expect("Failed to create test server");
    (server, dir)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _dir) = test_server();

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_generate_wallet() {
    let (server, _dir) = test_server();

    let response = server.get("/generate-wallet").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();

    // Compressed secp256k1 public key: 33 bytes, 66 hex chars.
    let address = json["address"].as_str().unwrap();
    assert_eq!(address.len(), 66);
    let private_key = json["private_key"].as_str().unwrap();
    assert_eq!(private_key.len(), 64);
}

#[tokio::test]
async fn test_replace_chain_synthesizes_genesis() {
    let (server, _dir) = test_server();

    // Fresh node, nothing mined yet, no peers: chain is empty until the
    // first sync, which synthesizes genesis.
    let response = server.get("/chain").await;
    let chain: Value = response.json();
    assert_eq!(chain.as_array().unwrap().len(), 0);

    let response = server.get("/replace-chain").await;
    assert_eq!(response.status_code(), 200);
    let chain: Value = response.json();
    assert_eq!(chain.as_array().unwrap().len(), 1);
    assert_eq!(chain[0]["previous_hash"], "0");
}

#[tokio::test]
async fn test_mine_and_check_balance() {
    let (server, _dir) = test_server();

    let wallet: Value = server.get("/generate-wallet").await.json();
    let address = wallet["address"].as_str().unwrap();

    let response = server.post("/mine").json(&json!({ "address": address })).await;
    assert_eq!(response.status_code(), 200);
    let block: Value = response.json();
    assert!(block["hash"].as_str().unwrap().starts_with('0'));
    assert_eq!(block["transactions"].as_array().unwrap().len(), 1);

    let response = server
        .post("/balance")
        .json(&json!({ "address": address }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["balance"], 100);

    let response = server.get("/latest-block").await;
    assert_eq!(response.status_code(), 200);
    let latest: Value = response.json();
    assert_eq!(latest["hash"], block["hash"]);
}

#[tokio::test]
async fn test_mine_rejects_empty_address() {
    let (server, _dir) = test_server();

    let response = server.post("/mine").json(&json!({ "address": "" })).await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_send_and_overspend() {
    let (server, _dir) = test_server();

    let wallet: Value = server.get("/generate-wallet").await.json();
    let address = wallet["address"].as_str().unwrap();
    let private_key = wallet["private_key"].as_str().unwrap();

    // Fund the wallet with one mining reward.
    server.post("/mine").json(&json!({ "address": address })).await;

    let response = server
        .post("/send")
        .json(&json!({
            "from": address,
            "to": "bob",
            "amount": 40,
            "private_key": private_key
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    let tx: Value = response.json();
    assert!(tx["signature"].is_string());

    // 40 pending + 70 exceeds the 100 balance.
    let response = server
        .post("/send")
        .json(&json!({
            "from": address,
            "to": "carol",
            "amount": 70,
            "private_key": private_key
        }))
        .await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("balance"));

    let pending: Value = server.get("/pending-transactions").await.json();
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let valid: Value = server.get("/valid-pending-transactions").await.json();
    assert_eq!(valid.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_send_with_wrong_key_rejected() {
    let (server, _dir) = test_server();

    let wallet: Value = server.get("/generate-wallet").await.json();
    let address = wallet["address"].as_str().unwrap();
    let other: Value = server.get("/generate-wallet").await.json();

    server.post("/mine").json(&json!({ "address": address })).await;

    let response = server
        .post("/send")
        .json(&json!({
            "from": address,
            "to": "bob",
            "amount": 10,
            "private_key": other["private_key"].as_str().unwrap()
        }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_transactions_for_address() {
    let (server, _dir) = test_server();

    let wallet: Value = server.get("/generate-wallet").await.json();
    let address = wallet["address"].as_str().unwrap();
    let private_key = wallet["private_key"].as_str().unwrap();

    server.post("/mine").json(&json!({ "address": address })).await;
    server
        .post("/send")
        .json(&json!({
            "from": address,
            "to": "bob",
            "amount": 25,
            "private_key": private_key
        }))
        .await;
    server.post("/mine").json(&json!({ "address": address })).await;

    let response = server.get(&format!("/transactions/{}", address)).await;
    assert_eq!(response.status_code(), 200);
    let history: Value = response.json();
    // Two rewards plus the send.
    assert_eq!(history.as_array().unwrap().len(), 3);

    let bob: Value = server.get("/transactions/bob").await.json();
    assert_eq!(bob.as_array().unwrap().len(), 1);
    assert_eq!(bob[0]["amount"], 25);
}

#[tokio::test]
async fn test_node_registry_endpoints() {
    let (server, _dir) = test_server();

    let nodes: Value = server.get("/nodes").await.json();
    assert_eq!(nodes.as_array().unwrap().len(), 0);

    let response = server
        .post("/nodes")
        .json(&json!({ "url": "http://localhost:3002" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let nodes: Value = server.get("/nodes").await.json();
    assert_eq!(nodes.as_array().unwrap().len(), 1);
    assert_eq!(nodes[0], "http://localhost:3002");

    let response = server.post("/nodes").json(&json!({ "url": "" })).await;
    assert_eq!(response.status_code(), 400);
}
