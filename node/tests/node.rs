//! Process-level wiring over a real LMDB directory.

use ed25519_dalek::SigningKey;
use reval_gate::DeliveryMode;
use reval_node::{GateConfig, GateNode, NodeError, ProofVerification, Secret};
use std::time::Duration;

fn config(dir: &std::path::Path) -> GateConfig {
    let mut config = GateConfig {
        base_url: "https://gate.example".into(),
        listen_addr: "127.0.0.1:0".into(),
        data_dir: dir.to_path_buf(),
        bot_token: Secret::new("123456:TEST-TOKEN"),
        lmdb_map_size: 16 * 1024 * 1024,
        ..GateConfig::default()
    };
    config.proof.app_id = "app".into();
    config.proof.app_secret = Secret::new("secret");
    config.proof.provider_id = "github".into();
    config.proof.api_base_url = "http://127.0.0.1:1".into();
    config.proof.attestor_keys =
        vec![hex::encode(SigningKey::from_bytes(&[3u8; 32]).verifying_key().as_bytes())];
    config
}

#[tokio::test]
async fn builds_gate_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let node = GateNode::new(config(dir.path())).await.unwrap();
    assert!(!node.gate.accepts_unproven());
    assert_eq!(node.gate.mode(), DeliveryMode::Poll);
    assert_eq!(node.gate.links().webhook_url(), "https://gate.example/api/bot");
}

#[tokio::test]
async fn trust_mode_enables_unproven_completion() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.proof.proof_verification = ProofVerification::Trust;
    config.proof.attestor_keys.clear();
    let node = GateNode::new(config).await.unwrap();
    assert!(node.gate.accepts_unproven());
}

#[tokio::test]
async fn invalid_config_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.proof.attestor_keys = vec!["not-hex".into()];
    assert!(matches!(
        GateNode::new(config).await,
        Err(NodeError::Proof(_))
    ));

    let mut config = self::config(dir.path());
    config.bot_token = Secret::default();
    assert!(matches!(
        GateNode::new(config).await,
        Err(NodeError::Config(_))
    ));
}

#[tokio::test]
async fn starts_and_stops_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let mut node = GateNode::new(config(dir.path())).await.unwrap();
    let shutdown = node.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.shutdown();
    });
    tokio::time::timeout(Duration::from_secs(5), node.start())
        .await
        .expect("start returns after shutdown")
        .unwrap();
    node.stop().await.unwrap();
}
