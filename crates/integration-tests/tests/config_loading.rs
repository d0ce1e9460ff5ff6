//! Building an orchestrator from a TOML config file.
#![cfg_attr(
    test,
    allow(
        clippy::tests_outside_test_module,
        clippy::unwrap_used,
        clippy::missing_panics_doc,
        reason = "Allow for integration tests"
    )
)]

use integration_tests::{BackendServer, BackendState, init_tracing};
use relay_core::{Error, GenerateRequest, RelayConfig, Strategy};
use relay_providers::MockAdapter;
use relay_routing::{Orchestrator, RoutingError};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn config_toml(backend_url: &str) -> String {
    format!(
        r#"
[[providers]]
name = "vendor"
api_key = "vendor-key"

[[providers.models]]
id = "vendor-large"
content_type = "text"
cost = 3.0
quality = "high"

[[providers]]
name = "local-llm"

[[providers.models]]
id = "llama"
content_type = "text"
cost = 0.0
quality = "medium"

[providers.generic]
base_url = "{backend_url}"
health_check_path = "/health"
request_template = '{{"model": "{{{{model}}}}", "messages": [{{"role": "user", "content": "{{{{prompt}}}}"}}]}}'
response_path = "message.content"
"#
    )
}

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("relay").join("config.toml");
    if let Some(parent) = path.parent()
        && let Err(error) = fs::create_dir_all(parent)
    {
        panic!("failed to create config dir: {error}");
    }
    if let Err(error) = fs::write(&path, contents) {
        panic!("failed to write config: {error}");
    }
    path
}

#[tokio::test]
async fn test_config_file_routes_to_generic_backend() -> relay_routing::Result<()> {
    init_tracing();
    let server = match BackendServer::start(BackendState::default()).await {
        Ok(server) => server,
        Err(error) => panic!("failed to start backend: {error}"),
    };
    server
        .state()
        .push_reply(json!({"message": {"content": "from llama"}}))
        .await;

    let dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(error) => panic!("failed to create temp dir: {error}"),
    };
    let path = write_config(&dir, &config_toml(&server.url()));
    let config = RelayConfig::load_from_file(&path)?;

    let mut orchestrator = Orchestrator::from_config(config)?;
    assert_eq!(orchestrator.adapters().registered_providers(), vec!["local-llm".to_owned()]);

    let vendor = MockAdapter::new("vendor");
    orchestrator.register_adapter("vendor", Arc::new(vendor.clone()));

    let result = orchestrator.generate(&GenerateRequest::text("Hello")).await;
    assert_eq!(result.provider(), Some("local-llm"));
    assert_eq!(result.data(), Some(&json!("from llama")));
    assert_eq!(
        server.state().requests().await,
        vec![json!({"model": "llama", "messages": [{"role": "user", "content": "Hello"}]})]
    );

    let premium = orchestrator
        .generate(&GenerateRequest::text("Hello").with_strategy(Strategy::Quality))
        .await;
    assert_eq!(premium.provider(), Some("vendor"));
    assert_eq!(vendor.call_count(), 1);
    assert_eq!(server.state().health_probe_count(), 1);

    server.shutdown().await;
    Ok(())
}

#[test]
fn test_saved_config_round_trips_through_disk() -> relay_core::Result<()> {
    let dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(error) => panic!("failed to create temp dir: {error}"),
    };
    let original = RelayConfig::from_toml_str(&config_toml("http://127.0.0.1:8080"))?;
    let path = dir.path().join("nested").join("config.toml");
    original.save_to_file(&path)?;

    let reloaded = RelayConfig::load_from_file(&path)?;
    assert_eq!(reloaded.providers.len(), 2);
    let catalog = reloaded.into_catalog_with(|_| None)?;
    assert_eq!(catalog.len(), 2);
    assert!(catalog.model("local-llm", "llama").is_some());
    Ok(())
}

#[test]
fn test_missing_credentials_are_rejected_when_required() {
    let contents = format!("require_credentials = true\n{}", config_toml("http://127.0.0.1:8080"))
        .replace("api_key = \"vendor-key\"\n", "");
    let config = match RelayConfig::from_toml_str(&contents) {
        Ok(config) => config,
        Err(error) => panic!("parse failed: {error}"),
    };

    let error = config.clone().into_catalog_with(|_| None).unwrap_err();
    assert!(matches!(error, Error::MissingApiKey(ref name) if name == "VENDOR_API_KEY"));

    let catalog = config.into_catalog_with(|name| (name == "VENDOR_API_KEY").then(|| "from-env".to_owned()));
    assert!(catalog.is_ok_and(|catalog| {
        catalog
            .provider("vendor")
            .is_some_and(|vendor| vendor.api_key.as_deref() == Some("from-env"))
    }));
}

#[test]
fn test_invalid_generic_backend_fails_orchestrator_construction() {
    let contents = config_toml("not-a-url");
    let config = match RelayConfig::from_toml_str(&contents) {
        Ok(config) => config,
        Err(error) => panic!("parse failed: {error}"),
    };
    assert!(matches!(
        Orchestrator::from_config(config),
        Err(RoutingError::Core(Error::Config(_)))
    ));
}
