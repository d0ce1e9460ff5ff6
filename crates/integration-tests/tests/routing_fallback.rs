//! Orchestrator routing scenarios driven by mock adapters.
#![cfg_attr(
    test,
    allow(
        clippy::tests_outside_test_module,
        clippy::missing_panics_doc,
        reason = "Allow for integration tests"
    )
)]

use futures::StreamExt as _;
use futures::future::join_all;
use integration_tests::{init_tracing, model, provider, text_model};
use relay_core::{
    Capability, Catalog, ContentType, GenerateRequest, GenerateResult, QualityTier, StreamChunk,
    Strategy,
};
use relay_providers::{MockAdapter, MockOutcome};
use relay_routing::{Orchestrator, RoutingError};
use serde_json::json;
use std::sync::Arc;

fn three_provider_catalog() -> Catalog {
    match Catalog::new(vec![
        provider("alpha", [text_model("alpha-1", 0.0)]),
        provider("beta", [text_model("beta-1", 0.1)]),
        provider("gamma", [text_model("gamma-1", 0.5)]),
    ]) {
        Ok(catalog) => catalog,
        Err(error) => panic!("catalog should be valid: {error}"),
    }
}

#[tokio::test]
async fn test_failures_fall_through_in_cost_order() {
    init_tracing();
    let alpha = MockAdapter::new("alpha").with_default_outcome(MockOutcome::Fail("status 500".to_owned()));
    let beta = MockAdapter::new("beta").with_default_outcome(MockOutcome::Error("timeout".to_owned()));
    let gamma = MockAdapter::new("gamma").with_default_outcome(MockOutcome::Complete(json!("ok")));

    let orchestrator = Orchestrator::builder(three_provider_catalog())
        .with_adapter("alpha", Arc::new(alpha.clone()))
        .with_adapter("beta", Arc::new(beta.clone()))
        .with_adapter("gamma", Arc::new(gamma.clone()))
        .build();

    let result = orchestrator.generate(&GenerateRequest::text("hi")).await;
    assert_eq!(result.provider(), Some("gamma"));
    assert_eq!(result.data(), Some(&json!("ok")));
    assert_eq!(
        (alpha.call_count(), beta.call_count(), gamma.call_count()),
        (1, 1, 1)
    );
}

#[tokio::test]
async fn test_first_success_stops_iteration() {
    let alpha = MockAdapter::new("alpha");
    let beta = MockAdapter::new("beta");
    let orchestrator = Orchestrator::builder(three_provider_catalog())
        .with_adapter("alpha", Arc::new(alpha.clone()))
        .with_adapter("beta", Arc::new(beta.clone()))
        .build();

    let result = orchestrator.generate(&GenerateRequest::text("ping")).await;
    assert_eq!(result.data(), Some(&json!("Mock response for prompt: ping")));
    assert_eq!(alpha.call_count(), 1);
    assert_eq!(beta.call_count(), 0);
}

#[tokio::test]
async fn test_latency_strategy_changes_first_attempt() {
    let catalog = match Catalog::new(vec![
        provider("slow", [text_model("slow-1", 0.0).with_latency(900.0)]),
        provider("fast", [text_model("fast-1", 1.0).with_latency(80.0)]),
        provider("unknown", [text_model("unknown-1", 0.0)]),
    ]) {
        Ok(catalog) => catalog,
        Err(error) => panic!("catalog should be valid: {error}"),
    };
    let orchestrator = Orchestrator::builder(catalog)
        .with_adapter("slow", Arc::new(MockAdapter::new("slow")))
        .with_adapter("fast", Arc::new(MockAdapter::new("fast")))
        .with_adapter("unknown", Arc::new(MockAdapter::new("unknown")))
        .build();

    let by_cost = orchestrator.generate(&GenerateRequest::text("hi")).await;
    assert_eq!(by_cost.provider(), Some("slow"));

    let request = GenerateRequest::text("hi").with_strategy(Strategy::Latency);
    let order: Vec<_> = orchestrator
        .candidates(&request)
        .iter()
        .map(|candidate| candidate.provider_name().to_owned())
        .collect();
    assert_eq!(order, vec!["fast", "slow", "unknown"]);

    let by_latency = orchestrator.generate(&request).await;
    assert_eq!(by_latency.provider(), Some("fast"));
}

#[tokio::test]
async fn test_exhaustion_reports_attempts() {
    let orchestrator = Orchestrator::builder(three_provider_catalog())
        .with_adapter(
            "alpha",
            Arc::new(MockAdapter::new("alpha").with_default_outcome(MockOutcome::Panic("bug".to_owned()))),
        )
        .with_adapter(
            "gamma",
            Arc::new(MockAdapter::new("gamma").with_default_outcome(MockOutcome::Fail("nope".to_owned()))),
        )
        .build();

    let result = orchestrator.generate(&GenerateRequest::text("hi")).await;
    assert_eq!(
        result.error(),
        Some(RoutingError::AllProvidersFailed { attempts: 2 }.to_string().as_str())
    );
    assert!(result.provider().is_none());
}

#[tokio::test]
async fn test_concurrent_requests_share_the_orchestrator() {
    let mock = MockAdapter::new("alpha");
    let orchestrator = Arc::new(
        Orchestrator::builder(three_provider_catalog())
            .with_adapter("alpha", Arc::new(mock.clone()))
            .build(),
    );

    let handles = (0..16).map(|index| {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            orchestrator
                .generate(&GenerateRequest::text(format!("prompt {index}")))
                .await
        })
    });

    for joined in join_all(handles).await {
        let result = match joined {
            Ok(result) => result,
            Err(error) => panic!("task failed: {error}"),
        };
        assert!(result.is_completed());
    }
    assert_eq!(mock.call_count(), 16);
}

#[tokio::test]
async fn test_stream_from_first_streaming_candidate() {
    let plain = MockAdapter::new("alpha");
    let streaming = MockAdapter::new("beta").with_stream(
        "beta-1",
        vec![
            StreamChunk::delta("Hel"),
            StreamChunk::delta("lo"),
            StreamChunk::Completed {
                data: json!("Hello"),
                usage: None,
            },
            StreamChunk::delta("after the end"),
        ],
    );
    let orchestrator = Orchestrator::builder(three_provider_catalog())
        .with_adapter("alpha", Arc::new(plain))
        .with_adapter("beta", Arc::new(streaming))
        .build();

    let chunks: Vec<_> = orchestrator
        .generate_stream(&GenerateRequest::text("hi"))
        .await
        .collect()
        .await;
    assert_eq!(chunks.len(), 3);
    assert!(matches!(chunks.last(), Some(StreamChunk::Completed { .. })));
}

#[tokio::test]
async fn test_stream_without_streaming_provider_yields_one_error() {
    let orchestrator = Orchestrator::builder(three_provider_catalog())
        .with_adapter("alpha", Arc::new(MockAdapter::new("alpha")))
        .build();

    let chunks: Vec<_> = orchestrator
        .generate_stream(&GenerateRequest::text("hi"))
        .await
        .collect()
        .await;
    assert_eq!(chunks.len(), 1);
    assert!(matches!(chunks.first(), Some(StreamChunk::Error { .. })));
}

#[tokio::test]
async fn test_optional_operations_by_provider() -> relay_routing::Result<()> {
    let capable = MockAdapter::new("alpha")
        .with_capability(Capability::Embedding)
        .with_capability(Capability::TokenCounting)
        .with_capability(Capability::SessionTeardown);
    let orchestrator = Orchestrator::builder(three_provider_catalog())
        .with_adapter("alpha", Arc::new(capable.clone()))
        .with_adapter("beta", Arc::new(MockAdapter::new("beta")))
        .build();

    let texts = vec!["ab".to_owned(), "abcd".to_owned()];
    let embeddings = orchestrator.embed_content("alpha", "alpha-1", &texts).await?;
    assert_eq!(embeddings, vec![vec![2.0], vec![4.0]]);

    let tokens = orchestrator
        .count_tokens("alpha", "alpha-1", &GenerateRequest::text("one two three four"))
        .await?;
    assert_eq!(tokens, 4);

    orchestrator.end_chat_session("alpha", "session-9").await?;
    assert_eq!(capable.ended_sessions(), vec!["session-9".to_owned()]);

    assert!(matches!(
        orchestrator.embed_content("beta", "beta-1", &texts).await,
        Err(RoutingError::CapabilityMissing {
            capability: Capability::Embedding,
            ..
        })
    ));
    assert!(matches!(
        orchestrator.end_chat_session("gamma", "session-9").await,
        Err(RoutingError::ProviderNotRegistered(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_image_request_ignores_text_models() {
    let catalog = match Catalog::new(vec![
        provider("alpha", [text_model("alpha-1", 0.0)]),
        provider(
            "painter",
            [model("painter-1", ContentType::Image, 0.3, QualityTier::High)],
        ),
    ]) {
        Ok(catalog) => catalog,
        Err(error) => panic!("catalog should be valid: {error}"),
    };
    let alpha = MockAdapter::new("alpha");
    let orchestrator = Orchestrator::builder(catalog)
        .with_adapter("alpha", Arc::new(alpha.clone()))
        .with_adapter(
            "painter",
            Arc::new(MockAdapter::new("painter").with_default_outcome(MockOutcome::Complete(json!({"url": "img.png"})))),
        )
        .build();

    let result = orchestrator
        .generate(&GenerateRequest::new(ContentType::Image, "a fox"))
        .await;
    assert!(matches!(result, GenerateResult::Completed { ref model, .. } if model == "painter-1"));
    assert_eq!(alpha.call_count(), 0);
}
