//! End-to-end tests for the Stencil SDK
//!
//! Drive the full stack (factory, registry, strategy pipeline, schema
//! validation, blocking bridge) over scripted mock transports, so every
//! test is deterministic and offline.
//!
//! To run the live-provider tests at the bottom:
//! 1. Export a real key: `export OPENAI_API_KEY=sk-...`
//! 2. Run: `cargo test -p stencil-sdk --test e2e_tests -- --ignored`

use std::sync::Arc;

use serde_json::{json, Map, Value};

use stencil_provider::{ChatResponse, MockTransport};
use stencil_sdk::{
    register_blueprint, BaseExtractionStrategy, ExtractionError, ExtractionRequest,
    ExtractionStrategy, RegistryEntry, StrategyBlueprint, StrategyFactory, StrategyRegistry,
    TokenUsage,
};

const ARTICLE: &str = "Local markets rallied on Friday after the central bank held rates \
steady, with tech shares leading the gains and analysts calling the mood cautiously upbeat.";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn article_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "headline": {"type": "string"},
            "sentiment": {"type": "string", "enum": ["negative", "neutral", "positive"]}
        },
        "required": ["headline", "sentiment"]
    })
}

fn news_blueprint() -> StrategyBlueprint {
    StrategyBlueprint::new(
        "news",
        article_schema(),
        "Extract the headline and overall sentiment from the article.",
    )
    .with_description("Headline and sentiment extraction")
    .with_category("document")
}

fn mock_entry(blueprint: StrategyBlueprint, transport: MockTransport) -> RegistryEntry {
    RegistryEntry::new(
        blueprint.name.clone(),
        blueprint.description.clone(),
        blueprint.category.clone(),
        Arc::new(move |config| {
            let resolved = blueprint.resolve_config(config);
            let strategy = BaseExtractionStrategy::with_transport(
                blueprint.clone(),
                resolved,
                transport.clone(),
            )?;
            Ok(Box::new(strategy) as Box<dyn ExtractionStrategy>)
        }),
    )
}

fn registry_with(entries: impl IntoIterator<Item = RegistryEntry>) -> Arc<StrategyRegistry> {
    let registry = Arc::new(StrategyRegistry::new());
    registry
        .register_all(entries)
        .expect("Failed to register test strategies");
    registry
}

fn config(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn field_blueprint(name: &str) -> StrategyBlueprint {
    StrategyBlueprint::new(
        name,
        json!({"type": "object"}),
        format!("Extract {} fields from the text.", name),
    )
}

#[tokio::test]
async fn test_e2e_headline_sentiment_extraction() -> anyhow::Result<()> {
    init_tracing();

    let transport = MockTransport::default();
    transport.push_response(ChatResponse {
        content: r#"{"headline": "Markets rally as rates hold", "sentiment": "positive"}"#
            .to_string(),
        model: Some("gpt-4o-mini".to_string()),
        usage: Some(TokenUsage {
            prompt_tokens: 120,
            completion_tokens: 24,
            total_tokens: 144,
        }),
    });

    let registry = registry_with([mock_entry(news_blueprint(), transport.clone())]);
    let factory = StrategyFactory::with_registry(registry);
    let strategy = factory.create("news", &Map::new())?;

    let result = strategy
        .extract(ExtractionRequest::new("https://example.com/markets", ARTICLE))
        .await?;

    assert_eq!(
        result.fields.get("headline"),
        Some(&json!("Markets rally as rates hold"))
    );
    assert_eq!(result.fields.get("sentiment"), Some(&json!("positive")));

    assert_eq!(result.metadata.strategy, "news");
    assert_eq!(result.metadata.strategy_version, "1.0.0");
    assert_eq!(result.metadata.source_ref, "https://example.com/markets");
    assert_eq!(result.metadata.performance.attempts, 1);
    assert!(result.metadata.performance.duration_seconds >= 0.0);
    let usage = result.metadata.performance.usage.expect("usage reported");
    assert_eq!(usage.total_tokens, 144);
    assert!(result.metadata.member_failures.is_empty());

    // The provider saw the instruction, the article, and the schema.
    let request = transport.last_request().expect("one provider call");
    assert!(request.messages[0].content.contains("headline"));
    assert!(request.messages[1].content.contains("rallied"));
    assert!(request.response_schema.is_some());
    Ok(())
}

#[tokio::test]
async fn test_e2e_missing_required_field_is_filled() {
    let transport = MockTransport::new(r#"{"headline": "Markets rally"}"#);
    let registry = registry_with([mock_entry(news_blueprint(), transport.clone())]);
    let factory = StrategyFactory::with_registry(registry);

    let strategy = factory.create("news", &Map::new()).unwrap();
    let result = strategy
        .extract(ExtractionRequest::new("doc-1", ARTICLE))
        .await
        .expect("Extraction with filled field");

    assert_eq!(result.fields.get("headline"), Some(&json!("Markets rally")));
    assert_eq!(result.fields.get("sentiment"), Some(&json!("")));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_e2e_schema_violation_is_not_retried() {
    let transport = MockTransport::new(r#"{"headline": "Markets rally", "sentiment": "ecstatic"}"#);
    let registry = registry_with([mock_entry(news_blueprint(), transport.clone())]);
    let factory = StrategyFactory::with_registry(registry);

    let strategy = factory.create("news", &Map::new()).unwrap();
    let err = strategy
        .extract(ExtractionRequest::new("doc-1", ARTICLE))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "content_parsing");
    assert!(err.to_string().contains("sentiment"));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_e2e_parse_failure_is_not_retried() {
    let transport = MockTransport::new("I could not find any structured data, sorry!");
    let registry = registry_with([mock_entry(news_blueprint(), transport.clone())]);
    let factory = StrategyFactory::with_registry(registry);

    let strategy = factory.create("news", &Map::new()).unwrap();
    let err = strategy
        .extract(ExtractionRequest::new("doc-1", ARTICLE))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "content_parsing");
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_e2e_retry_bound_is_max_retries_plus_one() {
    let transport = MockTransport::default();
    for _ in 0..4 {
        transport.push_error(ExtractionError::ApiConnection(
            "connection reset by peer".to_string(),
        ));
    }

    let registry = registry_with([mock_entry(news_blueprint(), transport.clone())]);
    let factory = StrategyFactory::with_registry(registry);
    let strategy = factory
        .create("news", &config(&[("max_retries", json!(3))]))
        .unwrap();

    let err = strategy
        .extract(ExtractionRequest::new("doc-1", ARTICLE))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "api_connection");
    assert_eq!(transport.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_e2e_retry_then_success_reports_attempts() {
    let transport = MockTransport::default();
    transport.push_error(ExtractionError::ApiResponse {
        status: 429,
        message: "rate limited".to_string(),
        body: None,
    });
    transport.push_error(ExtractionError::ApiConnection("timed out".to_string()));
    transport.push_content(r#"{"headline": "Recovered", "sentiment": "neutral"}"#);

    let registry = registry_with([mock_entry(news_blueprint(), transport.clone())]);
    let factory = StrategyFactory::with_registry(registry);
    let strategy = factory.create("news", &Map::new()).unwrap();

    let result = strategy
        .extract(ExtractionRequest::new("doc-1", ARTICLE))
        .await
        .expect("Extraction after retries");

    assert_eq!(result.metadata.performance.attempts, 3);
    assert_eq!(transport.call_count(), 3);
    assert_eq!(result.fields.get("headline"), Some(&json!("Recovered")));
}

#[tokio::test]
async fn test_e2e_composite_merge_later_member_wins() -> anyhow::Result<()> {
    let registry = registry_with([
        mock_entry(
            field_blueprint("first"),
            MockTransport::new(r#"{"x": 1, "y": 3}"#),
        ),
        mock_entry(field_blueprint("second"), MockTransport::new(r#"{"x": 2}"#)),
    ]);
    let factory = StrategyFactory::with_registry(registry);

    let composite = factory.create_composite(&[
        ("first".to_string(), Map::new()),
        ("second".to_string(), Map::new()),
    ])?;
    let result = composite
        .extract(ExtractionRequest::new("doc-1", "Some text."))
        .await?;

    assert_eq!(result.fields.get("x"), Some(&json!(2)));
    assert_eq!(result.fields.get("y"), Some(&json!(3)));
    assert_eq!(result.metadata.strategy, "composite");
    assert!(result.metadata.member_failures.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_e2e_composite_partial_failure_recorded() {
    let failing = MockTransport::default();
    failing.push_error(ExtractionError::ApiResponse {
        status: 500,
        message: "upstream exploded".to_string(),
        body: None,
    });

    let registry = registry_with([
        mock_entry(
            field_blueprint("first"),
            MockTransport::new(r#"{"x": 1, "y": 3}"#),
        ),
        mock_entry(field_blueprint("second"), failing),
    ]);
    let factory = StrategyFactory::with_registry(registry);

    let composite = factory
        .create_composite(&[
            ("first".to_string(), Map::new()),
            ("second".to_string(), Map::new()),
        ])
        .unwrap();
    let result = composite
        .extract(ExtractionRequest::new("doc-1", "Some text."))
        .await
        .expect("Partial success still returns a result");

    assert_eq!(result.fields.get("x"), Some(&json!(1)));
    assert_eq!(result.fields.get("y"), Some(&json!(3)));
    assert_eq!(result.metadata.member_failures.len(), 1);
    let failure = &result.metadata.member_failures[0];
    assert_eq!(failure.strategy, "second");
    assert_eq!(failure.kind, "api_response");
    assert!(failure.message.contains("upstream exploded"));
}

#[tokio::test]
async fn test_e2e_composite_fail_fast_returns_first_member_error() {
    let first_failing = MockTransport::default();
    first_failing.push_error(ExtractionError::ApiResponse {
        status: 400,
        message: "bad request".to_string(),
        body: None,
    });
    let second_failing = MockTransport::default();
    second_failing.push_error(ExtractionError::ApiResponse {
        status: 500,
        message: "server error".to_string(),
        body: None,
    });

    let registry = registry_with([
        mock_entry(field_blueprint("first"), first_failing),
        mock_entry(field_blueprint("second"), second_failing),
    ]);
    let factory = StrategyFactory::with_registry(registry);

    let composite = factory
        .create_composite(&[
            ("first".to_string(), Map::new()),
            ("second".to_string(), Map::new()),
        ])
        .unwrap()
        .fail_fast(true);

    let err = composite
        .extract(ExtractionRequest::new("doc-1", "Some text."))
        .await
        .unwrap_err();

    match err {
        ExtractionError::ApiResponse { status, .. } => assert_eq!(status, 400),
        other => panic!("Unexpected error: {:?}", other),
    }
}

#[test]
fn test_e2e_sync_bridge_matches_async() {
    let content = r#"{"headline": "Markets rally", "sentiment": "positive"}"#;

    let sync_registry = registry_with([mock_entry(news_blueprint(), MockTransport::new(content))]);
    let sync_strategy = StrategyFactory::with_registry(sync_registry)
        .create_sync("news", &Map::new())
        .expect("Failed to create blocking strategy");
    let sync_result = sync_strategy
        .extract(ExtractionRequest::new("doc-1", ARTICLE))
        .expect("Blocking extraction");

    let async_registry = registry_with([mock_entry(news_blueprint(), MockTransport::new(content))]);
    let async_strategy = StrategyFactory::with_registry(async_registry)
        .create("news", &Map::new())
        .expect("Failed to create strategy");
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let async_result = runtime
        .block_on(async_strategy.extract(ExtractionRequest::new("doc-1", ARTICLE)))
        .expect("Async extraction");

    assert_eq!(sync_result.fields, async_result.fields);
    assert_eq!(sync_result.metadata.strategy, async_result.metadata.strategy);
    // Each call is a distinct extraction.
    assert_ne!(
        sync_result.metadata.extraction_id,
        async_result.metadata.extraction_id
    );
}

#[test]
fn test_e2e_sync_composite_full_flow() {
    let registry = registry_with([
        mock_entry(
            field_blueprint("first"),
            MockTransport::new(r#"{"x": 1, "y": 3}"#),
        ),
        mock_entry(field_blueprint("second"), MockTransport::new(r#"{"x": 2}"#)),
    ]);
    let factory = StrategyFactory::with_registry(registry);

    let composite = factory
        .create_composite_sync(&[
            ("first".to_string(), Map::new()),
            ("second".to_string(), Map::new()),
        ])
        .expect("Failed to create blocking composite");

    let result = composite
        .extract(ExtractionRequest::new("doc-1", "Some text."))
        .expect("Blocking composite extraction");

    assert_eq!(result.fields.get("x"), Some(&json!(2)));
    assert_eq!(result.fields.get("y"), Some(&json!(3)));
    assert_eq!(composite.name(), "composite");
}

#[tokio::test]
async fn test_e2e_connection_check_reports_member_failures() {
    let failing = MockTransport::default();
    failing.push_error(ExtractionError::ApiConnection("dns failure".to_string()));

    let registry = registry_with([
        mock_entry(field_blueprint("first"), MockTransport::default()),
        mock_entry(field_blueprint("second"), failing),
    ]);
    let factory = StrategyFactory::with_registry(registry);

    let composite = factory
        .create_composite(&[
            ("first".to_string(), Map::new()),
            ("second".to_string(), Map::new()),
        ])
        .unwrap();

    let check = composite.validate_provider_connection().await;
    assert!(!check.ok);
    let detail = check.error.expect("failure detail");
    assert!(detail.contains("second"));
    assert!(detail.contains("dns failure"));
}

// ============================================================================
// Live provider tests (require a real API key and network access)
// Run with: cargo test -p stencil-sdk --test e2e_tests -- --ignored
// ============================================================================

#[tokio::test]
#[ignore] // Requires OPENAI_API_KEY and network access
async fn test_live_openai_headline_extraction() {
    init_tracing();
    let api_token = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");

    let registry = Arc::new(StrategyRegistry::new());
    register_blueprint(&registry, news_blueprint()).expect("Failed to register strategy");
    let factory = StrategyFactory::with_registry(registry);

    let strategy = factory
        .create("news", &config(&[("api_token", json!(api_token))]))
        .expect("Failed to create strategy");

    let check = strategy.validate_provider_connection().await;
    assert!(check.ok, "connection check failed: {:?}", check.error);

    let result = strategy
        .extract(ExtractionRequest::new("live-test", ARTICLE))
        .await
        .expect("Live extraction");

    assert!(result.fields.contains_key("headline"));
    assert!(result.fields.contains_key("sentiment"));
    assert!(result.metadata.performance.usage.is_some());
}
