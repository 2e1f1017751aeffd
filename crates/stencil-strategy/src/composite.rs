//! Composite strategy: fan-out over members and merge

use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Map;
use tracing::{info, warn};

use stencil_domain::{
    ConnectionCheck, ExtractionError, ExtractionRequest, ExtractionResult, ExtractionStrategy,
    MemberFailure, Performance, ResultMetadata, TokenUsage,
};

/// Strategy name attached to merged results
pub const COMPOSITE_STRATEGY_NAME: &str = "composite";

/// Runs an ordered list of member strategies against the same input and
/// merges their field maps into one result
///
/// Members run concurrently; outcomes are collected in member order, so
/// the merge is deterministic regardless of completion order. The merge
/// is left to right with the later member winning a key collision.
///
/// By default a failed member is recorded in the result metadata and the
/// remaining members still contribute (partial success); the composite
/// returns `Ok` even when every member fails. `fail_fast(true)` instead
/// surfaces the first error in member order.
#[derive(Debug)]
pub struct CompositeStrategy {
    members: Vec<Box<dyn ExtractionStrategy>>,
    fail_fast: bool,
}

impl CompositeStrategy {
    /// Create a composite over the given members
    pub fn new(members: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self {
            members,
            fail_fast: false,
        }
    }

    /// Fail the whole composite on the first member error instead of
    /// recording it and continuing
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Number of member strategies
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the composite has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl ExtractionStrategy for CompositeStrategy {
    fn name(&self) -> &str {
        COMPOSITE_STRATEGY_NAME
    }

    async fn extract(
        &self,
        request: ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractionError> {
        let started = Instant::now();

        info!(
            "Starting composite extraction with {} members for source '{}'",
            self.members.len(),
            request.source_ref
        );

        let calls = self
            .members
            .iter()
            .map(|member| member.extract(request.clone()));
        let outcomes = join_all(calls).await;

        let mut fields = Map::new();
        let mut member_failures = Vec::new();
        let mut total_attempts: u32 = 0;
        let mut usage_total = TokenUsage::default();
        let mut saw_usage = false;

        for (member, outcome) in self.members.iter().zip(outcomes) {
            match outcome {
                Ok(result) => {
                    total_attempts += result.metadata.performance.attempts;
                    if let Some(usage) = result.metadata.performance.usage {
                        usage_total.prompt_tokens += usage.prompt_tokens;
                        usage_total.completion_tokens += usage.completion_tokens;
                        usage_total.total_tokens += usage.total_tokens;
                        saw_usage = true;
                    }
                    // Later members win key collisions
                    for (key, value) in result.fields {
                        fields.insert(key, value);
                    }
                }
                Err(err) => {
                    if self.fail_fast {
                        return Err(err);
                    }
                    warn!("Composite member '{}' failed: {}", member.name(), err);
                    member_failures.push(MemberFailure {
                        strategy: member.name().to_string(),
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            "Composite extraction complete: {} fields, {} member failures",
            fields.len(),
            member_failures.len()
        );

        let performance = Performance {
            duration_seconds: started.elapsed().as_secs_f64(),
            attempts: total_attempts,
            usage: saw_usage.then_some(usage_total),
        };
        let mut metadata = ResultMetadata::new(
            COMPOSITE_STRATEGY_NAME,
            self.version(),
            request.source_ref.clone(),
            performance,
        );
        metadata.member_failures = member_failures;

        Ok(ExtractionResult { fields, metadata })
    }

    async fn validate_provider_connection(&self) -> ConnectionCheck {
        let checks = join_all(
            self.members
                .iter()
                .map(|member| member.validate_provider_connection()),
        )
        .await;

        let failures: Vec<String> = self
            .members
            .iter()
            .zip(checks)
            .filter(|(_, check)| !check.ok)
            .map(|(member, check)| {
                format!(
                    "{}: {}",
                    member.name(),
                    check.error.unwrap_or_else(|| "unknown error".to_string())
                )
            })
            .collect();

        if failures.is_empty() {
            ConnectionCheck::passed()
        } else {
            ConnectionCheck::failed(failures.join("; "))
        }
    }
}
