use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use maru_core::{
    extract_flags, Pipeline, RecentAssistantMessage, RouterDecision, RouterService, SafetyPolicy,
    TurnContext,
};
use maru_observability::EngineMetrics;
use maru_postprocess::{PostProcessInput, PostProcessResult, PostProcessor};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("recent-message fetch failed: {0}")]
    History(#[from] HistoryError),
}

/// The single external read of the pipeline: the most recent stored
/// assistant messages for a conversation, newest first.
pub trait MessageHistory: Send + Sync {
    fn recent_assistant_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<RecentAssistantMessage>, HistoryError>;
}

/// Reference in-process history store. Tests and embedded callers use
/// it directly; production wires the storage layer behind the same
/// trait.
#[derive(Clone, Default)]
pub struct InMemoryHistory {
    messages: Arc<RwLock<HashMap<String, Vec<RecentAssistantMessage>>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_assistant_message(&self, conversation_id: &str, message: RecentAssistantMessage) {
        self.messages
            .write()
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
    }
}

impl MessageHistory for InMemoryHistory {
    fn recent_assistant_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<RecentAssistantMessage>, HistoryError> {
        let guard = self.messages.read();
        let stored = guard.get(conversation_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(stored.iter().rev().take(limit).cloned().collect())
    }
}

/// Explicit composition of the decision pipeline: heuristic flags,
/// safety-aware routing, and post-generation quality gates, plus the
/// shared counters. One instance serves any number of concurrent
/// turns; nothing here is mutated per call.
pub struct TurnEngine<H: MessageHistory> {
    router: RouterService,
    post: PostProcessor,
    history: Arc<H>,
    metrics: Arc<EngineMetrics>,
}

impl<H: MessageHistory> TurnEngine<H> {
    pub fn new(
        router: RouterService,
        post: PostProcessor,
        history: Arc<H>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            router,
            post,
            history,
            metrics,
        }
    }

    /// Classifies one user turn and produces the routing decision the
    /// prompt builder and persistence layer consume.
    pub fn route_turn(&self, ctx: &TurnContext) -> RouterDecision {
        let started = Instant::now();
        let flags = extract_flags(&ctx.text);
        let decision = self.router.route(ctx, &flags);

        self.metrics.inc_turn();
        match decision.pipeline {
            Pipeline::Refusal => self.metrics.inc_refusal(),
            Pipeline::EmotionalSupport => self.metrics.inc_support_route(),
            _ => {}
        }
        if decision.safety_policy == SafetyPolicy::SoftRefuse {
            self.metrics.inc_soft_refusal();
        }
        self.metrics.observe_latency(started.elapsed());

        info!(
            pipeline = decision.pipeline.as_code(),
            safety_policy = ?decision.safety_policy,
            user_state = ?ctx.user_state,
            topic = decision.topic.map(|t| t.as_code()),
            "turn routed"
        );

        decision
    }

    /// Runs the drafted reply through the quality gates. The recent
    /// snapshot is fetched once up front; the gates themselves are
    /// pure.
    pub fn finalize_reply(&self, input: &PostProcessInput) -> Result<PostProcessResult, EngineError> {
        let recent = self.history.recent_assistant_messages(
            &input.conversation_id,
            self.post.config().similarity_window,
        )?;
        let result = self.post.process(input, &recent);

        self.metrics.add_rewrites(u64::from(result.rewrite_attempts));
        self.metrics.add_violations(result.violations.len() as u64);

        info!(
            conversation_id = %input.conversation_id,
            violations = result.violations.len(),
            rewrite_attempts = result.rewrite_attempts,
            "reply finalized"
        );

        Ok(result)
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }
}
