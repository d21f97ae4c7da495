use serde_json::json;

use crate::models::{
    HeuristicFlags, MemoryReadPolicy, MemoryWritePolicy, Pipeline, PolicyBundle,
    RelationshipUpdatePolicy, RouterDecision, SafetyPolicy, Topic, TopicMatch, TurnContext,
    UserState, VectorSearchPolicy,
};
use crate::safety::SafetyClassifier;

/// Fixed policy tuple per pipeline. The safety verdict may narrow the
/// write and relationship fields afterwards; nothing ever widens them.
pub fn policy_for_pipeline(pipeline: Pipeline) -> PolicyBundle {
    match pipeline {
        Pipeline::OnboardingChat => PolicyBundle {
            memory_read: MemoryReadPolicy::Light,
            memory_write: MemoryWritePolicy::Selective,
            vector_search: VectorSearchPolicy::Off,
            relationship_update: RelationshipUpdatePolicy::On,
        },
        Pipeline::FriendChat => PolicyBundle {
            memory_read: MemoryReadPolicy::Full,
            memory_write: MemoryWritePolicy::Selective,
            vector_search: VectorSearchPolicy::OnDemand,
            relationship_update: RelationshipUpdatePolicy::On,
        },
        Pipeline::EmotionalSupport => PolicyBundle {
            memory_read: MemoryReadPolicy::Light,
            memory_write: MemoryWritePolicy::Selective,
            vector_search: VectorSearchPolicy::Off,
            relationship_update: RelationshipUpdatePolicy::On,
        },
        Pipeline::InfoQa => PolicyBundle {
            memory_read: MemoryReadPolicy::Light,
            memory_write: MemoryWritePolicy::None,
            vector_search: VectorSearchPolicy::OnDemand,
            relationship_update: RelationshipUpdatePolicy::On,
        },
        Pipeline::Refusal => PolicyBundle {
            memory_read: MemoryReadPolicy::None,
            memory_write: MemoryWritePolicy::None,
            vector_search: VectorSearchPolicy::Off,
            relationship_update: RelationshipUpdatePolicy::Off,
        },
    }
}

/// Merges the safety verdict and the heuristic flags into the final
/// per-turn decision. Total over its inputs: there is no error path,
/// and identical inputs produce identical decisions.
#[derive(Debug, Clone, Default)]
pub struct RouterService {
    safety: SafetyClassifier,
}

impl RouterService {
    pub fn new(safety: SafetyClassifier) -> Self {
        Self { safety }
    }

    pub fn route(&self, ctx: &TurnContext, flags: &HeuristicFlags) -> RouterDecision {
        let (topic, topic_confidence) = best_topic(&ctx.topics);

        // Users that never finished account creation are refused
        // before any safety work runs.
        if ctx.user_state == UserState::Created {
            return RouterDecision {
                pipeline: Pipeline::Refusal,
                safety_policy: SafetyPolicy::Allow,
                policies: policy_for_pipeline(Pipeline::Refusal),
                topic,
                topic_confidence,
                notes: vec!["user not onboarded; refused before safety classification".to_string()],
                debug: json!({ "user_state": ctx.user_state, "flags": flags }),
            };
        }

        let verdict = self.safety.classify(ctx);

        let pipeline = if verdict.policy == SafetyPolicy::HardRefuse {
            Pipeline::Refusal
        } else if verdict.requires_crisis_flow {
            Pipeline::EmotionalSupport
        } else if ctx.user_state == UserState::Onboarding {
            Pipeline::OnboardingChat
        } else if let Some(suggested) = verdict.suggested_pipeline {
            suggested
        } else if flags.has_distress || flags.asks_for_comfort {
            Pipeline::EmotionalSupport
        } else if flags.is_question && ctx.token_estimate <= 60 {
            // A first-person factual question reads as conversational,
            // not informational.
            if flags.has_personal_pronoun {
                Pipeline::FriendChat
            } else {
                Pipeline::InfoQa
            }
        } else {
            Pipeline::FriendChat
        };

        let mut policies = policy_for_pipeline(pipeline);
        if !verdict.memory_write_allowed {
            policies.memory_write = MemoryWritePolicy::None;
        }
        if !verdict.relationship_update_allowed {
            policies.relationship_update = RelationshipUpdatePolicy::Off;
        }

        let mut notes = vec![verdict.classification_reason.clone()];
        if verdict.requires_crisis_flow {
            notes.push("crisis flow overrides intent routing".to_string());
        }

        RouterDecision {
            pipeline,
            safety_policy: verdict.policy,
            policies,
            topic,
            topic_confidence,
            notes,
            debug: json!({
                "user_state": ctx.user_state,
                "flags": flags,
                "token_estimate": ctx.token_estimate,
                "suggested_pipeline": verdict.suggested_pipeline,
                "requires_crisis_flow": verdict.requires_crisis_flow,
            }),
        }
    }
}

/// Highest-confidence match, ties broken by first-seen order; a
/// confidence of exactly zero is no match.
fn best_topic(topics: &[TopicMatch]) -> (Option<Topic>, Option<f32>) {
    let mut best: Option<&TopicMatch> = None;
    for candidate in topics {
        if candidate.confidence <= 0.0 {
            continue;
        }
        match best {
            Some(current) if candidate.confidence > current.confidence => best = Some(candidate),
            None => best = Some(candidate),
            _ => {}
        }
    }
    (best.map(|m| m.topic), best.map(|m| m.confidence))
}
