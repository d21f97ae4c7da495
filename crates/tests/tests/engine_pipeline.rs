use std::sync::Arc;

use chrono::{TimeZone, Utc};
use maru_core::{
    AgeBand, MemoryWritePolicy, Pipeline, RecentAssistantMessage, RelationshipUpdatePolicy,
    RouterService, SafetyPolicy, Topic, TopicMatch, TurnContext, UserState,
};
use maru_engine::{InMemoryHistory, MessageHistory, TurnEngine};
use maru_observability::EngineMetrics;
use maru_postprocess::{opener_norm, trigram_jaccard, PostProcessInput, PostProcessor, Violation};

fn engine_with(history: Arc<InMemoryHistory>) -> TurnEngine<InMemoryHistory> {
    TurnEngine::new(
        RouterService::default(),
        PostProcessor::default(),
        history,
        EngineMetrics::shared(),
    )
}

fn engine() -> TurnEngine<InMemoryHistory> {
    engine_with(Arc::new(InMemoryHistory::new()))
}

fn turn(text: &str, token_estimate: u32) -> TurnContext {
    TurnContext {
        text: text.to_string(),
        token_estimate,
        topics: Vec::new(),
        age_band: Some(AgeBand::Adult),
        user_state: UserState::Active,
    }
}

fn topic_match(topic: Topic, confidence: f32) -> TopicMatch {
    TopicMatch {
        topic,
        confidence,
        hits: 1,
        user_initiated: true,
    }
}

fn stored(conversation_id: &str, history: &InMemoryHistory, content: &str, second: u32) {
    history.push_assistant_message(
        conversation_id,
        RecentAssistantMessage {
            message_id: format!("m{second}"),
            content: content.to_string(),
            opener_norm: opener_norm(content),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, second).unwrap(),
        },
    );
}

#[test]
fn routing_is_byte_identical_across_calls() {
    let engine = engine();
    let ctx = turn("how do i say no politely?", 12);

    let first = engine.route_turn(&ctx);
    for _ in 0..10 {
        let next = engine.route_turn(&ctx);
        assert_eq!(
            serde_json::to_string(&next).unwrap(),
            serde_json::to_string(&first).unwrap()
        );
    }
}

#[test]
fn hard_refuse_always_lands_in_refusal_with_writes_off() {
    let engine = engine();
    // Distress and question flags are present, yet safety dominates.
    let mut ctx = turn("i'm sad, can we do sexual roleplay?", 15);
    ctx.topics = vec![topic_match(Topic::DailyLife, 0.4)];

    let decision = engine.route_turn(&ctx);
    assert_eq!(decision.safety_policy, SafetyPolicy::HardRefuse);
    assert_eq!(decision.pipeline, Pipeline::Refusal);
    assert_eq!(decision.policies.memory_write, MemoryWritePolicy::None);
    assert_eq!(
        decision.policies.relationship_update,
        RelationshipUpdatePolicy::Off
    );
}

#[test]
fn crisis_routes_to_emotional_support_not_refusal() {
    let engine = engine();
    let mut ctx = turn("요즘 자살 생각이 나", 10);
    ctx.age_band = None;

    let decision = engine.route_turn(&ctx);
    assert_eq!(decision.pipeline, Pipeline::EmotionalSupport);
    assert_eq!(decision.safety_policy, SafetyPolicy::Allow);
    assert_eq!(decision.policies.memory_write, MemoryWritePolicy::Selective);
}

#[test]
fn sexual_topic_age_gating() {
    let engine = engine();

    for band in [None, Some(AgeBand::Teen)] {
        let mut ctx = turn("tell me more about it", 8);
        ctx.topics = vec![topic_match(Topic::SexualContent, 0.9)];
        ctx.age_band = band;
        let decision = engine.route_turn(&ctx);
        assert_eq!(decision.safety_policy, SafetyPolicy::HardRefuse);
        assert_eq!(decision.pipeline, Pipeline::Refusal);
    }

    let mut ctx = turn("how does contraception work for adults", 10);
    ctx.topics = vec![topic_match(Topic::SexualContent, 0.9)];
    let decision = engine.route_turn(&ctx);
    assert_eq!(decision.safety_policy, SafetyPolicy::Allow);
    assert_eq!(decision.pipeline, Pipeline::InfoQa);
}

#[test]
fn first_person_question_goes_to_friend_chat() {
    let engine = engine();
    let decision = engine.route_turn(&turn("what should i cook tonight?", 9));
    assert_eq!(decision.pipeline, Pipeline::FriendChat);

    let decision = engine.route_turn(&turn("what is the boiling point of water?", 9));
    assert_eq!(decision.pipeline, Pipeline::InfoQa);
}

#[test]
fn jaccard_reference_values() {
    assert_eq!(trigram_jaccard("hi there", "hello world"), 0.0);
    let sim = trigram_jaccard("a b c d", "a b c e");
    assert!((sim - 1.0 / 3.0).abs() < 1e-6);
    assert_eq!(
        trigram_jaccard("four tokens right here", "four tokens right here"),
        1.0
    );
}

#[test]
fn opener_norm_reference_value() {
    assert_eq!(
        opener_norm("😊 Hey there, how are you doing today?"),
        "hey there how are you doing today"
    );
}

#[test]
fn personal_fact_cap_and_recall_bypass() {
    let engine = engine();
    let mut input = PostProcessInput {
        draft: "Sure, here is what I know.".to_string(),
        conversation_id: "conv".to_string(),
        surfaced_memory_ids: vec![
            "f1".to_string(),
            "f2".to_string(),
            "f3".to_string(),
            "f4".to_string(),
        ],
        user_message: "tell me something about me".to_string(),
        is_retention: false,
        pipeline: Pipeline::FriendChat,
    };

    let capped = engine.finalize_reply(&input).unwrap();
    assert!(capped
        .violations
        .contains(&Violation::PersonalFactViolation));
    assert_eq!(capped.surfaced_memory_ids.len(), 2);

    input.user_message = "Do you remember what I told you about my job?".to_string();
    let bypassed = engine.finalize_reply(&input).unwrap();
    assert!(!bypassed
        .violations
        .contains(&Violation::PersonalFactViolation));
    assert_eq!(bypassed.surfaced_memory_ids.len(), 4);
}

#[test]
fn repeated_opener_across_stored_messages_is_rewritten() {
    let history = Arc::new(InMemoryHistory::new());
    stored(
        "conv",
        &history,
        "Good morning sunshine! How was your week at work and home lately? Any news?",
        0,
    );
    let engine = engine_with(history);

    let input = PostProcessInput {
        draft: "Good morning sunshine! How was your week at work and home lately? I missed you."
            .to_string(),
        conversation_id: "conv".to_string(),
        surfaced_memory_ids: Vec::new(),
        user_message: "hi".to_string(),
        is_retention: false,
        pipeline: Pipeline::FriendChat,
    };

    let result = engine.finalize_reply(&input).unwrap();
    assert!(result.violations.contains(&Violation::OpenerRepetition));
    assert!(result.rewrite_attempts >= 1);
    assert_ne!(result.opener_norm, opener_norm(&input.draft));
}

#[test]
fn finalize_is_deterministic_for_a_fixed_snapshot() {
    let history = Arc::new(InMemoryHistory::new());
    for second in 0..5 {
        stored(
            "conv",
            &history,
            &format!("Stored reply number {second} with enough words to matter."),
            second,
        );
    }
    let engine = engine_with(history.clone());

    let input = PostProcessInput {
        draft: "Stored reply number 3 with enough words to matter.".to_string(),
        conversation_id: "conv".to_string(),
        surfaced_memory_ids: vec!["f1".to_string()],
        user_message: "hello".to_string(),
        is_retention: false,
        pipeline: Pipeline::FriendChat,
    };

    let snapshot = history.recent_assistant_messages("conv", 20).unwrap();
    let first = engine.finalize_reply(&input).unwrap();
    for _ in 0..5 {
        assert_eq!(engine.finalize_reply(&input).unwrap(), first);
        // The snapshot itself is stable, so results must be too.
        assert_eq!(history.recent_assistant_messages("conv", 20).unwrap(), snapshot);
    }
}
