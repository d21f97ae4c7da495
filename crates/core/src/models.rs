use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    Child,
    Teen,
    Adult,
}

impl AgeBand {
    /// Unknown or missing bands are treated as a minor band.
    pub fn effective(value: Option<AgeBand>) -> AgeBand {
        value.unwrap_or(AgeBand::Teen)
    }

    pub fn is_minor(self) -> bool {
        matches!(self, Self::Child | Self::Teen)
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::Teen => "teen",
            Self::Adult => "adult",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    Created,
    Onboarding,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    SexualContent,
    SexualHealth,
    SelfHarm,
    IllegalActivity,
    Relationship,
    DailyLife,
    StudyWork,
    Hobby,
    Other,
}

impl Topic {
    pub fn from_tag(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "sexual_content" | "sexual" => Self::SexualContent,
            "sexual_health" | "sex_education" => Self::SexualHealth,
            "self_harm" | "suicide" => Self::SelfHarm,
            "illegal_activity" | "illegal" => Self::IllegalActivity,
            "relationship" => Self::Relationship,
            "daily_life" => Self::DailyLife,
            "study_work" | "study" | "work" => Self::StudyWork,
            "hobby" => Self::Hobby,
            _ => Self::Other,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::SexualContent => "sexual_content",
            Self::SexualHealth => "sexual_health",
            Self::SelfHarm => "self_harm",
            Self::IllegalActivity => "illegal_activity",
            Self::Relationship => "relationship",
            Self::DailyLife => "daily_life",
            Self::StudyWork => "study_work",
            Self::Hobby => "hobby",
            Self::Other => "other",
        }
    }
}

/// One ranked hit from the upstream topic tagger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicMatch {
    pub topic: Topic,
    pub confidence: f32,
    pub hits: u32,
    pub user_initiated: bool,
}

/// Everything the decision pipeline may look at for one user turn.
/// Built once per turn by the caller; `text` is already normalized
/// upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnContext {
    pub text: String,
    pub token_estimate: u32,
    pub topics: Vec<TopicMatch>,
    pub age_band: Option<AgeBand>,
    pub user_state: UserState,
}

/// Independent boolean signals over the normalized turn text. The
/// four trigger fields feed downstream memory extraction only;
/// routing reads the first four.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicFlags {
    pub is_question: bool,
    pub has_personal_pronoun: bool,
    pub has_distress: bool,
    pub asks_for_comfort: bool,
    pub preference_trigger: bool,
    pub fact_trigger: bool,
    pub event_trigger: bool,
    pub correction_trigger: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyPolicy {
    Allow,
    SoftRefuse,
    HardRefuse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    OnboardingChat,
    FriendChat,
    EmotionalSupport,
    InfoQa,
    Refusal,
}

impl Pipeline {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::OnboardingChat => "onboarding_chat",
            Self::FriendChat => "friend_chat",
            Self::EmotionalSupport => "emotional_support",
            Self::InfoQa => "info_qa",
            Self::Refusal => "refusal",
        }
    }
}

/// Verdict of the safety cascade. `requires_crisis_flow` never
/// coincides with a hard refusal: crisis turns always route to
/// support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub policy: SafetyPolicy,
    pub requires_crisis_flow: bool,
    pub suggested_pipeline: Option<Pipeline>,
    pub memory_write_allowed: bool,
    pub relationship_update_allowed: bool,
    /// Audit string; never branched on.
    pub classification_reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryReadPolicy {
    None,
    Light,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryWritePolicy {
    None,
    Selective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorSearchPolicy {
    Off,
    OnDemand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipUpdatePolicy {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBundle {
    pub memory_read: MemoryReadPolicy,
    pub memory_write: MemoryWritePolicy,
    pub vector_search: VectorSearchPolicy,
    pub relationship_update: RelationshipUpdatePolicy,
}

/// Final routing decision for one turn. Prompt construction selects
/// system instructions from `pipeline`; persistence consults
/// `policies`. `notes` and `debug` are observability only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterDecision {
    pub pipeline: Pipeline,
    pub safety_policy: SafetyPolicy,
    pub policies: PolicyBundle,
    pub topic: Option<Topic>,
    pub topic_confidence: Option<f32>,
    pub notes: Vec<String>,
    pub debug: Value,
}

/// Snapshot row of a previously stored assistant message, supplied by
/// the storage layer for repetition checks. `created_at` is audit
/// data; no decision branches on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentAssistantMessage {
    pub message_id: String,
    pub content: String,
    pub opener_norm: String,
    pub created_at: DateTime<Utc>,
}
