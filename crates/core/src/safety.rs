use crate::models::{
    AgeBand, Pipeline, SafetyPolicy, SafetyVerdict, Topic, TurnContext,
};

/// Keyword tables behind the safety cascade. The erotic, hate, and
/// illegal lists are policy-sensitive: `Default` carries only a
/// baseline, and production deployments construct the lexicon from
/// the stakeholder-approved lists instead of extending these in code.
#[derive(Debug, Clone)]
pub struct SafetyLexicon {
    pub erotic_terms: Vec<String>,
    pub hate_terms: Vec<String>,
    pub illegal_terms: Vec<String>,
    pub self_harm_terms: Vec<String>,
    pub harassment_terms: Vec<String>,
    pub health_education_terms: Vec<String>,
}

impl Default for SafetyLexicon {
    fn default() -> Self {
        Self {
            erotic_terms: strings(&["sexual roleplay", "erotic roleplay", "explicit sex"]),
            // Populated from the moderation team's list at deploy time.
            hate_terms: Vec::new(),
            illegal_terms: strings(&["how to hack", "hack into", "buy drugs", "get me drugs"]),
            self_harm_terms: strings(&[
                "kill myself",
                "suicide",
                "self-harm",
                "self harm",
                "hurt myself",
                "end my life",
                "want to die",
                "자살",
                "죽고 싶",
                "자해",
            ]),
            harassment_terms: strings(&["idiot", "stupid", "loser", "바보", "멍청"]),
            health_education_terms: strings(&[
                "sexual health",
                "sex education",
                "contraception",
                "puberty",
                "성교육",
                "피임",
                "사춘기",
            ]),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Ordered safety cascade over one turn. Pure and total: identical
/// input yields identical output, and every input maps to a verdict.
#[derive(Debug, Clone, Default)]
pub struct SafetyClassifier {
    lexicon: SafetyLexicon,
}

impl SafetyClassifier {
    pub fn new(lexicon: SafetyLexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &SafetyLexicon {
        &self.lexicon
    }

    /// First matching rule wins; later rules are not evaluated.
    pub fn classify(&self, ctx: &TurnContext) -> SafetyVerdict {
        let lower = ctx.text.to_lowercase();

        if matches_any(&lower, &self.lexicon.erotic_terms) {
            return hard_refuse("explicit or erotic content");
        }

        if matches_any(&lower, &self.lexicon.hate_terms) {
            return hard_refuse("hateful content");
        }

        if matches_any(&lower, &self.lexicon.illegal_terms)
            || has_topic(ctx, Topic::IllegalActivity)
        {
            return hard_refuse("illegal activity intent");
        }

        if has_topic(ctx, Topic::SexualContent) || has_topic(ctx, Topic::SexualHealth) {
            let education = has_topic(ctx, Topic::SexualHealth)
                || matches_any(&lower, &self.lexicon.health_education_terms);

            if education {
                return SafetyVerdict {
                    policy: SafetyPolicy::Allow,
                    requires_crisis_flow: false,
                    suggested_pipeline: Some(Pipeline::InfoQa),
                    memory_write_allowed: true,
                    relationship_update_allowed: true,
                    classification_reason: "sexual-health education framing".to_string(),
                };
            }

            if AgeBand::effective(ctx.age_band).is_minor() {
                return hard_refuse("sexual content with minor age band");
            }
            // Adult band, no erotic text, no education framing: the
            // remaining rules decide.
        }

        if matches_any(&lower, &self.lexicon.self_harm_terms) || has_topic(ctx, Topic::SelfHarm) {
            return SafetyVerdict {
                policy: SafetyPolicy::Allow,
                requires_crisis_flow: true,
                suggested_pipeline: Some(Pipeline::EmotionalSupport),
                memory_write_allowed: true,
                relationship_update_allowed: true,
                classification_reason: "self-harm signal; crisis flow engaged".to_string(),
            };
        }

        if matches_any(&lower, &self.lexicon.harassment_terms) {
            return SafetyVerdict {
                policy: SafetyPolicy::SoftRefuse,
                requires_crisis_flow: false,
                suggested_pipeline: None,
                memory_write_allowed: true,
                relationship_update_allowed: true,
                classification_reason: "borderline harassment".to_string(),
            };
        }

        SafetyVerdict {
            policy: SafetyPolicy::Allow,
            requires_crisis_flow: false,
            suggested_pipeline: None,
            memory_write_allowed: true,
            relationship_update_allowed: true,
            classification_reason: "no safety signal".to_string(),
        }
    }
}

fn hard_refuse(reason: &str) -> SafetyVerdict {
    SafetyVerdict {
        policy: SafetyPolicy::HardRefuse,
        requires_crisis_flow: false,
        suggested_pipeline: Some(Pipeline::Refusal),
        memory_write_allowed: false,
        relationship_update_allowed: false,
        classification_reason: reason.to_string(),
    }
}

fn matches_any(input: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| input.contains(needle.as_str()))
}

/// A confidence of exactly zero counts as "no match".
fn has_topic(ctx: &TurnContext, topic: Topic) -> bool {
    ctx.topics
        .iter()
        .any(|m| m.topic == topic && m.confidence > 0.0)
}
