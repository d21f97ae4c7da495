mod opener;
mod similarity;

use maru_core::{Pipeline, RecentAssistantMessage};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use opener::opener_norm;
pub use similarity::trigram_jaccard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    OpenerRepetition,
    MessageSimilarity,
    PersonalFactViolation,
}

/// Draft reply plus the per-turn context the quality gates need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostProcessInput {
    pub draft: String,
    pub conversation_id: String,
    pub surfaced_memory_ids: Vec<String>,
    pub user_message: String,
    pub is_retention: bool,
    pub pipeline: Pipeline,
}

/// Diagnostic only; downstream style tuning reads these, nothing
/// gates on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceMetrics {
    pub sentences: usize,
    pub words: usize,
    pub avg_words_per_sentence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostProcessResult {
    pub content: String,
    pub opener_norm: String,
    pub violations: Vec<Violation>,
    pub rewrite_attempts: u32,
    pub surfaced_memory_ids: Vec<String>,
    pub sentence_metrics: SentenceMetrics,
}

static DEFAULT_RECALL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bdo you remember\b",
        r"(?i)\bremember (what|when|that) i\b",
        r"(?i)\bwhat did i (say|tell)\b",
        r"기억나",
        r"기억해",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid recall pattern"))
    .collect()
});

/// Tunables for the quality gates. The recall patterns are product
/// configuration, not hard-coded truth; callers may swap in their own
/// set.
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    pub recall_patterns: Vec<Regex>,
    pub similarity_threshold: f32,
    pub similarity_window: usize,
    pub fact_cap: usize,
    pub retention_fact_cap: usize,
    pub max_rewrite_passes: u32,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            recall_patterns: DEFAULT_RECALL_PATTERNS.clone(),
            similarity_threshold: 0.70,
            similarity_window: 20,
            fact_cap: 2,
            retention_fact_cap: 1,
            max_rewrite_passes: 2,
        }
    }
}

/// Deterministic quality gates over a drafted reply: opener
/// repetition, near-duplicate detection, and the personal-fact cap.
/// The recent-message snapshot is supplied by the caller; everything
/// here is a pure function of its arguments.
#[derive(Debug, Clone, Default)]
pub struct PostProcessor {
    config: PostProcessConfig,
}

impl PostProcessor {
    pub fn new(config: PostProcessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    pub fn process(
        &self,
        input: &PostProcessInput,
        recent: &[RecentAssistantMessage],
    ) -> PostProcessResult {
        let window: Vec<&RecentAssistantMessage> =
            recent.iter().take(self.config.similarity_window).collect();

        let mut content = input.draft.clone();
        let mut violations: Vec<Violation> = Vec::new();
        let mut attempts = 0_u32;

        // Bounded loop: each pass applies at most one rewrite per
        // detected violation, then re-checks. If the bound is reached
        // with violations still present, the best content is returned
        // with the violations listed.
        loop {
            let current_opener = opener_norm(&content);

            let mut detected: Vec<Violation> = Vec::new();
            if !current_opener.is_empty()
                && window.iter().any(|m| m.opener_norm == current_opener)
            {
                detected.push(Violation::OpenerRepetition);
            }
            if window.iter().any(|m| {
                trigram_jaccard(&content, &m.content) >= self.config.similarity_threshold
            }) {
                detected.push(Violation::MessageSimilarity);
            }

            for violation in &detected {
                if !violations.contains(violation) {
                    violations.push(*violation);
                }
            }

            if detected.is_empty() || attempts >= self.config.max_rewrite_passes {
                break;
            }

            if detected.contains(&Violation::OpenerRepetition) {
                content = restructure_opening(&content);
            }
            if detected.contains(&Violation::MessageSimilarity) {
                content = shorten(&content);
            }
            attempts += 1;
        }

        // Rewriting text cannot cure an over-cap surfaced-memory list,
        // so the cap is applied once, outside the loop.
        let cap = if input.is_retention {
            self.config.retention_fact_cap
        } else {
            self.config.fact_cap
        };
        let mut surfaced = input.surfaced_memory_ids.clone();
        if surfaced.len() > cap && !self.recall_requested(&input.user_message) {
            violations.push(Violation::PersonalFactViolation);
            surfaced.truncate(cap);
        }

        PostProcessResult {
            opener_norm: opener_norm(&content),
            sentence_metrics: sentence_metrics(&content),
            content,
            violations,
            rewrite_attempts: attempts,
            surfaced_memory_ids: surfaced,
        }
    }

    fn recall_requested(&self, user_message: &str) -> bool {
        self.config
            .recall_patterns
            .iter()
            .any(|pattern| pattern.is_match(user_message))
    }
}

const SENTENCE_TERMINALS: &[char] = &['.', '?', '!', '。', '？', '！'];

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if SENTENCE_TERMINALS.contains(&ch) {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.chars().any(char::is_alphanumeric) {
        out.push(trimmed.to_string());
    }
}

pub fn sentence_metrics(text: &str) -> SentenceMetrics {
    let sentences = split_sentences(text).len();
    let words = text.split_whitespace().count();
    let avg_words_per_sentence = if sentences == 0 {
        0.0
    } else {
        words as f32 / sentences as f32
    };

    SentenceMetrics {
        sentences,
        words,
        avg_words_per_sentence,
    }
}

/// Moves the first sentence to the end so the reply no longer opens
/// the same way; single-sentence drafts drop their leading words
/// instead.
fn restructure_opening(content: &str) -> String {
    let mut sentences = split_sentences(content);
    if sentences.len() >= 2 {
        let first = sentences.remove(0);
        sentences.push(first);
        sentences.join(" ")
    } else {
        content
            .split_whitespace()
            .skip(4)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Keeps the first half of the sentences, minimum one.
fn shorten(content: &str) -> String {
    let sentences = split_sentences(content);
    if sentences.len() <= 1 {
        let tokens: Vec<&str> = content.split_whitespace().collect();
        let keep = tokens.len().div_ceil(2).max(1).min(tokens.len());
        return tokens[..keep].join(" ");
    }
    let keep = sentences.len().div_ceil(2);
    sentences[..keep].join(" ")
}
