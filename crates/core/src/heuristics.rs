use crate::models::HeuristicFlags;

const QUESTION_STARTERS: &[&str] = &[
    "what", "who", "when", "where", "why", "how", "which", "is", "are", "am", "do", "does", "did",
    "can", "could", "should", "would", "will",
];

const QUESTION_MARKERS_KO: &[&str] = &["뭐야", "뭐가", "무엇", "어떻게", "왜", "언제", "어디", "누구"];

const FIRST_PERSON_TOKENS: &[&str] = &["i", "i'm", "im", "me", "my", "mine", "myself"];

const FIRST_PERSON_KO: &[&str] = &["나는", "내가", "난 ", "저는", "제가", "내 "];

const DISTRESS_EN: &[&str] = &[
    "sad", "depressed", "depressing", "anxious", "anxiety", "lonely", "miserable", "hopeless",
    "exhausted", "stressed", "hate myself", "want to cry", "crying",
];

const DISTRESS_KO: &[&str] = &["우울", "불안", "외로", "힘들", "지쳤", "슬퍼", "슬프"];

const COMFORT_EN: &[&str] = &[
    "comfort me", "cheer me up", "need a hug", "need someone to talk", "make me feel better",
];

const COMFORT_KO: &[&str] = &["위로", "토닥", "안아줘", "달래줘"];

const PREFERENCE_EN: &[&str] = &[
    "i like", "i love", "i hate", "i prefer", "my favorite", "my favourite",
];

const PREFERENCE_KO: &[&str] = &["좋아해", "싫어해", "제일 좋아하는"];

const FACT_EN: &[&str] = &[
    "my name is", "i live in", "i work at", "i work as", "my job", "my birthday", "i am from",
    "i'm from",
];

const FACT_KO: &[&str] = &["내 이름", "살고 있어", "내 직업", "내 생일"];

const EVENT_EN: &[&str] = &[
    "yesterday", "today i", "tonight", "tomorrow", "last night", "next week", "i went to",
    "i just got",
];

const EVENT_KO: &[&str] = &["어제", "오늘", "내일", "다음 주", "지난 주"];

const CORRECTION_EN: &[&str] = &[
    "actually", "i meant", "that's not right", "that's wrong", "i never said", "to correct",
];

const CORRECTION_KO: &[&str] = &["아니라", "사실은", "그게 아니고", "잘못 알"];

/// Derives the eight heuristic signals from normalized turn text.
/// Each flag is an independent containment or prefix test; none
/// depends on another, so evaluation order is irrelevant.
pub fn extract_flags(text: &str) -> HeuristicFlags {
    let lower = text.to_lowercase();

    HeuristicFlags {
        is_question: is_question(&lower),
        has_personal_pronoun: has_personal_pronoun(&lower),
        has_distress: contains_any(&lower, DISTRESS_EN) || contains_any(&lower, DISTRESS_KO),
        asks_for_comfort: contains_any(&lower, COMFORT_EN) || contains_any(&lower, COMFORT_KO),
        preference_trigger: contains_any(&lower, PREFERENCE_EN)
            || contains_any(&lower, PREFERENCE_KO),
        fact_trigger: contains_any(&lower, FACT_EN) || contains_any(&lower, FACT_KO),
        event_trigger: contains_any(&lower, EVENT_EN) || contains_any(&lower, EVENT_KO),
        correction_trigger: contains_any(&lower, CORRECTION_EN)
            || contains_any(&lower, CORRECTION_KO),
    }
}

fn is_question(lower: &str) -> bool {
    if lower.contains('?') || lower.contains("how do i") {
        return true;
    }

    if let Some(first) = lower.split_whitespace().next() {
        if QUESTION_STARTERS.contains(&first) {
            return true;
        }
    }

    contains_any(lower, QUESTION_MARKERS_KO)
}

fn has_personal_pronoun(lower: &str) -> bool {
    lower
        .split_whitespace()
        .any(|token| FIRST_PERSON_TOKENS.contains(&token))
        || contains_any(lower, FIRST_PERSON_KO)
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
