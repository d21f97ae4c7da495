use std::collections::HashSet;

/// 3-gram Jaccard similarity over whitespace tokens. Texts with fewer
/// than three tokens have an empty gram set and similarity zero.
pub fn trigram_jaccard(a: &str, b: &str) -> f32 {
    let grams_a = trigrams(a);
    let grams_b = trigrams(b);
    if grams_a.is_empty() || grams_b.is_empty() {
        return 0.0;
    }

    let intersection = grams_a.intersection(&grams_b).count() as f32;
    let union = grams_a.union(&grams_b).count() as f32;
    intersection / union
}

fn trigrams(text: &str) -> HashSet<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 3 {
        return HashSet::new();
    }
    tokens.windows(3).map(|window| window.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_texts_have_zero_similarity() {
        assert_eq!(trigram_jaccard("hi there", "hello world"), 0.0);
        assert_eq!(trigram_jaccard("hi there", "hi there"), 0.0);
    }

    #[test]
    fn partial_overlap() {
        let sim = trigram_jaccard("a b c d", "a b c e");
        assert!((sim - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn identical_text_is_fully_similar() {
        assert_eq!(trigram_jaccard("we meet again old friend", "we meet again old friend"), 1.0);
    }
}
