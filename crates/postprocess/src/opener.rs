use unicode_segmentation::UnicodeSegmentation;

const OPENER_TOKENS: usize = 12;

/// Canonical form of a reply's opening: leading emoji stripped, ASCII
/// letters lowercased (other scripts untouched), punctuation dropped
/// except apostrophes, whitespace collapsed, first 12 tokens kept.
pub fn opener_norm(content: &str) -> String {
    let stripped = strip_leading_emoji(content);

    let mut cleaned = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        if ch.is_ascii_alphabetic() {
            cleaned.push(ch.to_ascii_lowercase());
        } else if ch.is_alphanumeric() || ch.is_whitespace() || ch == '\'' || ch == '\u{2019}' {
            cleaned.push(ch);
        }
    }

    cleaned
        .split_whitespace()
        .take(OPENER_TOKENS)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_leading_emoji(input: &str) -> &str {
    let mut rest = input.trim_start();
    loop {
        let mut graphemes = rest.graphemes(true);
        match graphemes.next() {
            Some(cluster) if !cluster.is_empty() && cluster.chars().all(is_emoji_char) => {
                rest = graphemes.as_str().trim_start();
            }
            _ => break,
        }
    }
    rest
}

fn is_emoji_char(ch: char) -> bool {
    matches!(
        ch as u32,
        0x1F000..=0x1FAFF   // pictographs, emoticons, symbols
            | 0x2600..=0x27BF   // misc symbols, dingbats
            | 0x2B00..=0x2BFF
            | 0xFE0E..=0xFE0F   // variation selectors
            | 0x200D            // zero-width joiner
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_emoji_lowercases_and_drops_punctuation() {
        assert_eq!(
            opener_norm("😊 Hey there, how are you doing today?"),
            "hey there how are you doing today"
        );
    }

    #[test]
    fn keeps_apostrophes_and_non_latin_scripts() {
        assert_eq!(opener_norm("It's 좋은 아침!"), "it's 좋은 아침");
    }

    #[test]
    fn truncates_to_twelve_tokens() {
        let long = "one two three four five six seven eight nine ten eleven twelve thirteen";
        assert_eq!(
            opener_norm(long),
            "one two three four five six seven eight nine ten eleven twelve"
        );
    }

    #[test]
    fn multiple_leading_emoji_are_stripped() {
        assert_eq!(opener_norm("🎉✨ Good morning"), "good morning");
    }
}
