//! Hanzi → Hanyu Pinyin annotation for generated stories.
//!
//! Used as the local fallback when the model response carries no `words`
//! array: we annotate each distinct Han character of the Mandarin text
//! with its pinyin reading. Per-character conversion (no word
//! segmentation), so some polyphonic characters use a default reading.
//! Jyutping is model-provided only; the fallback leaves it empty.

use pinyin::ToPinyin;

use crate::domain::WordEntry;

/// Convert Chinese text into Hanyu Pinyin with tone diacritics,
/// space-separated. Non-Chinese characters are copied as-is.
pub fn to_pinyin_diacritics(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);

    // Track whether the previous emitted token was a Hanzi→pinyin token,
    // so we can insert spaces between consecutive Hanzi syllables.
    let mut last_was_hanzi = false;

    for ch in text.chars() {
        if let Some(py) = ch.to_pinyin() {
            let syllable = py.with_tone().to_string();

            if last_was_hanzi {
                out.push(' ');
            }
            out.push_str(&syllable);
            last_was_hanzi = true;
        } else {
            out.push(ch);
            last_was_hanzi = false;
        }
    }

    out
}

/// Annotate each distinct Han character in `text` with its pinyin,
/// preserving first-appearance order.
pub fn annotate_words(text: &str) -> Vec<WordEntry> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for ch in text.chars() {
        if let Some(py) = ch.to_pinyin() {
            if seen.insert(ch) {
                out.push(WordEntry {
                    hanzi: ch.to_string(),
                    pinyin: py.with_tone().to_string(),
                    jyutping: String::new(),
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diacritics_with_mixed_text() {
        assert_eq!(to_pinyin_diacritics("中国人 2025！"), "zhōng guó rén 2025！");
    }

    #[test]
    fn annotation_deduplicates_characters() {
        let words = annotate_words("天天向上");
        let chars: Vec<&str> = words.iter().map(|w| w.hanzi.as_str()).collect();
        assert_eq!(chars, vec!["天", "向", "上"]);
        assert!(words.iter().all(|w| !w.pinyin.is_empty()));
        assert!(words.iter().all(|w| w.jyutping.is_empty()));
    }

    #[test]
    fn annotation_skips_non_hanzi() {
        assert!(annotate_words("hello 123!").is_empty());
    }
}
