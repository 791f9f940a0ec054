//! Word-level text helpers shared by follow-up detection, query rewriting
//! and lexical scoring.

use unicode_segmentation::UnicodeSegmentation;

/// Function words that never carry topic on their own.
///
/// Includes question scaffolding ("what", "how", "tell") and elaboration
/// filler ("more", "about") so that topic extraction keeps only nouns and
/// verbs that say what a question is about.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "again", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "been", "but", "by", "can", "could", "did", "do", "does", "else", "for", "from", "get",
    "give", "had", "has", "have", "he", "her", "him", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "just", "me", "more", "much", "my", "no", "not", "of", "on", "or",
    "our", "please", "she", "should", "so", "some", "tell", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "to", "too", "us", "was", "we",
    "were", "what", "when", "where", "which", "who", "why", "will", "with", "would", "you",
    "your",
];

/// Lower-cased Unicode words, in order.
pub fn words(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Topic-bearing terms of `text`, deduplicated, in first-seen order.
///
/// A term is a non-stop word with at least three characters, one of them
/// alphabetic. Plural "s" is folded so "costs" and "cost" match.
pub fn content_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();

    for word in words(text) {
        if is_stop_word(&word) || word.chars().count() < 3 {
            continue;
        }
        if !word.chars().any(char::is_alphabetic) {
            continue;
        }

        let term = fold_plural(&word);
        if !terms.contains(&term) {
            terms.push(term);
        }
    }

    terms
}

fn fold_plural(word: &str) -> String {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_lowercase_and_strip_punctuation() {
        assert_eq!(
            words("What about NATIONAL?"),
            vec!["what".to_string(), "about".to_string(), "national".to_string()]
        );
    }

    #[test]
    fn test_content_terms_drop_question_scaffolding() {
        assert_eq!(
            content_terms("What are the shipping costs?"),
            vec!["shipping".to_string(), "cost".to_string()]
        );
        assert_eq!(
            content_terms("Tell me more about the timeframe"),
            vec!["timeframe".to_string()]
        );
    }

    #[test]
    fn test_content_terms_dedupe_and_skip_numbers() {
        assert_eq!(
            content_terms("Convert 200 dollars, convert 300 dollars"),
            vec!["convert".to_string(), "dollar".to_string()]
        );
    }

    #[test]
    fn test_fold_plural_keeps_double_s() {
        assert_eq!(fold_plural("address"), "address");
        assert_eq!(fold_plural("returns"), "return");
        assert_eq!(fold_plural("bus"), "bus");
    }

    #[test]
    fn test_unicode_words() {
        assert_eq!(content_terms("Política de devoluções"), vec![
            "política".to_string(),
            "devoluçõe".to_string(),
        ]);
    }
}
