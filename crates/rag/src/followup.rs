//! Follow-up detection.
//!
//! Decides whether a query continues the active topic or starts a new one,
//! using an ordered table of referential cues. The classifier is rule based
//! and never calls the language model, so every decision can be explained by
//! the rule that produced it.
//!
//! Evaluation order:
//!
//! | # | rule                  | strength | fires when                                          |
//! |---|-----------------------|----------|-----------------------------------------------------|
//! | 0 | `EmptyMemory`         | -        | no prior exchange: always FRESH                     |
//! | 1 | `ElaborationRequest`  | strong   | "tell me more", "what about", "elaborate", ...      |
//! | 2 | `PronounReference`    | strong   | it / its / they / them / their / he / she ...       |
//! | 3 | `DemonstrativeReference` | weak  | this / that / these / those                          |
//! | 4 | `EllipticalFragment`  | weak     | at most three words, or opens with and/but/or/also/so |
//! | - | `NoCue`               | -        | nothing matched: FRESH                              |
//!
//! A strong cue yields FOLLOW_UP. A weak cue yields FOLLOW_UP only when the
//! query brings no new topic keyword (a content term absent from every
//! remembered exchange); otherwise the result is FRESH via `NewTopicKeyword`.
//! Instruction verbs such as "convert" or "compare" say what to do with the
//! active topic, not what the topic is, so they never count as keywords.

use crate::memory::ConversationMemory;
use crate::text;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Multi-word phrases asking to expand on the previous answer.
const ELABORATION_PHRASES: &[&str] = &[
    "tell me more",
    "more about",
    "more on",
    "more details",
    "more detail",
    "what about",
    "how about",
    "what else",
    "and what",
    "explain further",
    "expand on",
    "go on",
    "say more",
];

/// Single words asking to expand on the previous answer.
const ELABORATION_WORDS: &[&str] = &["elaborate", "continue", "clarify"];

/// Pronouns that need an antecedent from earlier turns.
const PERSONAL_PRONOUNS: &[&str] = &[
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "he", "him", "his",
    "she", "her", "hers",
];

const DEMONSTRATIVES: &[&str] = &["this", "that", "these", "those"];

/// Conjunctions that mark a query as the continuation of a sentence.
const CONTINUATION_OPENERS: &[&str] = &["and", "but", "or", "also", "so", "then"];

/// Verbs that operate on the current topic rather than name a new one.
const INSTRUCTION_VERBS: &[&str] = &[
    "convert", "compare", "calculate", "compute", "list", "show", "explain", "describe",
    "summarize", "summarise", "repeat", "translate", "define", "estimate",
];

/// Maximum word count for a query to read as an elliptical fragment.
pub const FRAGMENT_MAX_WORDS: usize = 3;

/// Outcome of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryKind {
    Fresh,
    FollowUp,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::FollowUp => "follow-up",
        }
    }

    pub fn is_follow_up(&self) -> bool {
        matches!(self, Self::FollowUp)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule that decided a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpRule {
    EmptyMemory,
    ElaborationRequest,
    PronounReference,
    DemonstrativeReference,
    EllipticalFragment,
    NewTopicKeyword,
    NoCue,
}

impl FollowUpRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyMemory => "empty_memory",
            Self::ElaborationRequest => "elaboration_request",
            Self::PronounReference => "pronoun_reference",
            Self::DemonstrativeReference => "demonstrative_reference",
            Self::EllipticalFragment => "elliptical_fragment",
            Self::NewTopicKeyword => "new_topic_keyword",
            Self::NoCue => "no_cue",
        }
    }
}

/// How much a cue alone says about continuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueStrength {
    /// Decides FOLLOW_UP on its own.
    Strong,
    /// Decides FOLLOW_UP unless the query introduces a new topic keyword.
    Weak,
}

/// Classification result with the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: QueryKind,
    pub rule: FollowUpRule,
}

impl Classification {
    fn new(kind: QueryKind, rule: FollowUpRule) -> Self {
        Self { kind, rule }
    }

    pub fn is_follow_up(&self) -> bool {
        self.kind.is_follow_up()
    }
}

/// Features computed once per query and shared by every cue.
struct QueryFeatures {
    words: Vec<String>,
    /// Words joined by single spaces with a space at each end, for phrase matching
    padded: String,
}

impl QueryFeatures {
    fn new(query: &str) -> Self {
        let words = text::words(query);
        let padded = format!(" {} ", words.join(" "));
        Self { words, padded }
    }

    fn has_word(&self, candidates: &[&str]) -> bool {
        self.words.iter().any(|w| candidates.contains(&w.as_str()))
    }
}

/// One row of the rule table.
pub struct CueRule {
    pub rule: FollowUpRule,
    pub strength: CueStrength,
    matches: fn(&QueryFeatures) -> bool,
}

fn is_elaboration(features: &QueryFeatures) -> bool {
    ELABORATION_PHRASES
        .iter()
        .any(|phrase| features.padded.contains(&format!(" {} ", phrase)))
        || features.has_word(ELABORATION_WORDS)
}

fn is_pronoun_reference(features: &QueryFeatures) -> bool {
    features.has_word(PERSONAL_PRONOUNS)
}

fn is_demonstrative_reference(features: &QueryFeatures) -> bool {
    features.has_word(DEMONSTRATIVES)
}

fn is_elliptical_fragment(features: &QueryFeatures) -> bool {
    let opens_with_conjunction = features
        .words
        .first()
        .map(|w| CONTINUATION_OPENERS.contains(&w.as_str()))
        .unwrap_or(false);

    (!features.words.is_empty() && features.words.len() <= FRAGMENT_MAX_WORDS)
        || opens_with_conjunction
}

/// Cue rules in evaluation order.
pub const CUE_RULES: &[CueRule] = &[
    CueRule {
        rule: FollowUpRule::ElaborationRequest,
        strength: CueStrength::Strong,
        matches: is_elaboration,
    },
    CueRule {
        rule: FollowUpRule::PronounReference,
        strength: CueStrength::Strong,
        matches: is_pronoun_reference,
    },
    CueRule {
        rule: FollowUpRule::DemonstrativeReference,
        strength: CueStrength::Weak,
        matches: is_demonstrative_reference,
    },
    CueRule {
        rule: FollowUpRule::EllipticalFragment,
        strength: CueStrength::Weak,
        matches: is_elliptical_fragment,
    },
];

/// Heuristic FRESH / FOLLOW_UP classifier.
#[derive(Debug, Clone, Default)]
pub struct FollowUpDetector;

impl FollowUpDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify `query` against the remembered conversation.
    pub fn classify(&self, query: &str, memory: &ConversationMemory) -> Classification {
        if memory.is_empty() {
            return Classification::new(QueryKind::Fresh, FollowUpRule::EmptyMemory);
        }

        let features = QueryFeatures::new(query);

        for cue in CUE_RULES {
            if !(cue.matches)(&features) {
                continue;
            }

            let classification = match cue.strength {
                CueStrength::Strong => Classification::new(QueryKind::FollowUp, cue.rule),
                CueStrength::Weak => match new_topic_keyword(query, memory) {
                    Some(keyword) => {
                        tracing::debug!(
                            "Weak cue {} overridden by new topic keyword '{}'",
                            cue.rule.as_str(),
                            keyword
                        );
                        Classification::new(QueryKind::Fresh, FollowUpRule::NewTopicKeyword)
                    }
                    None => Classification::new(QueryKind::FollowUp, cue.rule),
                },
            };

            tracing::debug!(
                "Classified '{}' as {} by rule {}",
                query,
                classification.kind,
                classification.rule.as_str()
            );
            return classification;
        }

        Classification::new(QueryKind::Fresh, FollowUpRule::NoCue)
    }
}

/// Maximum number of topic terms carried into a rewritten follow-up query.
pub const MAX_TOPIC_TERMS: usize = 6;

/// Expand a follow-up query with the topic of the previous exchange.
///
/// Appends the content terms of the last retrieval query that the follow-up
/// does not already contain, so "What about national?" after "What are the
/// shipping costs?" searches for "What about national? shipping cost".
/// Returns the trimmed query unchanged when memory is empty or nothing new
/// would be added.
pub fn rewrite_query(query: &str, memory: &ConversationMemory) -> String {
    let query = query.trim();
    let Some(last) = memory.last() else {
        return query.to_string();
    };

    let present: HashSet<String> = text::content_terms(query).into_iter().collect();
    let topic: Vec<String> = text::content_terms(last.retrieval_query())
        .into_iter()
        .filter(|term| !present.contains(term))
        .take(MAX_TOPIC_TERMS)
        .collect();

    if topic.is_empty() {
        query.to_string()
    } else {
        format!("{} {}", query, topic.join(" "))
    }
}

/// First content term of `query` not seen in any remembered exchange.
fn new_topic_keyword(query: &str, memory: &ConversationMemory) -> Option<String> {
    let known: HashSet<String> = memory
        .iter()
        .flat_map(|exchange| {
            let mut terms = text::content_terms(exchange.query());
            terms.extend(text::content_terms(exchange.retrieval_query()));
            terms.extend(text::content_terms(exchange.answer()));
            terms
        })
        .collect();

    text::content_terms(query)
        .into_iter()
        .filter(|term| !INSTRUCTION_VERBS.contains(&term.as_str()))
        .find(|term| !known.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Exchange;

    fn memory_with(query: &str, answer: &str) -> ConversationMemory {
        let mut memory = ConversationMemory::new(3);
        memory.append(Exchange::new(query, query, answer, Vec::new(), QueryKind::Fresh));
        memory
    }

    fn shipping_memory() -> ConversationMemory {
        memory_with(
            "What are the shipping costs?",
            "Shipping costs $5 for standard delivery and $15 for express.",
        )
    }

    #[test]
    fn test_empty_memory_always_fresh() {
        let detector = FollowUpDetector::new();
        let memory = ConversationMemory::new(3);

        for query in ["What about national?", "Tell me more", "it", "Convert 200", ""] {
            let c = detector.classify(query, &memory);
            assert_eq!(c.kind, QueryKind::Fresh);
            assert_eq!(c.rule, FollowUpRule::EmptyMemory);
        }
    }

    #[test]
    fn test_what_about_after_shipping_costs() {
        let detector = FollowUpDetector::new();
        let memory = memory_with("What are the shipping costs?", "It depends on the zone.");

        let c = detector.classify("What about national?", &memory);
        assert_eq!(c.kind, QueryKind::FollowUp);
        assert_eq!(c.rule, FollowUpRule::ElaborationRequest);
    }

    #[test]
    fn test_tell_me_more() {
        let detector = FollowUpDetector::new();
        let memory = memory_with("How can I return a product?", "Within 30 days.");

        let c = detector.classify("Tell me more about the timeframe", &memory);
        assert_eq!(c.kind, QueryKind::FollowUp);
        assert_eq!(c.rule, FollowUpRule::ElaborationRequest);
    }

    #[test]
    fn test_pronoun_is_strong_even_with_new_keyword() {
        let detector = FollowUpDetector::new();
        let c = detector.classify("Does it apply to refurbished laptops?", &shipping_memory());
        assert_eq!(c.kind, QueryKind::FollowUp);
        assert_eq!(c.rule, FollowUpRule::PronounReference);
    }

    #[test]
    fn test_demonstrative_without_new_topic() {
        let detector = FollowUpDetector::new();
        let c = detector.classify("Is that for express delivery?", &shipping_memory());
        assert_eq!(c.kind, QueryKind::FollowUp);
        assert_eq!(c.rule, FollowUpRule::DemonstrativeReference);
    }

    #[test]
    fn test_demonstrative_with_new_topic_is_fresh() {
        let detector = FollowUpDetector::new();
        let c = detector.classify("What is the warranty on this laptop?", &shipping_memory());
        assert_eq!(c.kind, QueryKind::Fresh);
        assert_eq!(c.rule, FollowUpRule::NewTopicKeyword);
    }

    #[test]
    fn test_short_fragment_on_known_topic() {
        let detector = FollowUpDetector::new();
        let memory = memory_with(
            "What is the exchange rate from USD to EUR?",
            "The rate is 0.92 EUR per USD.",
        );

        let c = detector.classify("Convert 200", &memory);
        assert_eq!(c.kind, QueryKind::FollowUp);
        assert_eq!(c.rule, FollowUpRule::EllipticalFragment);
    }

    #[test]
    fn test_instruction_verb_with_new_noun_is_fresh() {
        let detector = FollowUpDetector::new();
        let memory = memory_with(
            "What is the exchange rate from USD to EUR?",
            "The rate is 0.92 EUR per USD.",
        );

        let c = detector.classify("Compare warranty plans", &memory);
        assert_eq!(c.kind, QueryKind::Fresh);
        assert_eq!(c.rule, FollowUpRule::NewTopicKeyword);
    }

    #[test]
    fn test_short_fragment_with_new_topic_is_fresh() {
        let detector = FollowUpDetector::new();
        let c = detector.classify("Warranty policy", &shipping_memory());
        assert_eq!(c.kind, QueryKind::Fresh);
        assert_eq!(c.rule, FollowUpRule::NewTopicKeyword);
    }

    #[test]
    fn test_conjunction_opener() {
        let detector = FollowUpDetector::new();
        let memory = memory_with(
            "How long does express delivery take to Canada?",
            "Express delivery takes 3 days.",
        );

        let c = detector.classify("And for express delivery to Canada, how long?", &memory);
        assert_eq!(c.kind, QueryKind::FollowUp);
        assert_eq!(c.rule, FollowUpRule::EllipticalFragment);
    }

    #[test]
    fn test_complete_new_question_is_fresh() {
        let detector = FollowUpDetector::new();
        let c = detector.classify("How can I return a product?", &shipping_memory());
        assert_eq!(c.kind, QueryKind::Fresh);
        assert_eq!(c.rule, FollowUpRule::NoCue);
    }

    #[test]
    fn test_phrases_match_on_word_boundaries() {
        let detector = FollowUpDetector::new();
        // "ongoing" must not trigger "go on"; "item" must not trigger "it"
        let c = detector.classify(
            "Which ongoing item discounts exist for members?",
            &shipping_memory(),
        );
        assert_eq!(c.kind, QueryKind::Fresh);
        assert_eq!(c.rule, FollowUpRule::NoCue);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let detector = FollowUpDetector::new();
        let memory = shipping_memory();
        let first = detector.classify("What about national?", &memory);
        let second = detector.classify("What about national?", &memory);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rewrite_carries_previous_topic() {
        let memory = shipping_memory();
        assert_eq!(
            rewrite_query("What about national?", &memory),
            "What about national? shipping cost"
        );
    }

    #[test]
    fn test_rewrite_skips_terms_already_present() {
        let memory = shipping_memory();
        assert_eq!(
            rewrite_query("  Shipping costs for express?  ", &memory),
            "Shipping costs for express?"
        );
    }

    #[test]
    fn test_rewrite_uses_retrieval_query_of_last_exchange() {
        let mut memory = shipping_memory();
        memory.append(Exchange::new(
            "What about national?",
            "What about national? shipping cost",
            "National shipping is $5.",
            Vec::new(),
            QueryKind::FollowUp,
        ));

        assert_eq!(
            rewrite_query("And international?", &memory),
            "And international? national shipping cost"
        );
    }

    #[test]
    fn test_rewrite_with_empty_memory() {
        let memory = ConversationMemory::new(3);
        assert_eq!(rewrite_query(" Tell me more ", &memory), "Tell me more");
    }

    #[test]
    fn test_rewrite_caps_topic_terms() {
        let memory = memory_with(
            "alpha bravo charlie delta echo foxtrot golf hotel",
            "phonetic alphabet",
        );
        let rewritten = rewrite_query("tell me more", &memory);
        assert_eq!(
            rewritten,
            "tell me more alpha bravo charlie delta echo foxtrot"
        );
    }

    #[test]
    fn test_rule_table_order() {
        let rules: Vec<FollowUpRule> = CUE_RULES.iter().map(|r| r.rule).collect();
        assert_eq!(
            rules,
            vec![
                FollowUpRule::ElaborationRequest,
                FollowUpRule::PronounReference,
                FollowUpRule::DemonstrativeReference,
                FollowUpRule::EllipticalFragment,
            ]
        );
        assert_eq!(CUE_RULES[0].strength, CueStrength::Strong);
        assert_eq!(CUE_RULES[3].strength, CueStrength::Weak);
    }
}
