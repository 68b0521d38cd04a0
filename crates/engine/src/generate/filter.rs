//! Content-safety filtering of generated questions.

use regex_lite::Regex;

use quizsmith_domain::{PersonalityFlags, TriviaQuestion};

/// Pluggable safety predicate. The standard filter covers the common cases;
/// deployments with their own moderation pipeline inject a replacement.
pub trait ContentFilter: Send + Sync {
    fn allows(&self, question: &TriviaQuestion, flags: &PersonalityFlags) -> bool;
}

/// Banned-phrase list plus pattern checks for explicit content (gated by the
/// innuendo flag), medical/legal advice, and graphic violence.
pub struct StandardContentFilter {
    banned_phrases: Vec<&'static str>,
    explicit: Regex,
    advice: Regex,
    violence: Regex,
}

impl StandardContentFilter {
    pub fn new() -> Self {
        Self {
            banned_phrases: vec!["kill yourself", "nazi", "lynch"],
            explicit: Regex::new(r"(sex|porn|explicit)").expect("static pattern"),
            advice: Regex::new(r"(diagnose|prescribe|lawsuit|legal advice|medical advice)")
                .expect("static pattern"),
            violence: Regex::new(r"(graphic violence|gore)").expect("static pattern"),
        }
    }
}

impl Default for StandardContentFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentFilter for StandardContentFilter {
    fn allows(&self, question: &TriviaQuestion, flags: &PersonalityFlags) -> bool {
        let mut parts = vec![question.question.as_str()];
        parts.extend(question.options.iter().map(String::as_str));
        parts.push(question.explanation.as_str());
        parts.push(question.quips.correct.as_str());
        parts.push(question.quips.incorrect.as_str());
        let text = parts.join(" ").to_lowercase();

        if self.banned_phrases.iter().any(|b| text.contains(b)) {
            return false;
        }
        if !flags.allow_light_innuendo && self.explicit.is_match(&text) {
            return false;
        }
        if self.advice.is_match(&text) {
            return false;
        }
        if self.violence.is_match(&text) {
            return false;
        }
        true
    }
}
