//! Content-stem fingerprinting for de-duplication.
//!
//! The hash is deterministic, case-insensitive and whitespace-trimmed, but
//! order-sensitive over the options: reordering options is a different
//! question, re-capitalizing one is not. Not a security boundary; SHA-256
//! just makes accidental collisions negligible.

use sha2::{Digest, Sha256};

use quizsmith_domain::TriviaQuestion;

/// The canonical pre-hash payload, exposed for tests and debugging.
pub fn hash_payload(question: &TriviaQuestion) -> String {
    let options = question
        .options
        .iter()
        .map(|option| option.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|");
    [
        question.category.as_str().to_string(),
        question.difficulty.as_str().to_string(),
        question.question.trim().to_lowercase(),
        options,
        question.explanation.trim().to_lowercase(),
    ]
    .join("::")
}

/// Hex SHA-256 of the canonical payload.
pub fn stem_hash(question: &TriviaQuestion) -> String {
    hex::encode(Sha256::digest(hash_payload(question).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizsmith_domain::{Difficulty, Quips, TriviaCategory};

    fn question() -> TriviaQuestion {
        TriviaQuestion {
            category: TriviaCategory::Science,
            difficulty: Difficulty::Easy,
            seed_echo: "seed".to_string(),
            question: "What gas do plants absorb?".to_string(),
            options: vec![
                "Oxygen".to_string(),
                "Hydrogen".to_string(),
                "Carbon Dioxide".to_string(),
                "Nitrogen".to_string(),
            ],
            correct_index: 2,
            explanation: "Plants absorb carbon dioxide.".to_string(),
            quips: Quips {
                correct: "Nice.".to_string(),
                incorrect: "Nope.".to_string(),
            },
        }
    }

    #[test]
    fn hash_ignores_case_and_surrounding_whitespace() {
        let base = stem_hash(&question());

        let mut shouty = question();
        shouty.question = "  WHAT GAS DO PLANTS ABSORB?  ".to_string();
        shouty.options[0] = " OXYGEN ".to_string();
        assert_eq!(stem_hash(&shouty), base);
    }

    #[test]
    fn hash_ignores_seed_and_quips() {
        let base = stem_hash(&question());
        let mut other = question();
        other.seed_echo = "different".to_string();
        other.quips.correct = "Completely different quip.".to_string();
        assert_eq!(stem_hash(&other), base);
    }

    #[test]
    fn hash_changes_when_an_option_changes() {
        let base = stem_hash(&question());
        let mut changed = question();
        changed.options[1] = "Helium".to_string();
        assert_ne!(stem_hash(&changed), base);
    }

    #[test]
    fn hash_is_sensitive_to_option_order() {
        let base = stem_hash(&question());
        let mut swapped = question();
        swapped.options.swap(0, 1);
        assert_ne!(stem_hash(&swapped), base);
    }

    #[test]
    fn hash_changes_with_category_and_difficulty() {
        let base = stem_hash(&question());
        let mut other = question();
        other.category = TriviaCategory::History;
        assert_ne!(stem_hash(&other), base);

        let mut harder = question();
        harder.difficulty = Difficulty::Hard;
        assert_ne!(stem_hash(&harder), base);
    }
}
