//! Prompt construction for single-question generation.

use quizsmith_domain::PersonalityFlags;

use super::ResolvedParams;

pub(crate) fn system_prompt(flags: &PersonalityFlags, tone: quizsmith_domain::Tone) -> String {
    let mut constraints = vec![
        "You are a trivia writer blended with a late-night monologue writer.",
        "You output strictly JSON and never include prose outside the JSON.",
        "No slurs, no targeted harassment, no punching down.",
        "Stay playful, PG-13. Keep it kind and witty.",
        "Avoid copyrighted one-line quotes as answers; paraphrase instead.",
        "No explicit sexual content. No medical or legal advice.",
    ];
    if flags.no_politics {
        constraints.push("Avoid modern political punditry or partisan content.");
    }
    if !flags.allow_light_innuendo {
        constraints.push("Avoid sexual innuendo.");
    }
    format!(
        "{} Tone: {}. Output must be valid JSON only.",
        constraints.join(" "),
        tone
    )
}

pub(crate) fn user_prompt(p: &ResolvedParams, schema_example: &str, stricter: bool) -> String {
    let fairness = format!(
        "ROLE: {}. DIFF_TOKEN: {}. Produce questions of equivalent difficulty/style \
         for roles A/B using the same diffToken; do NOT reuse the same fact.",
        p.role, p.diff_token
    );
    let seed = format!(
        "SEED: {}. Use this to choose facts and phrasing deterministically. \
         Include \"seedEcho\" with the same value in the JSON.",
        p.seed
    );
    let mut rules = vec![
        format!("Category: {}. Difficulty: {}.", p.category, p.difficulty),
        "Exactly 4 options. Exactly one correctIndex in 0..3.".to_string(),
        "Quips are one-liners. They must reference the chosen option text implicitly, not the player."
            .to_string(),
        "Return only JSON. No backticks, no commentary.".to_string(),
    ];
    if stricter {
        rules.push(
            "Absolutely no text outside JSON. If unsure, output the JSON schema shape verbatim."
                .to_string(),
        );
    }
    format!(
        "{fairness}\n{seed}\n{}\nSchema example:\n{schema_example}",
        rules.join("\n")
    )
}

pub(crate) fn schema_example() -> String {
    let example = serde_json::json!({
        "category": "science",
        "difficulty": "easy",
        "seedEcho": "abc123",
        "question": "What gas do plants absorb during photosynthesis?",
        "options": ["Oxygen", "Hydrogen", "Carbon Dioxide", "Nitrogen"],
        "correctIndex": 2,
        "explanation": "Plants absorb carbon dioxide and release oxygen during photosynthesis.",
        "quips": {
            "correct": "Photosynthetic perfection.",
            "incorrect": "That pick didn't leaf you looking smart.",
        },
    });
    serde_json::to_string_pretty(&example).unwrap_or_else(|_| example.to_string())
}
