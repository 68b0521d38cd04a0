//! Tone-aware fallback quips for drawn questions that carry none.

use rand::seq::SliceRandom;

use quizsmith_domain::Tone;

pub struct QuipContext<'a> {
    pub correct: bool,
    pub chosen_index: usize,
    pub tone: Tone,
    /// Text of the option the player picked, when the caller has it.
    pub option_text: Option<&'a str>,
}

/// Build a one-liner reacting to the chosen option.
pub fn quip_for(ctx: &QuipContext<'_>) -> String {
    let opt = match ctx.option_text {
        Some(text) => format!("\"{text}\""),
        None => format!("option {}", ctx.chosen_index + 1),
    };

    let base: Vec<String> = if ctx.correct {
        vec![
            format!("Clean hit on {opt}."),
            format!("Right on the money with {opt}."),
            format!("Nailed it - {opt} was the move."),
        ]
    } else {
        vec![
            format!("Not {opt}. Happens to the best of us."),
            format!("{opt}? Bold. Not correct though."),
            format!("Close, but {opt} wasn't it."),
        ]
    };

    let by_tone: Vec<String> = match (ctx.tone, ctx.correct) {
        (Tone::Snark, true) => vec![
            format!("Look at you, {opt} savant."),
            format!("Flexing knowledge with {opt}."),
        ],
        (Tone::Snark, false) => vec![
            format!("{opt}? Respect the chaos, not the answer."),
            format!("Spicy choice with {opt}. Spicier nope."),
        ],
        (Tone::Deadpan, true) => vec![format!("{opt}. Correct. Minimal applause.")],
        (Tone::Deadpan, false) => vec![format!("{opt}. Incorrect. Proceed.")],
        (Tone::Professor, true) => vec![format!("Indeed, {opt}. Textbook answer.")],
        (Tone::Professor, false) => vec![format!("{opt} is a common misconception.")],
        (Tone::RoastLite, true) => vec![format!("Okay brainiac, {opt} was obvious.")],
        (Tone::RoastLite, false) => vec![format!("{opt}? I admire the confidence.")],
    };

    let mut pool = base;
    pool.extend(by_tone);
    pool.choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_else(|| "Well, that happened.".to_string())
}
