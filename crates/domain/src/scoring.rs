//! Round scoring. Pure and deterministic: correctness, remaining time, and
//! streak length in, point deltas out.

use chrono::{DateTime, Utc};

pub const BASE_POINTS: u32 = 100;
pub const TIME_BONUS_MAX: u32 = 50;
pub const STREAK_BONUS_MAX: u32 = 50;
pub const STREAK_BONUS_PER_STEP: u32 = 10;

/// Window over which the time bonus decays linearly to zero.
const TIME_BONUS_WINDOW_MS: i64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreRoundArgs {
    pub correct: bool,
    pub answered_at: DateTime<Utc>,
    pub open_at: DateTime<Utc>,
    pub round_ends_at: DateTime<Utc>,
    pub prev_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub base: u32,
    pub time_bonus: u32,
    pub streak_bonus: u32,
    pub delta: u32,
    pub next_streak: u32,
}

/// Compute the score delta for one answered round.
///
/// Base is 100 for a correct answer. A correct answer also earns up to 50
/// points of time bonus, linear in the time remaining (30 s of slack maps to
/// the full 50), and 10 points per step of existing streak capped at 50. A
/// wrong answer earns nothing and resets the streak.
pub fn score_round(args: ScoreRoundArgs) -> ScoreBreakdown {
    let base = if args.correct { BASE_POINTS } else { 0 };

    // The effective end never precedes the open; an answer timestamped past
    // the end is clamped so the bonus bottoms out at zero instead of going
    // negative.
    let ends_at = args.round_ends_at.max(args.open_at);
    let answered = args.answered_at.min(ends_at);
    let time_bonus = if args.correct {
        let remaining_ms = (ends_at - answered).num_milliseconds().max(0);
        let scaled = remaining_ms * i64::from(TIME_BONUS_MAX) / TIME_BONUS_WINDOW_MS;
        scaled.clamp(0, i64::from(TIME_BONUS_MAX)) as u32
    } else {
        0
    };

    let streak_bonus = if args.correct {
        (args.prev_streak * STREAK_BONUS_PER_STEP).min(STREAK_BONUS_MAX)
    } else {
        0
    };

    ScoreBreakdown {
        base,
        time_bonus,
        streak_bonus,
        delta: base + time_bonus + streak_bonus,
        next_streak: if args.correct { args.prev_streak + 1 } else { 0 },
    }
}
