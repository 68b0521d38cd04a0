//! Static fallback question set.
//!
//! Seeds every category at construction so the bank can always serve
//! something, even before (or without) a generation credential.

use std::collections::BTreeMap;
use std::collections::HashMap;

use quizsmith_domain::{BankQuestion, GameCategory};

fn question(
    id: &str,
    category: GameCategory,
    text: &str,
    choices: [&str; 4],
    answer_index: usize,
    correct_quip: &str,
    wrong_quips: [(usize, &str); 3],
) -> BankQuestion {
    BankQuestion {
        id: id.to_string(),
        category,
        question: text.to_string(),
        choices: choices.iter().map(|c| c.to_string()).collect(),
        answer_index,
        correct_quip: correct_quip.to_string(),
        wrong_answer_quips: wrong_quips
            .iter()
            .map(|(i, q)| (*i, q.to_string()))
            .collect::<BTreeMap<usize, String>>(),
        used: false,
    }
}

/// Build the starting pools, all questions unused.
pub fn starting_pools() -> HashMap<GameCategory, Vec<BankQuestion>> {
    let mut pools = HashMap::new();

    pools.insert(
        GameCategory::Science,
        vec![
            question(
                "sci-photosynthesis",
                GameCategory::Science,
                "What gas do plants absorb during photosynthesis?",
                ["Oxygen", "Hydrogen", "Carbon Dioxide", "Nitrogen"],
                2,
                "Photosynthetic perfection! Your brain cells clearly aren't dormant.",
                [
                    (0, "Oxygen? Plants exhale that, champ."),
                    (1, "Hydrogen? That's for blimps and bad decisions."),
                    (3, "Nitrogen? Your plants would be sobbing if you fed them that."),
                ],
            ),
            question(
                "sci-electron",
                GameCategory::Science,
                "What particle has a negative charge?",
                ["Proton", "Neutron", "Electron", "Quark"],
                2,
                "You must be positively charged about that correct answer!",
                [
                    (0, "Proton? That's the opposite of helpful."),
                    (1, "Neutron? Neutral much?"),
                    (3, "Quark? Cool word. Still wrong."),
                ],
            ),
        ],
    );

    pools.insert(
        GameCategory::History,
        vec![
            question(
                "his-first-president",
                GameCategory::History,
                "Who was the first president of the United States?",
                ["Abraham Lincoln", "George Washington", "Thomas Jefferson", "John Adams"],
                1,
                "First and finest. Just like your answer.",
                [
                    (0, "Lincoln? Wrong century, legend."),
                    (2, "Jefferson? He wrote, didn't lead first."),
                    (3, "Adams? Almost, but nope."),
                ],
            ),
            question(
                "his-ww2-end",
                GameCategory::History,
                "In what year did World War II end?",
                ["1942", "1945", "1939", "1950"],
                1,
                "Nice! You just won the war on ignorance.",
                [
                    (0, "1942? That's mid-carnage, not the finale."),
                    (2, "1939? That's the kickoff, not the credits."),
                    (3, "1950? That was Korea, not the ending."),
                ],
            ),
        ],
    );

    pools.insert(
        GameCategory::PopCulture,
        vec![question(
            "pop-facemash",
            GameCategory::PopCulture,
            "Which social media platform was originally called 'FaceMash'?",
            ["Instagram", "Facebook", "Snapchat", "TikTok"],
            1,
            "Someone's been paying attention to tech history!",
            [
                (0, "Instagram? That came way later, genius."),
                (2, "Snapchat? Wrong ghost story."),
                (3, "TikTok? You're about a decade off."),
            ],
        )],
    );

    pools.insert(
        GameCategory::ArtMusic,
        vec![question(
            "art-starry-night",
            GameCategory::ArtMusic,
            "Which artist painted 'The Starry Night'?",
            ["Pablo Picasso", "Vincent van Gogh", "Claude Monet", "Salvador Dali"],
            1,
            "You've got some culture in you after all!",
            [
                (0, "Picasso? Wrong artistic movement, buddy."),
                (2, "Monet? He did water lilies, not swirls."),
                (3, "Dali? Too melty, not swirly enough."),
            ],
        )],
    );

    pools.insert(
        GameCategory::Sports,
        vec![question(
            "spo-olympic-rings",
            GameCategory::Sports,
            "How many rings are on the Olympic flag?",
            ["4", "5", "6", "7"],
            1,
            "Olympic knowledge! Going for the gold!",
            [
                (0, "Four? Not enough rings for this circus."),
                (2, "Six? You're overthinking the symbolism."),
                (3, "Seven? This isn't a phone number."),
            ],
        )],
    );

    pools.insert(
        GameCategory::Random,
        vec![question(
            "ran-stolen-cheese",
            GameCategory::Random,
            "What's the most stolen food in the world?",
            ["Bread", "Cheese", "Chocolate", "Bananas"],
            1,
            "You know your crime statistics! Suspicious...",
            [
                (0, "Bread? Too basic for crime."),
                (2, "Chocolate? Sweet guess, but nope."),
                (3, "Bananas? That's just monkey business."),
            ],
        )],
    );

    pools
}
