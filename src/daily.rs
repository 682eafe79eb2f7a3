// Daily tip, fact of the day, the quick quiz and the hydration cadence.

use std::time::Duration;

pub const SECS_PER_DAY: i64 = 86_400;

pub const HYDRATION_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

pub const DAILY_TIPS: &[&str] = &[
    "A 5-minute walk after meals helps stabilize energy.",
    "Stack habits: tie water sips to app switches or calls.",
    "Slow your exhale: 4-in / 6-out reduces stress fast.",
    "Keep fruit visible; you'll eat it more.",
    "Protect sleep: same wake-up time every day.",
];

pub const MINDFULNESS_FACTS: &[&str] = &[
    "Long exhale stimulates the parasympathetic (calming) response.",
    "Light morning sunlight helps anchor your body clock.",
    "Journaling for 5 minutes can reduce rumination.",
    "Walking meetings boost creativity in many small studies.",
    "A tidy desk can reduce cognitive load and decision fatigue.",
];

/// Tip picked from the raw second count.
pub fn tip_for(unix_secs: i64) -> &'static str {
    DAILY_TIPS[unix_secs.rem_euclid(DAILY_TIPS.len() as i64) as usize]
}

/// Fact picked from the day index; stable for a whole UTC day.
pub fn fact_for(unix_secs: i64) -> &'static str {
    let day = unix_secs.div_euclid(SECS_PER_DAY);
    MINDFULNESS_FACTS[day.rem_euclid(MINDFULNESS_FACTS.len() as i64) as usize]
}

pub struct Quiz {
    pub question: &'static str,
    pub options: &'static [&'static str],
    pub correct: usize,
    pub explanation: &'static str,
}

pub const SLEEP_QUIZ: Quiz = Quiz {
    question: "Which habit most reliably improves sleep quality over time?",
    options: &[
        "Taking long daytime naps",
        "Keeping a consistent wake-up time",
        "Drinking more coffee in the afternoon",
        "Heavy late-night workouts",
    ],
    correct: 1,
    explanation: "Consistent wake-up anchors the circadian rhythm.",
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizVerdict {
    NoSelection,
    Correct,
    Incorrect,
}

impl Quiz {
    pub fn check(&self, selected: Option<usize>) -> QuizVerdict {
        match selected {
            None => QuizVerdict::NoSelection,
            Some(idx) if idx == self.correct => QuizVerdict::Correct,
            Some(_) => QuizVerdict::Incorrect,
        }
    }
}
