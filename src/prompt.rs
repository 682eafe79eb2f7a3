//! Prompt construction for the generation service.
//!
//! Everything here is pure: the same profile always renders to the same
//! bytes, and no profile field is ever dropped from a prompt.

use std::sync::LazyLock;

use regex::Regex;

use crate::profile::UserProfile;

static MARKDOWN_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\*_]").expect("marker pattern is valid"));

pub const NO_HEALTH_CONDITIONS: &str = "None";
pub const NO_REASON: &str = "Not specified";

/// Strip markdown emphasis and escape markers (`\`, `*`, `_`) and trim.
pub fn sanitize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    MARKDOWN_MARKERS.replace_all(text, "").trim().to_string()
}

fn or_fallback(value: &str, fallback: &str) -> String {
    let clean = sanitize(value);
    if clean.is_empty() { fallback.to_string() } else { clean }
}

pub fn build_plan_prompt(profile: &UserProfile) -> String {
    format!(
        r#"
You are GlobalWell AI, an empathetic AI Wellness Buddy. Provide a personalized, actionable wellness plan that aligns with **UN SDG 3**.


**Core Instructions:**
1. Accessibility & Affordability: Practical, low-cost, seasonal foods; minimal-equipment fitness.
2. Holistic: Cover nutrition, physical activity, mental well-being, and sleep.
3. Restriction: No specific supplements/medicines/drugs.
4. Add a section: **Alignment with SDG 3**.


**User Profile:**
- Location: {region}, {state}, {country} | Age: {age}, Gender: {gender}
- Diet: {diet}, Activity: {activity} | Health Conditions: {health}
- Goal: {goal} | Reason: {reason}
"#,
        region = sanitize(&profile.region),
        state = sanitize(&profile.state),
        country = sanitize(&profile.country),
        age = profile.age,
        gender = profile.gender,
        diet = profile.diet,
        activity = profile.activity,
        health = or_fallback(&profile.health, NO_HEALTH_CONDITIONS),
        goal = sanitize(&profile.goal),
        reason = or_fallback(&profile.reason, NO_REASON),
    )
}

pub fn build_local_info_prompt(location: &str) -> String {
    format!(
        r#"
As GlobalWell AI, for a user in **{location}**:
1. **Hyper-Local Produce Guide:** List 3–4 seasonal, affordable, nutritious fruits/vegetables readily available now.
2. **Wellness Myth Buster:** One relevant "Myth vs. Fact" debunking an expensive trend with a simple alternative.
Format clearly with markdown.
"#
    )
}

/// The plan travels inside the prompt; the service gets no other context.
pub fn build_chat_prompt(plan: &str, question: &str) -> String {
    format!("Based on this plan:\n{plan}\n\nUser question: {question}\nAnswer:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ActivityLevel, Diet, Gender};

    fn sample_profile() -> UserProfile {
        UserProfile {
            country: "Kenya".into(),
            state: "Nairobi County".into(),
            region: "Nairobi".into(),
            age: 41,
            gender: Gender::Female,
            diet: Diet::Vegetarian,
            activity: ActivityLevel::Medium,
            health: "mild asthma".into(),
            goal: "run a 5k".into(),
            reason: "charity race".into(),
        }
    }

    #[test]
    fn sanitize_removes_markers_and_trims() {
        assert_eq!(sanitize("  **bold** _it_ \\n  "), "bold it n");
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("***___\\\\"), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let samples = [
            "",
            "plain",
            "  * leading star",
            "_ _ _",
            "mixed \\*escaped\\* and __under__  ",
            "ünïcødé * ok",
            " * \t",
        ];
        for s in samples {
            let once = sanitize(s);
            assert_eq!(sanitize(&once), once, "input {s:?}");
            assert!(!once.contains(['\\', '*', '_']), "input {s:?}");
        }
    }

    #[test]
    fn plan_prompt_is_deterministic() {
        let profile = sample_profile();
        assert_eq!(build_plan_prompt(&profile), build_plan_prompt(&profile.clone()));
    }

    #[test]
    fn plan_prompt_carries_every_field() {
        let prompt = build_plan_prompt(&sample_profile());
        for needle in [
            "Nairobi, Nairobi County, Kenya",
            "Age: 41",
            "Gender: Female",
            "Diet: Vegetarian",
            "Activity: Medium",
            "Health Conditions: mild asthma",
            "Goal: run a 5k",
            "Reason: charity race",
            "**Alignment with SDG 3**",
        ] {
            assert!(prompt.contains(needle), "missing {needle:?}");
        }
    }

    #[test]
    fn plan_prompt_uses_fallbacks_for_empty_optionals() {
        let mut profile = sample_profile();
        profile.health.clear();
        profile.reason = "   ".into();
        let prompt = build_plan_prompt(&profile);
        assert!(prompt.contains("Health Conditions: None"));
        assert!(prompt.contains("Reason: Not specified"));
    }

    #[test]
    fn plan_prompt_sanitizes_free_text() {
        let mut profile = sample_profile();
        profile.goal = "**sleep** _better_".into();
        assert!(build_plan_prompt(&profile).contains("Goal: sleep better |"));
    }

    #[test]
    fn local_info_prompt_interpolates_location() {
        let prompt = build_local_info_prompt("Bharuch, India");
        assert!(prompt.contains("for a user in **Bharuch, India**"));
        assert!(prompt.contains("Myth vs. Fact"));
    }

    #[test]
    fn chat_prompt_embeds_plan_and_question() {
        let prompt = build_chat_prompt("## Sleep\nBed by 10", "Can I nap?");
        assert_eq!(
            prompt,
            "Based on this plan:\n## Sleep\nBed by 10\n\nUser question: Can I nap?\nAnswer:"
        );
    }
}
