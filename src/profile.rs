// User profile as collected by the sidebar form.

use std::fmt;

pub const MIN_AGE: u8 = 1;
pub const MAX_AGE: u8 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diet {
    Omnivore,
    Pescatarian,
    Vegetarian,
    Vegan,
}

impl Diet {
    pub const ALL: [Diet; 4] = [Diet::Omnivore, Diet::Pescatarian, Diet::Vegetarian, Diet::Vegan];

    pub fn label(&self) -> &'static str {
        match self {
            Diet::Omnivore => "Omnivore",
            Diet::Pescatarian => "Pescatarian",
            Diet::Vegetarian => "Vegetarian",
            Diet::Vegan => "Vegan",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 3] = [ActivityLevel::Low, ActivityLevel::Medium, ActivityLevel::High];

    pub fn label(&self) -> &'static str {
        match self {
            ActivityLevel::Low => "Low",
            ActivityLevel::Medium => "Medium",
            ActivityLevel::High => "High",
        }
    }
}

macro_rules! display_via_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_via_label!(Gender, Diet, ActivityLevel);

/// Step to the neighbouring option of a fixed list, wrapping at both ends.
pub fn cycle<T: Copy + PartialEq>(options: &[T], current: T, forward: bool) -> T {
    let idx = options.iter().position(|o| *o == current).unwrap_or(0);
    let len = options.len();
    let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
    options[next]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub country: String,
    pub state: String,
    pub region: String,
    pub age: u8,
    pub gender: Gender,
    pub diet: Diet,
    pub activity: ActivityLevel,
    /// Sanitized; empty when not provided.
    pub health: String,
    /// Sanitized; required to generate a plan.
    pub goal: String,
    /// Sanitized; empty when not provided.
    pub reason: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            country: "India".to_string(),
            state: "Gujarat".to_string(),
            region: "Bharuch".to_string(),
            age: 30,
            gender: Gender::Male,
            diet: Diet::Omnivore,
            activity: ActivityLevel::Low,
            health: String::new(),
            goal: String::new(),
            reason: String::new(),
        }
    }
}

impl UserProfile {
    pub fn with_age(mut self, age: u8) -> Self {
        self.age = age.clamp(MIN_AGE, MAX_AGE);
        self
    }

    /// Location used for local wellness info: `region, country`.
    pub fn local_info_location(&self) -> String {
        format!("{}, {}", self.region.trim(), self.country.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_wraps_both_ways() {
        assert_eq!(cycle(&Diet::ALL, Diet::Vegan, true), Diet::Omnivore);
        assert_eq!(cycle(&Diet::ALL, Diet::Omnivore, false), Diet::Vegan);
        assert_eq!(cycle(&Gender::ALL, Gender::Male, true), Gender::Female);
    }

    #[test]
    fn age_is_clamped_to_form_range() {
        assert_eq!(UserProfile::default().with_age(0).age, MIN_AGE);
        assert_eq!(UserProfile::default().with_age(250).age, MAX_AGE);
        assert_eq!(UserProfile::default().with_age(42).age, 42);
    }

    #[test]
    fn local_info_location_is_region_then_country() {
        assert_eq!(UserProfile::default().local_info_location(), "Bharuch, India");
    }
}
