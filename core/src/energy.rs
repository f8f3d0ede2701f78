//! Initial daily calorie estimate used to seed a new profile.

use chrono::{Datelike, NaiveDate};

use crate::models::GoalType;

pub const GOAL_ADJUSTMENT_KCAL: f64 = 500.0;

#[derive(Debug, Clone)]
pub struct BodyMetrics<'a> {
    pub gender: &'a str,
    pub birthdate: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: &'a str,
}

#[must_use]
pub fn activity_multiplier(level: &str) -> f64 {
    match level {
        "light" => 1.375,
        "moderate" => 1.55,
        "active" => 1.725,
        "very_active" => 1.9,
        _ => 1.2,
    }
}

/// Whole years between `birthdate` and `today`.
#[must_use]
pub fn age_on(birthdate: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birthdate.year();
    if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
        age -= 1;
    }
    age.max(0)
}

/// Mifflin-St Jeor basal metabolic rate.
#[must_use]
pub fn basal_metabolic_rate(metrics: &BodyMetrics<'_>, today: NaiveDate) -> f64 {
    let age = f64::from(age_on(metrics.birthdate, today));
    let base = 10.0 * metrics.weight_kg + 6.25 * metrics.height_cm - 5.0 * age;
    if metrics.gender.eq_ignore_ascii_case("male") {
        base + 5.0
    } else {
        base - 161.0
    }
}

/// Daily calorie goal: TDEE adjusted by ±500 kcal for lose/gain, truncated.
#[must_use]
pub fn daily_calorie_goal(metrics: &BodyMetrics<'_>, goal: GoalType, today: NaiveDate) -> i64 {
    let tdee = basal_metabolic_rate(metrics, today) * activity_multiplier(metrics.activity_level);
    let adjusted = match goal {
        GoalType::Lose => tdee - GOAL_ADJUSTMENT_KCAL,
        GoalType::Maintain => tdee,
        GoalType::Gain => tdee + GOAL_ADJUSTMENT_KCAL,
    };
    adjusted.max(0.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn metrics(gender: &'static str, activity: &'static str) -> BodyMetrics<'static> {
        BodyMetrics {
            gender,
            birthdate: NaiveDate::from_ymd_opt(1994, 1, 10).unwrap(),
            height_cm: 180.0,
            weight_kg: 80.0,
            activity_level: activity,
        }
    }

    #[test]
    fn test_age_on() {
        let birth = NaiveDate::from_ymd_opt(1990, 6, 16).unwrap();
        assert_eq!(age_on(birth, today()), 33);
        let birth = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();
        assert_eq!(age_on(birth, today()), 34);
    }

    #[test]
    fn test_bmr_male_and_female() {
        // 10*80 + 6.25*180 - 5*30 = 1775, then +5 / -161
        let male = basal_metabolic_rate(&metrics("male", "sedentary"), today());
        assert!((male - 1780.0).abs() < 1e-9);
        let female = basal_metabolic_rate(&metrics("female", "sedentary"), today());
        assert!((female - 1614.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_goal_applies_activity_and_goal() {
        let m = metrics("male", "moderate");
        // 1780 * 1.55 = 2759
        assert_eq!(daily_calorie_goal(&m, GoalType::Maintain, today()), 2759);
        assert_eq!(daily_calorie_goal(&m, GoalType::Lose, today()), 2259);
        assert_eq!(daily_calorie_goal(&m, GoalType::Gain, today()), 3259);
    }

    #[test]
    fn test_unknown_activity_is_sedentary() {
        assert!((activity_multiplier("couch") - 1.2).abs() < f64::EPSILON);
    }
}
