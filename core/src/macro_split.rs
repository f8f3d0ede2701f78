//! Goal-type dependent macronutrient split.

use crate::error::ValidationError;
use crate::models::{GoalType, MacroTargets};

pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Percentage of target calories allocated to each macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroSplit {
    pub protein_pct: u8,
    pub fat_pct: u8,
    pub carbs_pct: u8,
}

impl MacroSplit {
    #[must_use]
    pub fn for_goal(goal: GoalType) -> Self {
        match goal {
            GoalType::Lose => Self {
                protein_pct: 35,
                fat_pct: 35,
                carbs_pct: 30,
            },
            GoalType::Maintain => Self {
                protein_pct: 25,
                fat_pct: 25,
                carbs_pct: 50,
            },
            GoalType::Gain => Self {
                protein_pct: 30,
                fat_pct: 25,
                carbs_pct: 45,
            },
        }
    }
}

/// Grams of each macro for `target_calories` under `goal`, rounded to 0.01 g.
#[allow(clippy::cast_precision_loss)]
pub fn compute(target_calories: i64, goal: GoalType) -> Result<MacroTargets, ValidationError> {
    if target_calories < 0 {
        return Err(ValidationError::NegativeCalories);
    }
    let split = MacroSplit::for_goal(goal);
    let cal = target_calories as f64;
    let grams = |pct: u8, density: f64| round2(cal * f64::from(pct) / 100.0 / density);
    Ok(MacroTargets {
        protein_g: grams(split.protein_pct, KCAL_PER_G_PROTEIN),
        carbs_g: grams(split.carbs_pct, KCAL_PER_G_CARBS),
        fat_g: grams(split.fat_pct, KCAL_PER_G_FAT),
    })
}

/// True when `macros` is exactly what [`compute`] yields for the inputs.
#[must_use]
pub fn matches(macros: &MacroTargets, target_calories: i64, goal: GoalType) -> bool {
    compute(target_calories, goal).is_ok_and(|expected| {
        (expected.protein_g - macros.protein_g).abs() < 0.005
            && (expected.carbs_g - macros.carbs_g).abs() < 0.005
            && (expected.fat_g - macros.fat_g).abs() < 0.005
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_sum_to_100() {
        for goal in GoalType::ALL {
            let s = MacroSplit::for_goal(goal);
            assert_eq!(s.protein_pct + s.fat_pct + s.carbs_pct, 100, "{goal}");
        }
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_lose_2000() {
        let m = compute(2000, GoalType::Lose).unwrap();
        assert_eq!(m.protein_g, 175.0);
        assert_eq!(m.fat_g, 77.78);
        assert_eq!(m.carbs_g, 150.0);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_maintain_2000() {
        let m = compute(2000, GoalType::Maintain).unwrap();
        assert_eq!(m.protein_g, 125.0);
        assert_eq!(m.fat_g, 55.56);
        assert_eq!(m.carbs_g, 250.0);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_gain_2500() {
        let m = compute(2500, GoalType::Gain).unwrap();
        // 2500 * 0.30 / 4, 2500 * 0.25 / 9, 2500 * 0.45 / 4
        assert_eq!(m.protein_g, 187.5);
        assert_eq!(m.fat_g, 69.44);
        assert_eq!(m.carbs_g, 281.25);
    }

    #[test]
    fn test_unrecognized_goal_behaves_as_maintain() {
        let stored = GoalType::from_stored("shred");
        assert_eq!(
            compute(1800, stored).unwrap(),
            compute(1800, GoalType::Maintain).unwrap()
        );
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_zero_calories() {
        let m = compute(0, GoalType::Gain).unwrap();
        assert_eq!(m.protein_g, 0.0);
        assert_eq!(m.carbs_g, 0.0);
        assert_eq!(m.fat_g, 0.0);
    }

    #[test]
    fn test_negative_calories_rejected() {
        assert_eq!(
            compute(-1, GoalType::Lose),
            Err(ValidationError::NegativeCalories)
        );
    }

    #[test]
    fn test_matches() {
        let m = compute(2000, GoalType::Lose).unwrap();
        assert!(matches(&m, 2000, GoalType::Lose));
        assert!(!matches(&m, 2000, GoalType::Maintain));
        assert!(!matches(&m, 2100, GoalType::Lose));
    }
}
