use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::energy::BodyMetrics;
use crate::error::ValidationError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One recorded instance of a user eating an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub user_id: i64,
    /// External food reference (e.g. a USDA `FoodData Central` id)
    pub food_ref: String,
    pub name: String,
    pub quantity_g: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub consumed_at: NaiveDateTime,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl ConsumptionEvent {
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.consumed_at.date()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewConsumptionEvent {
    pub user_id: i64,
    pub food_ref: String,
    pub name: String,
    pub quantity_g: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub consumed_at: NaiveDateTime,
}

impl NewConsumptionEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        if self.food_ref.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "food_ref" });
        }
        // NaN must fail too, so test the accepting condition
        if !(self.quantity_g.is_finite() && self.quantity_g > 0.0) {
            return Err(ValidationError::NonPositiveQuantity);
        }
        for (field, value) in [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ValidationError::NegativeNutrient { field });
            }
        }
        Ok(())
    }
}

/// Derived total nutrition for one user on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub user_id: i64,
    pub date: NaiveDate,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl DailyAggregate {
    #[must_use]
    pub fn zero(user_id: i64, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
        }
    }

    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_zero(&self) -> bool {
        self.calories == 0.0 && self.protein == 0.0 && self.carbs == 0.0 && self.fat == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Lose,
    #[default]
    Maintain,
    Gain,
}

impl GoalType {
    pub const ALL: [GoalType; 3] = [GoalType::Lose, GoalType::Maintain, GoalType::Gain];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GoalType::Lose => "lose",
            GoalType::Maintain => "maintain",
            GoalType::Gain => "gain",
        }
    }

    /// Lenient mapping used for stored values: anything unrecognized is `maintain`.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }

    /// Strict parse used for caller input.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_lowercase().as_str() {
            "lose" => Ok(GoalType::Lose),
            "maintain" => Ok(GoalType::Maintain),
            "gain" => Ok(GoalType::Gain),
            _ => Err(ValidationError::InvalidGoalType(value.to_string())),
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Macronutrient targets in grams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// A user's target calorie and macronutrient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProfile {
    pub user_id: i64,
    pub goal_type: GoalType,
    pub target_calories: i64,
    pub target_protein_g: f64,
    pub target_carbs_g: f64,
    pub target_fat_g: f64,
    pub target_weight_kg: Option<f64>,
}

impl GoalProfile {
    #[must_use]
    pub fn macros(&self) -> MacroTargets {
        MacroTargets {
            protein_g: self.target_protein_g,
            carbs_g: self.target_carbs_g,
            fat_g: self.target_fat_g,
        }
    }
}

pub const ACTIVITY_LEVELS: &[&str] = &["sedentary", "light", "moderate", "active", "very_active"];

pub fn validate_activity_level(level: &str) -> Result<String, ValidationError> {
    let lower = level.trim().to_lowercase();
    if ACTIVITY_LEVELS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        Err(ValidationError::InvalidActivityLevel(level.to_string()))
    }
}

/// Primary profile record of a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub gender: String,
    pub birthdate: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: String,
    pub goal_type: GoalType,
    pub daily_calorie_goal: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl UserProfile {
    #[must_use]
    pub fn metrics(&self) -> BodyMetrics<'_> {
        BodyMetrics {
            gender: &self.gender,
            birthdate: self.birthdate,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            activity_level: &self.activity_level,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub gender: String,
    pub birthdate: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: String,
    pub goal_type: GoalType,
    /// Overrides the estimated daily calorie goal when present
    #[serde(default)]
    pub daily_calorie_goal: Option<i64>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "username" });
        }
        validate_body_metric("height_cm", self.height_cm)?;
        validate_body_metric("weight_kg", self.weight_kg)?;
        validate_activity_level(&self.activity_level)?;
        if self.daily_calorie_goal.is_some_and(|c| c < 0) {
            return Err(ValidationError::NegativeCalories);
        }
        Ok(())
    }
}

pub fn validate_body_metric(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::InvalidBodyMetric { field })
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}
