//! Goal profile storage.
//!
//! A user's goal lives in two rows: the calorie target and goal type on the
//! `users` profile, and the satellite `user_goals` row holding a copy of the
//! calorie target plus macro grams and the target weight. Callers only see a
//! single [`GoalProfile`]; every write touches both rows inside one
//! transaction, and every read re-checks that they agree.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use super::{Database, now_str, users};
use crate::energy;
use crate::error::{LedgerError, Result};
use crate::macro_split;
use crate::models::{GoalProfile, GoalType, MacroTargets, validate_body_metric};

/// What a goal read had to do to return a consistent profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalSync {
    /// Both records already agreed.
    Synced,
    /// No satellite record existed; one was created from the profile.
    Materialized,
    /// The satellite disagreed with the profile and was overwritten.
    Repaired,
}

/// The authoritative half of the goal: what the `users` row says.
pub(super) struct Primary {
    pub calories: i64,
    pub goal_type: GoalType,
    pub weight_kg: f64,
}

struct Satellite {
    calories: i64,
    macros: MacroTargets,
    target_weight_kg: Option<f64>,
}

fn primary(conn: &Connection, user_id: i64) -> Result<Primary> {
    conn.query_row(
        "SELECT daily_calorie_goal, goal_type, weight_kg FROM users WHERE id = ?1",
        params![user_id],
        |row| {
            Ok(Primary {
                calories: row.get(0)?,
                goal_type: GoalType::from_stored(&row.get::<_, String>(1)?),
                weight_kg: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("user", user_id))
}

fn load_satellite(conn: &Connection, user_id: i64) -> Result<Option<Satellite>> {
    let row = conn
        .query_row(
            "SELECT target_calories, target_protein, target_carbs, target_fats, target_weight
             FROM user_goals WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Satellite {
                    calories: row.get(0)?,
                    macros: MacroTargets {
                        protein_g: row.get(1)?,
                        carbs_g: row.get(2)?,
                        fat_g: row.get(3)?,
                    },
                    target_weight_kg: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Upsert calories and macros into the satellite row.
///
/// A new row starts with the current body weight as its target weight; an
/// existing row keeps whatever target weight it had.
pub(super) fn write_satellite(
    conn: &Connection,
    user_id: i64,
    primary: &Primary,
    macros: &MacroTargets,
) -> Result<()> {
    conn.execute(
        "INSERT INTO user_goals (user_id, target_calories, target_protein, target_carbs,
            target_fats, target_weight, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id) DO UPDATE SET
            target_calories = excluded.target_calories,
            target_protein = excluded.target_protein,
            target_carbs = excluded.target_carbs,
            target_fats = excluded.target_fats,
            updated_at = excluded.updated_at",
        params![
            user_id,
            primary.calories,
            macros.protein_g,
            macros.carbs_g,
            macros.fat_g,
            primary.weight_kg,
            now_str(),
        ],
    )?;
    Ok(())
}

/// Bring the satellite row in line with the profile and return the merged view.
///
/// Must run inside a write transaction.
fn sync_goals(conn: &Connection, user_id: i64) -> Result<(GoalProfile, GoalSync)> {
    let primary = primary(conn, user_id)?;
    let expected = macro_split::compute(primary.calories, primary.goal_type)?;

    let (state, target_weight_kg) = match load_satellite(conn, user_id)? {
        None => {
            write_satellite(conn, user_id, &primary, &expected)?;
            tracing::debug!(user_id, calories = primary.calories, "materialized goal record");
            (GoalSync::Materialized, Some(primary.weight_kg))
        }
        Some(sat)
            if sat.calories != primary.calories
                || !macro_split::matches(&sat.macros, primary.calories, primary.goal_type) =>
        {
            tracing::warn!(
                target: "bite_core::goals",
                user_id,
                profile_calories = primary.calories,
                goal_calories = sat.calories,
                goal_type = %primary.goal_type,
                "goal record diverged from profile; overwriting from profile"
            );
            write_satellite(conn, user_id, &primary, &expected)?;
            (GoalSync::Repaired, sat.target_weight_kg)
        }
        Some(sat) => (GoalSync::Synced, sat.target_weight_kg),
    };

    let profile = GoalProfile {
        user_id,
        goal_type: primary.goal_type,
        target_calories: primary.calories,
        target_protein_g: expected.protein_g,
        target_carbs_g: expected.carbs_g,
        target_fat_g: expected.fat_g,
        target_weight_kg,
    };
    Ok((profile, state))
}

/// Write a new calorie target to the profile and the satellite together.
fn apply_calorie_goal(conn: &Connection, user_id: i64, calories: i64) -> Result<GoalProfile> {
    let mut primary = primary(conn, user_id)?;
    let macros = macro_split::compute(calories, primary.goal_type)?;

    conn.execute(
        "UPDATE users SET daily_calorie_goal = ?1, updated_at = ?2 WHERE id = ?3",
        params![calories, now_str(), user_id],
    )?;
    primary.calories = calories;
    write_satellite(conn, user_id, &primary, &macros)?;

    let (profile, _) = sync_goals(conn, user_id)?;
    Ok(profile)
}

impl Database {
    pub fn get_goals(&self, user_id: i64) -> Result<GoalProfile> {
        self.load_goals(user_id).map(|(profile, _)| profile)
    }

    /// Read the goal profile, materializing or repairing the satellite record first.
    pub fn load_goals(&self, user_id: i64) -> Result<(GoalProfile, GoalSync)> {
        let tx = self.write_tx()?;
        let loaded = sync_goals(&tx, user_id)?;
        tx.commit()?;
        Ok(loaded)
    }

    /// Set the calorie target; macros are recomputed for the current goal type.
    pub fn set_calorie_goal(&self, user_id: i64, calories: i64) -> Result<GoalProfile> {
        if calories < 0 {
            return Err(crate::error::ValidationError::NegativeCalories.into());
        }
        let tx = self.write_tx()?;
        let profile = apply_calorie_goal(&tx, user_id, calories)?;
        tx.commit()?;

        tracing::debug!(user_id, calories, "calorie goal updated");
        Ok(profile)
    }

    /// Change the goal type; the calorie target stays, macros follow the new split.
    pub fn set_goal_type(&self, user_id: i64, goal_type: GoalType) -> Result<GoalProfile> {
        let tx = self.write_tx()?;
        let mut primary = primary(&tx, user_id)?;
        let macros = macro_split::compute(primary.calories, goal_type)?;

        tx.execute(
            "UPDATE users SET goal_type = ?1, updated_at = ?2 WHERE id = ?3",
            params![goal_type.as_str(), now_str(), user_id],
        )?;
        primary.goal_type = goal_type;
        write_satellite(&tx, user_id, &primary, &macros)?;
        let (profile, _) = sync_goals(&tx, user_id)?;
        tx.commit()?;

        tracing::debug!(user_id, %goal_type, "goal type updated");
        Ok(profile)
    }

    pub fn set_target_weight(&self, user_id: i64, weight_kg: f64) -> Result<GoalProfile> {
        validate_body_metric("target_weight_kg", weight_kg)?;

        let tx = self.write_tx()?;
        sync_goals(&tx, user_id)?;
        tx.execute(
            "UPDATE user_goals SET target_weight = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![weight_kg, now_str(), user_id],
        )?;
        let (profile, _) = sync_goals(&tx, user_id)?;
        tx.commit()?;

        tracing::debug!(user_id, weight_kg, "target weight updated");
        Ok(profile)
    }

    /// Re-estimate the calorie target from the stored body metrics.
    pub fn recalculate_calorie_goal(&self, user_id: i64, today: NaiveDate) -> Result<GoalProfile> {
        let tx = self.write_tx()?;
        let user = users::fetch_user(&tx, user_id)?;
        let calories = energy::daily_calorie_goal(&user.metrics(), user.goal_type, today);
        let profile = apply_calorie_goal(&tx, user_id, calories)?;
        tx.commit()?;

        tracing::debug!(user_id, calories, "calorie goal recalculated");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{day, new_user, seeded};
    use super::*;
    use crate::error::ValidationError;

    fn profile_calories(db: &Database, user: i64) -> i64 {
        db.conn
            .query_row(
                "SELECT daily_calorie_goal FROM users WHERE id = ?1",
                params![user],
                |row| row.get(0),
            )
            .unwrap()
    }

    fn assert_duplicated(db: &Database, user: i64) {
        let primary = primary(&db.conn, user).unwrap();
        let sat = load_satellite(&db.conn, user).unwrap().expect("no goal record");
        assert_eq!(sat.calories, primary.calories);
        assert_eq!(
            sat.macros,
            macro_split::compute(primary.calories, primary.goal_type).unwrap()
        );
    }

    #[test]
    fn test_get_goals_after_create() {
        let (db, user) = seeded();
        let (goals, state) = db.load_goals(user).unwrap();
        assert_eq!(state, GoalSync::Synced);
        assert_eq!(goals.target_calories, 2000);
        assert_eq!(goals.goal_type, GoalType::Maintain);
        assert!((goals.target_protein_g - 125.0).abs() < 1e-9);
        assert!((goals.target_fat_g - 55.56).abs() < 1e-9);
        assert!((goals.target_carbs_g - 250.0).abs() < 1e-9);
        assert_eq!(goals.target_weight_kg, Some(64.0));
    }

    #[test]
    fn test_set_calorie_goal_keeps_records_in_step() {
        let (db, user) = seeded();
        let goals = db.set_calorie_goal(user, 2400).unwrap();
        assert_eq!(goals.target_calories, 2400);
        assert_eq!(profile_calories(&db, user), 2400);
        assert_duplicated(&db, user);
        assert_eq!(db.load_goals(user).unwrap().1, GoalSync::Synced);
    }

    #[test]
    fn test_set_goal_type_keeps_calories() {
        let (db, user) = seeded();
        let goals = db.set_goal_type(user, GoalType::Lose).unwrap();
        assert_eq!(goals.goal_type, GoalType::Lose);
        assert_eq!(goals.target_calories, 2000);
        assert!((goals.target_protein_g - 175.0).abs() < 1e-9);
        assert!((goals.target_fat_g - 77.78).abs() < 1e-9);
        assert!((goals.target_carbs_g - 150.0).abs() < 1e-9);
        assert_duplicated(&db, user);
    }

    #[test]
    fn test_duplication_invariant_over_mixed_updates() {
        let (db, user) = seeded();
        db.set_goal_type(user, GoalType::Gain).unwrap();
        assert_duplicated(&db, user);
        db.set_calorie_goal(user, 3100).unwrap();
        assert_duplicated(&db, user);
        db.set_goal_type(user, GoalType::Lose).unwrap();
        assert_duplicated(&db, user);
        db.set_calorie_goal(user, 0).unwrap();
        assert_duplicated(&db, user);
    }

    #[test]
    fn test_missing_goal_record_is_materialized() {
        let (db, user) = seeded();
        db.set_goal_type(user, GoalType::Gain).unwrap();
        db.conn
            .execute("DELETE FROM user_goals WHERE user_id = ?1", params![user])
            .unwrap();

        let (goals, state) = db.load_goals(user).unwrap();
        assert_eq!(state, GoalSync::Materialized);
        assert_eq!(
            goals.macros(),
            macro_split::compute(2000, GoalType::Gain).unwrap()
        );
        assert_duplicated(&db, user);
        assert_eq!(db.load_goals(user).unwrap().1, GoalSync::Synced);
    }

    #[test]
    fn test_diverged_calories_repaired_from_profile() {
        let (db, user) = seeded();
        db.conn
            .execute(
                "UPDATE user_goals SET target_calories = 1500 WHERE user_id = ?1",
                params![user],
            )
            .unwrap();

        let (goals, state) = db.load_goals(user).unwrap();
        assert_eq!(state, GoalSync::Repaired);
        assert_eq!(goals.target_calories, 2000);
        assert_duplicated(&db, user);
    }

    #[test]
    fn test_macro_drift_repaired() {
        let (db, user) = seeded();
        db.conn
            .execute(
                "UPDATE user_goals SET target_protein = 10.0 WHERE user_id = ?1",
                params![user],
            )
            .unwrap();

        let (goals, state) = db.load_goals(user).unwrap();
        assert_eq!(state, GoalSync::Repaired);
        assert!((goals.target_protein_g - 125.0).abs() < 1e-9);
        assert_duplicated(&db, user);
    }

    #[test]
    fn test_repair_keeps_target_weight() {
        let (db, user) = seeded();
        db.set_target_weight(user, 58.5).unwrap();
        db.conn
            .execute(
                "UPDATE user_goals SET target_calories = 1 WHERE user_id = ?1",
                params![user],
            )
            .unwrap();
        let goals = db.get_goals(user).unwrap();
        assert_eq!(goals.target_weight_kg, Some(58.5));
    }

    #[test]
    fn test_set_calorie_goal_rolls_back_on_storage_failure() {
        let (db, user) = seeded();
        db.conn.execute_batch("DROP TABLE user_goals").unwrap();

        let err = db.set_calorie_goal(user, 2600).unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
        assert_eq!(profile_calories(&db, user), 2000);
    }

    #[test]
    fn test_set_goal_type_rolls_back_on_storage_failure() {
        let (db, user) = seeded();
        db.conn.execute_batch("DROP TABLE user_goals").unwrap();

        assert!(db.set_goal_type(user, GoalType::Gain).is_err());
        let goal_type: String = db
            .conn
            .query_row("SELECT goal_type FROM users WHERE id = ?1", params![user], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(goal_type, "maintain");
    }

    #[test]
    fn test_negative_calories_rejected() {
        let (db, user) = seeded();
        let err = db.set_calorie_goal(user, -100).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::NegativeCalories)
        ));
        assert_eq!(profile_calories(&db, user), 2000);
    }

    #[test]
    fn test_unknown_user() {
        let (db, _) = seeded();
        assert!(db.get_goals(404).unwrap_err().is_not_found());
        assert!(db.set_calorie_goal(404, 2000).unwrap_err().is_not_found());
        assert!(db.set_goal_type(404, GoalType::Lose).unwrap_err().is_not_found());
    }

    #[test]
    fn test_unrecognized_stored_goal_type_reads_as_maintain() {
        let (db, user) = seeded();
        db.set_goal_type(user, GoalType::Lose).unwrap();
        db.conn
            .execute("UPDATE users SET goal_type = 'recomp' WHERE id = ?1", params![user])
            .unwrap();

        let (goals, state) = db.load_goals(user).unwrap();
        assert_eq!(goals.goal_type, GoalType::Maintain);
        assert_eq!(state, GoalSync::Repaired);
        assert!((goals.target_protein_g - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_target_weight() {
        let (db, user) = seeded();
        let goals = db.set_target_weight(user, 60.0).unwrap();
        assert_eq!(goals.target_weight_kg, Some(60.0));
        assert!(db.set_target_weight(user, 0.0).unwrap_err().is_validation());
    }

    #[test]
    fn test_recalculate_calorie_goal() {
        let db = Database::open_in_memory().unwrap();
        let mut user = new_user("cy", GoalType::Lose, 0);
        user.daily_calorie_goal = None;
        let user = db.create_user(&user, day(2024, 6, 15)).unwrap();
        db.set_calorie_goal(user.id, 1200).unwrap();

        // female, 32, 168 cm, 64 kg: 640 + 1050 - 160 - 161 = 1369, * 1.55 - 500
        let goals = db.recalculate_calorie_goal(user.id, day(2024, 6, 15)).unwrap();
        assert_eq!(goals.target_calories, 1621);
        assert_eq!(profile_calories(&db, user.id), 1621);
        assert_duplicated(&db, user.id);
    }
}
