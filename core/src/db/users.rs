use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use super::goals::{Primary, write_satellite};
use super::{Database, date_col, date_str, now_str};
use crate::energy;
use crate::error::{LedgerError, Result};
use crate::macro_split;
use crate::models::{GoalType, NewUser, UserProfile, validate_activity_level, validate_body_metric};

const USER_COLUMNS: &str = "id, username, gender, birthdate, height_cm, weight_kg,
     activity_level, goal_type, daily_calorie_goal, created_at, updated_at";

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        username: row.get(1)?,
        gender: row.get(2)?,
        birthdate: date_col(row, 3)?,
        height_cm: row.get(4)?,
        weight_kg: row.get(5)?,
        activity_level: row.get(6)?,
        goal_type: GoalType::from_stored(&row.get::<_, String>(7)?),
        daily_calorie_goal: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub(super) fn fetch_user(conn: &Connection, id: i64) -> Result<UserProfile> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("user", id))
}

pub(super) fn require_user(conn: &Connection, id: i64) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(LedgerError::not_found("user", id))
    }
}

impl Database {
    /// Create a profile and its goal record together.
    ///
    /// Without an explicit calorie goal the target is estimated from the body
    /// metrics as of `today`.
    pub fn create_user(&self, user: &NewUser, today: NaiveDate) -> Result<UserProfile> {
        user.validate()?;
        let activity_level = validate_activity_level(&user.activity_level)?;
        let username = user.username.trim();
        let gender = user.gender.trim().to_lowercase();

        let calories = user.daily_calorie_goal.unwrap_or_else(|| {
            let metrics = energy::BodyMetrics {
                gender: &gender,
                birthdate: user.birthdate,
                height_cm: user.height_cm,
                weight_kg: user.weight_kg,
                activity_level: &activity_level,
            };
            energy::daily_calorie_goal(&metrics, user.goal_type, today)
        });
        let macros = macro_split::compute(calories, user.goal_type)?;

        let tx = self.write_tx()?;
        let now = now_str();
        let inserted = tx.execute(
            "INSERT INTO users (username, gender, birthdate, height_cm, weight_kg,
                activity_level, goal_type, daily_calorie_goal, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                username,
                gender,
                date_str(user.birthdate),
                user.height_cm,
                user.weight_kg,
                activity_level,
                user.goal_type.as_str(),
                calories,
                now,
                now,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(LedgerError::Conflict(format!(
                    "username '{username}' already exists"
                )));
            }
            Err(e) => return Err(e.into()),
        }
        let id = tx.last_insert_rowid();

        let primary = Primary {
            calories,
            goal_type: user.goal_type,
            weight_kg: user.weight_kg,
        };
        write_satellite(&tx, id, &primary, &macros)?;
        let created = fetch_user(&tx, id)?;
        tx.commit()?;

        tracing::debug!(id, username, calories, "created user");
        Ok(created)
    }

    pub fn get_user(&self, id: i64) -> Result<UserProfile> {
        fetch_user(&self.conn, id)
    }

    /// Update weight, height or activity level. The calorie goal is left alone;
    /// use [`Database::recalculate_calorie_goal`] to re-estimate it.
    pub fn update_body_metrics(
        &self,
        id: i64,
        weight_kg: Option<f64>,
        height_cm: Option<f64>,
        activity_level: Option<&str>,
    ) -> Result<UserProfile> {
        if let Some(w) = weight_kg {
            validate_body_metric("weight_kg", w)?;
        }
        if let Some(h) = height_cm {
            validate_body_metric("height_cm", h)?;
        }
        let activity_level = activity_level.map(validate_activity_level).transpose()?;

        let tx = self.write_tx()?;
        let current = fetch_user(&tx, id)?;
        tx.execute(
            "UPDATE users SET weight_kg = ?1, height_cm = ?2, activity_level = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                weight_kg.unwrap_or(current.weight_kg),
                height_cm.unwrap_or(current.height_cm),
                activity_level.unwrap_or(current.activity_level),
                now_str(),
                id,
            ],
        )?;
        let updated = fetch_user(&tx, id)?;
        tx.commit()?;

        tracing::debug!(id, "updated body metrics");
        Ok(updated)
    }

    /// Remove a user with all of their events, aggregates and goals.
    pub fn delete_user(&self, id: i64) -> Result<()> {
        let tx = self.write_tx()?;
        require_user(&tx, id)?;
        let events = tx.execute("DELETE FROM consumed_foods WHERE user_id = ?1", params![id])?;
        tx.execute("DELETE FROM daily_aggregates WHERE user_id = ?1", params![id])?;
        tx.execute("DELETE FROM user_goals WHERE user_id = ?1", params![id])?;
        tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        tx.commit()?;

        tracing::debug!(id, events, "deleted user");
        Ok(())
    }
}
