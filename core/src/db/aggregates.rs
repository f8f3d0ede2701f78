use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use super::events::live_totals;
use super::{Database, date_col, date_str, now_str, users};
use crate::error::Result;
use crate::history;
use crate::models::DailyAggregate;

fn aggregate_from_row(row: &rusqlite::Row) -> rusqlite::Result<DailyAggregate> {
    Ok(DailyAggregate {
        user_id: row.get(0)?,
        date: date_col(row, 1)?,
        calories: row.get(2)?,
        protein: row.get(3)?,
        carbs: row.get(4)?,
        fat: row.get(5)?,
    })
}

/// Re-sum the surviving events for `(user_id, date)` and store the result.
///
/// Must run inside the caller's write transaction. An all-zero sum removes the
/// row instead of keeping a zero aggregate. Returns the row as stored, if any.
pub(super) fn recompute(
    conn: &Connection,
    user_id: i64,
    date: NaiveDate,
) -> Result<Option<DailyAggregate>> {
    let totals = live_totals(conn, user_id, date)?;

    if totals.is_zero() {
        let removed = conn.execute(
            "DELETE FROM daily_aggregates WHERE user_id = ?1 AND entry_date = ?2",
            params![user_id, date_str(date)],
        )?;
        tracing::debug!(user_id, %date, removed, "daily aggregate cleared");
        return Ok(None);
    }

    conn.execute(
        "INSERT INTO daily_aggregates (user_id, entry_date, total_calories, total_protein,
            total_carbs, total_fats, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id, entry_date) DO UPDATE SET
            total_calories = excluded.total_calories,
            total_protein = excluded.total_protein,
            total_carbs = excluded.total_carbs,
            total_fats = excluded.total_fats,
            updated_at = excluded.updated_at",
        params![
            user_id,
            date_str(date),
            totals.calories,
            totals.protein,
            totals.carbs,
            totals.fat,
            now_str(),
        ],
    )?;
    tracing::debug!(user_id, %date, calories = totals.calories, "daily aggregate updated");
    Ok(Some(totals))
}

fn stored_in_range(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyAggregate>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, entry_date, total_calories, total_protein, total_carbs, total_fats
         FROM daily_aggregates
         WHERE user_id = ?1 AND entry_date BETWEEN ?2 AND ?3
         ORDER BY entry_date",
    )?;
    let rows = stmt
        .query_map(
            params![user_id, date_str(start), date_str(end)],
            aggregate_from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

impl Database {
    /// The persisted aggregate row for a day, if one exists.
    pub fn get_stored_aggregate(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DailyAggregate>> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, entry_date, total_calories, total_protein, total_carbs, total_fats
                 FROM daily_aggregates
                 WHERE user_id = ?1 AND entry_date = ?2",
                params![user_id, date_str(date)],
                aggregate_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// One aggregate per calendar day in `[start, end]`, ascending.
    ///
    /// Stored rows supply past days; `today` is re-summed from the event log.
    /// The range is checked before the database is touched.
    pub fn get_history(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<DailyAggregate>> {
        history::validate_range(start, end)?;

        let tx = self.read_tx()?;
        users::require_user(&tx, user_id)?;
        let stored = stored_in_range(&tx, user_id, start, end)?;
        let live_today = if (start..=end).contains(&today) {
            Some(live_totals(&tx, user_id, today)?)
        } else {
            None
        };
        tx.commit()?;

        Ok(history::reconstruct(
            user_id, start, end, stored, today, live_today,
        ))
    }
}
