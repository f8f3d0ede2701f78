use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use super::{Database, aggregates, date_col, date_str, datetime_col, now_str, users};
use crate::error::{LedgerError, Result};
use crate::models::{ConsumptionEvent, DATETIME_FORMAT, DailyAggregate, NewConsumptionEvent};

const EVENT_COLUMNS: &str = "id, uuid, user_id, food_ref, food_name, quantity_g,
     calories, protein, carbs, fats, consumed_at, created_at, updated_at";

// Expects EVENT_COLUMNS in order
fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<ConsumptionEvent> {
    Ok(ConsumptionEvent {
        id: row.get(0)?,
        uuid: row.get(1)?,
        user_id: row.get(2)?,
        food_ref: row.get(3)?,
        name: row.get(4)?,
        quantity_g: row.get(5)?,
        calories: row.get(6)?,
        protein: row.get(7)?,
        carbs: row.get(8)?,
        fat: row.get(9)?,
        consumed_at: datetime_col(row, 10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn fetch_event(conn: &Connection, id: i64) -> Result<ConsumptionEvent> {
    conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM consumed_foods WHERE id = ?1"),
        params![id],
        event_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("food entry", id))
}

/// Sum of every surviving event for `(user_id, date)`, read straight from the log.
pub(super) fn live_totals(
    conn: &Connection,
    user_id: i64,
    date: NaiveDate,
) -> Result<DailyAggregate> {
    let (calories, protein, carbs, fat) = conn.query_row(
        "SELECT COALESCE(SUM(calories), 0),
                COALESCE(SUM(protein), 0),
                COALESCE(SUM(carbs), 0),
                COALESCE(SUM(fats), 0)
         FROM consumed_foods
         WHERE user_id = ?1 AND entry_date = ?2",
        params![user_id, date_str(date)],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;
    Ok(DailyAggregate {
        user_id,
        date,
        calories,
        protein,
        carbs,
        fat,
    })
}

impl Database {
    /// Append a consumption event and refresh that day's aggregate in the same transaction.
    pub fn add_event(&self, event: &NewConsumptionEvent) -> Result<ConsumptionEvent> {
        event.validate()?;

        let tx = self.write_tx()?;
        users::require_user(&tx, event.user_id)?;

        let now = now_str();
        let uuid = Uuid::new_v4().to_string();
        let date = event.consumed_at.date();
        tx.execute(
            "INSERT INTO consumed_foods (uuid, user_id, food_ref, food_name, quantity_g,
                calories, protein, carbs, fats, consumed_at, entry_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                uuid,
                event.user_id,
                event.food_ref.trim(),
                event.name.trim(),
                event.quantity_g,
                event.calories,
                event.protein,
                event.carbs,
                event.fat,
                event.consumed_at.format(DATETIME_FORMAT).to_string(),
                date_str(date),
                now,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();

        aggregates::recompute(&tx, event.user_id, date)?;
        let stored = fetch_event(&tx, id)?;
        tx.commit()?;

        tracing::debug!(id, user_id = event.user_id, %date, "logged food entry");
        Ok(stored)
    }

    /// Remove an event and refresh (or drop) that day's aggregate in the same transaction.
    pub fn delete_event(&self, id: i64) -> Result<()> {
        let tx = self.write_tx()?;

        let (user_id, date) = tx
            .query_row(
                "SELECT user_id, entry_date FROM consumed_foods WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, i64>(0)?, date_col(row, 1)?)),
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("food entry", id))?;

        tx.execute("DELETE FROM consumed_foods WHERE id = ?1", params![id])?;
        aggregates::recompute(&tx, user_id, date)?;
        tx.commit()?;

        tracing::debug!(id, user_id, %date, "deleted food entry");
        Ok(())
    }

    pub fn get_event(&self, id: i64) -> Result<ConsumptionEvent> {
        fetch_event(&self.conn, id)
    }

    /// Events for one user on one calendar date, newest first.
    pub fn list_events_for_day(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<ConsumptionEvent>> {
        let tx = self.read_tx()?;
        users::require_user(&tx, user_id)?;
        let entries = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM consumed_foods
                 WHERE user_id = ?1 AND entry_date = ?2
                 ORDER BY consumed_at DESC, id DESC"
            ))?;
            stmt.query_map(params![user_id, date_str(date)], event_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(entries)
    }

    /// Live totals for one day; a day without events yields a zero aggregate.
    pub fn daily_totals(&self, user_id: i64, date: NaiveDate) -> Result<DailyAggregate> {
        let tx = self.read_tx()?;
        users::require_user(&tx, user_id)?;
        let totals = live_totals(&tx, user_id, date)?;
        tx.commit()?;
        Ok(totals)
    }
}
