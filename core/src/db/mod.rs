mod aggregates;
mod events;
mod goals;
mod users;

use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::Result;
use crate::models::{DATE_FORMAT, DATETIME_FORMAT};

pub use goals::GoalSync;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        let db = Database { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "opened ledger database");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    gender TEXT NOT NULL,
                    birthdate TEXT NOT NULL,
                    height_cm REAL NOT NULL,
                    weight_kg REAL NOT NULL,
                    activity_level TEXT NOT NULL,
                    goal_type TEXT NOT NULL DEFAULT 'maintain',
                    daily_calorie_goal INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_goals (
                    user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                    target_calories INTEGER NOT NULL,
                    target_protein REAL NOT NULL,
                    target_carbs REAL NOT NULL,
                    target_fats REAL NOT NULL,
                    target_weight REAL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS consumed_foods (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    food_ref TEXT NOT NULL,
                    food_name TEXT NOT NULL,
                    quantity_g REAL NOT NULL,
                    calories REAL NOT NULL,
                    protein REAL NOT NULL,
                    carbs REAL NOT NULL,
                    fats REAL NOT NULL,
                    consumed_at TEXT NOT NULL,
                    entry_date TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS daily_aggregates (
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    entry_date TEXT NOT NULL,
                    total_calories REAL NOT NULL,
                    total_protein REAL NOT NULL,
                    total_carbs REAL NOT NULL,
                    total_fats REAL NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, entry_date)
                );

                CREATE INDEX IF NOT EXISTS idx_consumed_foods_user_date
                    ON consumed_foods(user_id, entry_date);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Begin a write transaction that holds the database write lock from the start.
    ///
    /// Every read-modify-write in the ledger goes through here, so two writers
    /// can never both observe the same pre-update aggregate or goal row.
    /// Dropping the returned transaction without committing rolls it back.
    fn write_tx(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    /// Read transaction for multi-statement reads that need one snapshot.
    fn read_tx(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }
}

// --- Column helpers ---

fn date_str(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn date_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn datetime_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn now_str() -> String {
    chrono::Local::now().to_rfc3339()
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use super::Database;
    use crate::models::{GoalType, NewConsumptionEvent, NewUser};

    pub(crate) fn new_user(username: &str, goal_type: GoalType, calories: i64) -> NewUser {
        NewUser {
            username: username.to_string(),
            gender: "female".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1992, 3, 4).unwrap(),
            height_cm: 168.0,
            weight_kg: 64.0,
            activity_level: "moderate".to_string(),
            goal_type,
            daily_calorie_goal: Some(calories),
        }
    }

    /// In-memory database with one `maintain` user at 2000 kcal.
    pub(crate) fn seeded() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .create_user(
                &new_user("ada", GoalType::Maintain, 2000),
                day(2024, 6, 15),
            )
            .unwrap();
        (db, user.id)
    }

    pub(crate) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn event(
        user_id: i64,
        date: NaiveDate,
        hour: u32,
        calories: f64,
        protein: f64,
        carbs: f64,
        fat: f64,
    ) -> NewConsumptionEvent {
        NewConsumptionEvent {
            user_id,
            food_ref: "170567".to_string(),
            name: "Oatmeal".to_string(),
            quantity_g: 100.0,
            calories,
            protein,
            carbs,
            fat,
            consumed_at: date.and_hms_opt(hour, 0, 0).unwrap(),
        }
    }
}
