use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;

use crate::db::{Database, GoalSync};
use crate::error::Result;
use crate::models::{
    ConsumptionEvent, DailyAggregate, GoalProfile, GoalType, NewConsumptionEvent, NewUser,
    UserProfile,
};

/// Thread-safe entry point for callers (CLI, HTTP handlers, tests).
///
/// Every operation takes the user explicitly; nothing is read from ambient
/// request state. Operations that depend on the current date take "today"
/// from the local clock once per call.
pub struct LedgerService {
    db: Mutex<Database>,
}

impl LedgerService {
    pub fn new(db_path: &Path) -> Result<Self> {
        Ok(Self::from_database(Database::open(db_path)?))
    }

    pub fn open_with_timeout(db_path: &Path, busy_timeout: Duration) -> Result<Self> {
        Ok(Self::from_database(Database::open_with_timeout(db_path, busy_timeout)?))
    }

    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    // --- Users ---

    pub fn create_user(&self, user: &NewUser) -> Result<UserProfile> {
        self.db().create_user(user, Self::today())
    }

    pub fn get_user(&self, user_id: i64) -> Result<UserProfile> {
        self.db().get_user(user_id)
    }

    pub fn update_body_metrics(
        &self,
        user_id: i64,
        weight_kg: Option<f64>,
        height_cm: Option<f64>,
        activity_level: Option<&str>,
    ) -> Result<UserProfile> {
        self.db().update_body_metrics(user_id, weight_kg, height_cm, activity_level)
    }

    pub fn delete_user(&self, user_id: i64) -> Result<()> {
        self.db().delete_user(user_id)
    }

    // --- Event log ---

    pub fn add_consumption_event(&self, event: &NewConsumptionEvent) -> Result<ConsumptionEvent> {
        self.db().add_event(event)
    }

    pub fn delete_consumption_event(&self, event_id: i64) -> Result<()> {
        self.db().delete_event(event_id)
    }

    pub fn get_consumption_event(&self, event_id: i64) -> Result<ConsumptionEvent> {
        self.db().get_event(event_id)
    }

    pub fn get_daily_events(&self, user_id: i64, date: NaiveDate) -> Result<Vec<ConsumptionEvent>> {
        self.db().list_events_for_day(user_id, date)
    }

    pub fn get_daily_totals(&self, user_id: i64, date: NaiveDate) -> Result<DailyAggregate> {
        self.db().daily_totals(user_id, date)
    }

    pub fn get_stored_aggregate(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DailyAggregate>> {
        self.db().get_stored_aggregate(user_id, date)
    }

    // --- History ---

    pub fn get_history(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyAggregate>> {
        self.get_history_as_of(user_id, start, end, Self::today())
    }

    /// History with an explicit "today" for the live-sum override.
    pub fn get_history_as_of(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<DailyAggregate>> {
        self.db().get_history(user_id, start, end, today)
    }

    // --- Goals ---

    pub fn get_goals(&self, user_id: i64) -> Result<GoalProfile> {
        self.db().get_goals(user_id)
    }

    pub fn load_goals(&self, user_id: i64) -> Result<(GoalProfile, GoalSync)> {
        self.db().load_goals(user_id)
    }

    pub fn set_calorie_goal(&self, user_id: i64, calories: i64) -> Result<GoalProfile> {
        self.db().set_calorie_goal(user_id, calories)
    }

    pub fn set_goal_type(&self, user_id: i64, goal_type: GoalType) -> Result<GoalProfile> {
        self.db().set_goal_type(user_id, goal_type)
    }

    pub fn set_target_weight(&self, user_id: i64, weight_kg: f64) -> Result<GoalProfile> {
        self.db().set_target_weight(user_id, weight_kg)
    }

    pub fn recalculate_calorie_goal(&self, user_id: i64) -> Result<GoalProfile> {
        self.db().recalculate_calorie_goal(user_id, Self::today())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::error::{LedgerError, ValidationError};
    use crate::history::{DEFAULT_WINDOW_DAYS, window_start};

    fn sample_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            gender: "male".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1988, 11, 2).unwrap(),
            height_cm: 182.0,
            weight_kg: 84.0,
            activity_level: "light".to_string(),
            goal_type: GoalType::Lose,
            daily_calorie_goal: Some(2000),
        }
    }

    fn meal(user_id: i64, date: NaiveDate, calories: f64) -> NewConsumptionEvent {
        NewConsumptionEvent {
            user_id,
            food_ref: "173944".to_string(),
            name: "Banana".to_string(),
            quantity_g: 118.0,
            calories,
            protein: 1.3,
            carbs: 27.0,
            fat: 0.4,
            consumed_at: date.and_hms_opt(10, 15, 0).unwrap(),
        }
    }

    #[test]
    fn test_log_and_read_back() {
        let svc = LedgerService::new_in_memory().unwrap();
        let user = svc.create_user(&sample_user("sam")).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        let stored = svc.add_consumption_event(&meal(user.id, date, 105.0)).unwrap();
        assert_eq!(svc.get_daily_events(user.id, date).unwrap().len(), 1);
        assert!((svc.get_daily_totals(user.id, date).unwrap().calories - 105.0).abs() < 1e-9);

        svc.delete_consumption_event(stored.id).unwrap();
        assert!(svc.get_daily_totals(user.id, date).unwrap().is_zero());
        assert!(svc.get_stored_aggregate(user.id, date).unwrap().is_none());
        assert!(svc.delete_consumption_event(stored.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_history_includes_event_logged_today() {
        let svc = LedgerService::new_in_memory().unwrap();
        let user = svc.create_user(&sample_user("sam")).unwrap();
        let today = LedgerService::today();
        let start = window_start(today, DEFAULT_WINDOW_DAYS).unwrap();

        svc.add_consumption_event(&meal(user.id, today, 210.0)).unwrap();
        let history = svc.get_history_as_of(user.id, start, today, today).unwrap();
        assert_eq!(history.len(), 7);
        assert_eq!(history.last().unwrap().date, today);
        assert!((history.last().unwrap().calories - 210.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_rejects_bad_ranges() {
        let svc = LedgerService::new_in_memory().unwrap();
        let user = svc.create_user(&sample_user("sam")).unwrap();
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();

        assert!(matches!(
            svc.get_history(user.id, d(1, 10), d(1, 1)),
            Err(LedgerError::Validation(ValidationError::InvalidRange { .. }))
        ));
        assert!(matches!(
            svc.get_history(user.id, d(1, 1), d(2, 15)),
            Err(LedgerError::Validation(ValidationError::RangeTooLarge { .. }))
        ));
    }

    #[test]
    fn test_goal_updates_through_service() {
        let svc = LedgerService::new_in_memory().unwrap();
        let user = svc.create_user(&sample_user("sam")).unwrap();

        let goals = svc.get_goals(user.id).unwrap();
        assert!((goals.target_protein_g - 175.0).abs() < 1e-9);

        svc.set_goal_type(user.id, GoalType::Maintain).unwrap();
        let goals = svc.set_calorie_goal(user.id, 2200).unwrap();
        assert_eq!(goals.target_calories, 2200);
        assert_eq!(svc.get_user(user.id).unwrap().daily_calorie_goal, 2200);
        assert_eq!(svc.load_goals(user.id).unwrap().1, GoalSync::Synced);
    }

    #[test]
    fn test_recalculate_uses_updated_metrics() {
        let svc = LedgerService::new_in_memory().unwrap();
        let user = svc.create_user(&sample_user("sam")).unwrap();
        let before = svc.recalculate_calorie_goal(user.id).unwrap();

        svc.update_body_metrics(user.id, Some(94.0), None, None).unwrap();
        let after = svc.recalculate_calorie_goal(user.id).unwrap();
        // +10 kg adds 100 kcal of BMR, scaled by the light multiplier
        assert!(after.target_calories > before.target_calories);
        assert_eq!(
            svc.get_user(user.id).unwrap().daily_calorie_goal,
            after.target_calories
        );
    }

    #[test]
    fn test_shared_across_threads() {
        let svc = Arc::new(LedgerService::new_in_memory().unwrap());
        let user = svc.create_user(&sample_user("sam")).unwrap().id;
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = Arc::clone(&svc);
                thread::spawn(move || {
                    for _ in 0..5 {
                        svc.add_consumption_event(&meal(user, date, 10.0)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let agg = svc.get_stored_aggregate(user, date).unwrap().unwrap();
        assert!((agg.calories - 400.0).abs() < 1e-9);
        assert_eq!(svc.get_daily_events(user, date).unwrap().len(), 40);
    }
}
