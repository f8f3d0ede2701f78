use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use bite_core::models::{
    ConsumptionEvent, DailyAggregate, GoalProfile, GoalType, NewConsumptionEvent, NewUser,
    UserProfile, parse_date,
};
use bite_core::history::{DEFAULT_WINDOW_DAYS, window_start};
use bite_core::{LedgerError, LedgerService, ValidationError};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    service: Arc<LedgerService>,
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    gender: String,
    birthdate: String,
    height_cm: f64,
    weight_kg: f64,
    activity_level: String,
    goal_type: Option<String>,
    daily_calorie_goal: Option<i64>,
}

#[derive(Deserialize)]
struct CreateEntryRequest {
    food_ref: String,
    name: String,
    quantity_g: f64,
    calories: f64,
    #[serde(default)]
    protein: f64,
    #[serde(default)]
    carbs: f64,
    #[serde(default)]
    fat: f64,
    /// YYYY-MM-DD, default today
    date: Option<String>,
    /// HH:MM, default now (today) or noon (other days)
    time: Option<String>,
}

#[derive(Deserialize)]
struct DateQuery {
    date: Option<String>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Deserialize)]
struct SetCaloriesRequest {
    calories: i64,
}

#[derive(Deserialize)]
struct SetGoalTypeRequest {
    goal_type: String,
}

#[derive(Deserialize)]
struct SetWeightRequest {
    weight_kg: f64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(err) => {
                tracing::error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(e) => e.into(),
            e @ LedgerError::NotFound { .. } => Self::NotFound(e.to_string()),
            LedgerError::Conflict(msg) => Self::Conflict(msg),
            e @ LedgerError::Storage(_) => Self::Internal(e.into()),
        }
    }
}

fn date_or_today(value: Option<&str>) -> Result<NaiveDate, ApiError> {
    match value {
        None => Ok(LedgerService::today()),
        Some(s) => Ok(parse_date(s)?),
    }
}

fn resolve_consumed_at(date: NaiveDate, time: Option<&str>) -> Result<NaiveDateTime, ApiError> {
    let time = match time {
        Some(t) => NaiveTime::parse_from_str(t.trim(), "%H:%M")
            .map_err(|_| ApiError::BadRequest(format!("Invalid time '{t}'. Use HH:MM")))?,
        None if date == LedgerService::today() => {
            let now = Local::now().time();
            now.with_nanosecond(0).unwrap_or(now)
        }
        None => NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
    };
    Ok(date.and_time(time))
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let birthdate = parse_date(&req.birthdate)?;
    let goal_type = match req.goal_type.as_deref() {
        Some(g) => GoalType::parse(g)?,
        None => GoalType::default(),
    };

    let user = state.service.create_user(&NewUser {
        username: req.username,
        gender: req.gender,
        birthdate,
        height_cm: req.height_cm,
        weight_kg: req.weight_kg,
        activity_level: req.activity_level,
        goal_type,
        daily_calorie_goal: req.daily_calorie_goal,
    })?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.service.get_user(id)?))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_user(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_entries(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<ConsumptionEvent>>, ApiError> {
    let date = date_or_today(query.date.as_deref())?;
    Ok(Json(state.service.get_daily_events(user_id, date)?))
}

async fn create_entry(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<ConsumptionEvent>), ApiError> {
    let date = date_or_today(req.date.as_deref())?;
    let consumed_at = resolve_consumed_at(date, req.time.as_deref())?;

    let entry = state.service.add_consumption_event(&NewConsumptionEvent {
        user_id,
        food_ref: req.food_ref,
        name: req.name,
        quantity_g: req.quantity_g,
        calories: req.calories,
        protein: req.protein,
        carbs: req.carbs,
        fat: req.fat,
        consumed_at,
    })?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_consumption_event(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_totals(
    State(state): State<AppState>,
    Path((user_id, date)): Path<(i64, String)>,
) -> Result<Json<DailyAggregate>, ApiError> {
    let date = parse_date(&date)?;
    Ok(Json(state.service.get_daily_totals(user_id, date)?))
}

async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DailyAggregate>>, ApiError> {
    let end = date_or_today(query.end.as_deref())?;
    let start = match query.start.as_deref() {
        Some(s) => parse_date(s)?,
        None => window_start(end, DEFAULT_WINDOW_DAYS)?,
    };
    Ok(Json(state.service.get_history(user_id, start, end)?))
}

async fn get_goals(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<GoalProfile>, ApiError> {
    Ok(Json(state.service.get_goals(user_id)?))
}

async fn set_calorie_goal(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<SetCaloriesRequest>,
) -> Result<Json<GoalProfile>, ApiError> {
    Ok(Json(state.service.set_calorie_goal(user_id, req.calories)?))
}

async fn set_goal_type(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<SetGoalTypeRequest>,
) -> Result<Json<GoalProfile>, ApiError> {
    let goal_type = GoalType::parse(&req.goal_type)?;
    Ok(Json(state.service.set_goal_type(user_id, goal_type)?))
}

async fn set_target_weight(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<SetWeightRequest>,
) -> Result<Json<GoalProfile>, ApiError> {
    Ok(Json(state.service.set_target_weight(user_id, req.weight_kg)?))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/{id}", get(get_user).delete(delete_user))
        .route(
            "/api/users/{id}/entries",
            get(list_entries).post(create_entry),
        )
        .route("/api/entries/{id}", delete(delete_entry))
        .route("/api/users/{id}/totals/{date}", get(get_totals))
        .route("/api/users/{id}/history", get(get_history))
        .route("/api/users/{id}/goals", get(get_goals))
        .route("/api/users/{id}/goals/calories", put(set_calorie_goal))
        .route("/api/users/{id}/goals/type", put(set_goal_type))
        .route("/api/users/{id}/goals/weight", put(set_target_weight))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(service: LedgerService, port: u16, bind: &str) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(service),
    };
    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        tracing::warn!(
            "listening on {bind} with no authentication; any device on your network can access this API"
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    tracing::info!("listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
