use axum::{
  Json,
  extract::{Query, State},
  http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{event, leaderboard, session, user},
  jobs,
  prelude::*,
  state::AppState,
  sv,
};

pub async fn health() -> Json<json::Value> {
  Json(json::json!({
    "status": "healthy",
    "service": "analytics",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

pub async fn metrics(State(app): State<Arc<AppState>>) -> String {
  app.metrics.render()
}

#[derive(Debug, Deserialize)]
pub struct CreateUserReq {
  pub username: String,
}

pub async fn create_user(
  State(app): State<Arc<AppState>>,
  Json(req): Json<CreateUserReq>,
) -> Result<(StatusCode, Json<user::Model>)> {
  let user = app.sv().user.create(&req.username).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
pub struct SessionStartReq {
  pub user_id: Uuid,
}

pub async fn start_session(
  State(app): State<Arc<AppState>>,
  Json(req): Json<SessionStartReq>,
) -> Result<(StatusCode, Json<session::Model>)> {
  let now = Utc::now().naive_utc();
  let session = session::ActiveModel {
    id: Set(Uuid::new_v4()),
    user_id: Set(req.user_id),
    session_start: Set(now),
    session_end: Set(None),
    duration_seconds: Set(None),
    final_score: Set(None),
    created_at: Set(now),
    updated_at: Set(now),
  }
  .insert(&app.db)
  .await?;

  app.metrics.inc_sessions(1);
  Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Debug, Deserialize)]
pub struct SessionEndReq {
  pub session_id: Uuid,
  #[serde(default)]
  pub end_time: Option<DateTime>,
  #[serde(default)]
  pub final_score: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
  pub id: Uuid,
  pub user_id: Uuid,
  pub session_start: DateTime,
  pub session_end: DateTime,
  pub duration_seconds: i32,
  pub final_score: Option<i32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub leaderboard: Option<leaderboard::Model>,
}

pub async fn end_session(
  State(app): State<Arc<AppState>>,
  Json(req): Json<SessionEndReq>,
) -> Result<Json<SessionSummary>> {
  let txn = app.db.begin().await?;

  let session = session::Entity::find_by_id(req.session_id)
    .one(&txn)
    .await?
    .ok_or(Error::SessionNotFound)?;

  if session.session_end.is_some() {
    return Err(Error::SessionEnded);
  }

  let end_time = req.end_time.unwrap_or_else(|| Utc::now().naive_utc());
  let duration = (end_time - session.session_start).num_seconds() as i32;
  let user_id = session.user_id;
  let session_start = session.session_start;

  let session = session::ActiveModel {
    session_end: Set(Some(end_time)),
    duration_seconds: Set(Some(duration)),
    final_score: Set(req.final_score),
    updated_at: Set(Utc::now().naive_utc()),
    ..session.into()
  }
  .update(&txn)
  .await?;

  // A qualifying score feeds the leaderboard inside the same transaction
  // as the session close, so neither write lands without the other.
  let record = match req.final_score {
    Some(score) => {
      sv::Leaderboard::record_on(&txn, user_id, score, end_time).await?
    }
    None => None,
  };

  txn.commit().await?;

  Ok(Json(SessionSummary {
    id: session.id,
    user_id,
    session_start,
    session_end: end_time,
    duration_seconds: duration,
    final_score: session.final_score,
    leaderboard: record,
  }))
}

#[derive(Debug, Deserialize)]
pub struct EventIn {
  pub user_id: Uuid,
  #[serde(default)]
  pub session_id: Option<Uuid>,
  pub event_type: String,
  pub event_name: String,
  #[serde(default)]
  pub payload: json::Value,
  #[serde(default)]
  pub timestamp: Option<DateTime>,
}

#[derive(Debug, Deserialize)]
pub struct BulkEventsReq {
  pub events: Vec<EventIn>,
}

#[derive(Debug, Serialize)]
pub struct BulkEventsRes {
  pub inserted_count: usize,
  pub inserted_event_ids: Vec<Uuid>,
}

pub async fn create_events(
  State(app): State<Arc<AppState>>,
  Json(req): Json<BulkEventsReq>,
) -> Result<(StatusCode, Json<BulkEventsRes>)> {
  let now = Utc::now().naive_utc();
  let mut ids = Vec::with_capacity(req.events.len());

  let rows: Vec<_> = req
    .events
    .into_iter()
    .map(|ev| {
      let id = Uuid::new_v4();
      ids.push(id);
      event::ActiveModel {
        id: Set(id),
        user_id: Set(ev.user_id),
        session_id: Set(ev.session_id),
        event_type: Set(ev.event_type),
        event_name: Set(ev.event_name),
        payload: Set(ev.payload),
        timestamp: Set(ev.timestamp.unwrap_or(now)),
        created_at: Set(now),
      }
    })
    .collect();

  if !rows.is_empty() {
    event::Entity::insert_many(rows).exec_without_returning(&app.db).await?;
    app.metrics.inc_events(ids.len() as u64);
  }

  Ok((
    StatusCode::CREATED,
    Json(BulkEventsRes { inserted_count: ids.len(), inserted_event_ids: ids }),
  ))
}

#[derive(Debug, Deserialize)]
pub struct ScoreSubmitReq {
  pub user_id: Uuid,
  pub score: i32,
}

#[derive(Debug, Serialize)]
pub struct ScoreSubmitRes {
  pub highest_score: i32,
  pub new_record: bool,
}

pub async fn submit_score(
  State(app): State<Arc<AppState>>,
  Json(req): Json<ScoreSubmitReq>,
) -> Result<Json<ScoreSubmitRes>> {
  let (user, new_record) =
    app.sv().user.submit_score(req.user_id, req.score).await?;

  Ok(Json(ScoreSubmitRes { highest_score: user.highest_score, new_record }))
}

fn default_limit() -> u64 {
  10
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
  #[serde(default = "default_limit")]
  pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
  pub rank: usize,
  pub user_id: Uuid,
  pub username: String,
  pub best_score: i32,
  pub games_played: i32,
  pub avg_score: f64,
  pub total_score: i64,
}

pub async fn get_leaderboard(
  State(app): State<Arc<AppState>>,
  Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
  let limit = query.limit.clamp(1, 100);
  let rows = app.sv().leaderboard.top(limit).await?;

  let entries = rows
    .into_iter()
    .enumerate()
    .map(|(idx, (record, user))| LeaderboardEntry {
      rank: idx + 1,
      user_id: record.user_id,
      username: user.username,
      best_score: record.best_score,
      games_played: record.games_played,
      avg_score: record.avg_score,
      total_score: record.total_score,
    })
    .collect();

  Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
  pub level: String,
  pub date: String,
}

#[derive(Debug, Serialize)]
pub struct HeatmapRes {
  pub level: String,
  pub date: NaiveDate,
  pub matrix: json::Value,
}

pub async fn get_heatmap(
  State(app): State<Arc<AppState>>,
  Query(query): Query<HeatmapQuery>,
) -> Result<Json<HeatmapRes>> {
  let date = query
    .date
    .parse::<NaiveDate>()
    .map_err(|_| Error::InvalidDate(query.date.clone()))?;

  let record = app
    .sv()
    .heatmap
    .fetch(&query.level, date)
    .await?
    .ok_or(Error::HeatmapNotFound)?;

  Ok(Json(HeatmapRes {
    level: record.level,
    date: record.date,
    matrix: record.matrix,
  }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RunJobsReq {
  #[serde(default)]
  pub tasks: Option<Vec<String>>,
  #[serde(default)]
  pub levels: Option<Vec<String>>,
  #[serde(default)]
  pub date: Option<String>,
}

/// Manually triggers the batch jobs. The work is dispatched to
/// background tasks and the request returns an acknowledgment right
/// away; skip-if-busy still applies through the shared job guards.
pub async fn run_jobs(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  body: Option<Json<RunJobsReq>>,
) -> Result<(StatusCode, Json<json::Value>)> {
  let expected =
    std::env::var("ADMIN_API_KEY").unwrap_or_else(|_| "dev-admin-key".into());
  let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
  if provided != Some(expected.as_str()) {
    return Err(Error::Unauthorized);
  }

  let Json(req) = body.unwrap_or_else(|| Json(RunJobsReq::default()));
  let tasks = req
    .tasks
    .unwrap_or_else(|| vec![String::from("etl"), String::from("heatmap")]);
  let date = match &req.date {
    Some(raw) => Some(
      raw
        .parse::<NaiveDate>()
        .map_err(|_| Error::InvalidDate(raw.clone()))?,
    ),
    None => None,
  };

  let mut accepted = Vec::new();
  if tasks.iter().any(|task| task == "etl") {
    accepted.push("etl");
    let app = app.clone();
    tokio::spawn(async move {
      let report = jobs::run_etl_job(&app).await;
      info!(?report, "manual etl run finished");
    });
  }
  if tasks.iter().any(|task| task == "heatmap") {
    accepted.push("heatmap");
    let app = app.clone();
    let levels = req.levels.clone();
    tokio::spawn(async move {
      let report = jobs::run_heatmap_job(&app, levels, date).await;
      info!(?report, "manual heatmap run finished");
    });
  }

  Ok((
    StatusCode::ACCEPTED,
    Json(json::json!({ "status": "accepted", "jobs": accepted })),
  ))
}
