//! Periodic batch jobs: the ETL rollup pass and the heatmap pipeline.
//!
//! Each job runs on its own fixed interval with at most one execution in
//! flight. A tick or manual trigger that lands while the previous run of
//! the same job is still going is skipped, not queued. Failures surface
//! as structured reports; the scheduler itself never crashes on them.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::{prelude::*, state::AppState};

/// One-slot run guard shared by the interval loop and manual triggers.
#[derive(Debug, Default)]
pub struct JobGuard(AtomicBool);

impl JobGuard {
  /// Claims the job's single run slot; `None` means a run is in flight.
  pub fn try_acquire(&self) -> Option<JobSlot<'_>> {
    self
      .0
      .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
      .ok()
      .map(|_| JobSlot(&self.0))
  }
}

/// Held for the duration of a run; releases the slot on drop.
pub struct JobSlot<'a>(&'a AtomicBool);

impl Drop for JobSlot<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

#[derive(Debug, Serialize)]
pub struct JobReport {
  pub status: &'static str,
  pub job: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub results: Vec<LevelOutcome>,
}

impl JobReport {
  fn ok(job: &'static str) -> Self {
    Self { status: "ok", job, error: None, results: Vec::new() }
  }

  fn skipped(job: &'static str) -> Self {
    Self { status: "skipped", job, error: None, results: Vec::new() }
  }

  fn error(job: &'static str, error: impl ToString) -> Self {
    Self {
      status: "error",
      job,
      error: Some(error.to_string()),
      results: Vec::new(),
    }
  }
}

/// Per-level outcome of a heatmap run. A failed level carries its error
/// here instead of aborting the remaining levels.
#[derive(Debug, Serialize)]
pub struct LevelOutcome {
  pub level: String,
  pub date: NaiveDate,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sum: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

pub async fn run_etl_job(app: &AppState) -> JobReport {
  let Some(_slot) = app.jobs.etl.try_acquire() else {
    debug!("etl run still in flight, skipping tick");
    return JobReport::skipped("etl");
  };

  match app.sv().etl.run(app.config.etl_window).await {
    Ok(summary) => {
      info!(
        scanned = summary.scanned,
        rollups = summary.rollups,
        "etl pass complete"
      );
      JobReport::ok("etl")
    }
    Err(err) => {
      error!("etl pass failed: {err}");
      JobReport::error("etl", err)
    }
  }
}

pub async fn run_heatmap_job(
  app: &AppState,
  levels: Option<Vec<String>>,
  date: Option<NaiveDate>,
) -> JobReport {
  let Some(_slot) = app.jobs.heatmap.try_acquire() else {
    debug!("heatmap run still in flight, skipping tick");
    return JobReport::skipped("heatmap");
  };

  let levels = levels.unwrap_or_else(|| app.config.levels.clone());
  let date = date.unwrap_or_else(|| Utc::now().date_naive());
  let grid_size = app.config.grid_size;

  let sv = app.sv();
  let mut report = JobReport::ok("heatmap");
  for level in levels {
    match sv.heatmap.recompute(&level, date, grid_size).await {
      Ok(matrix) => {
        let sum = matrix.iter().flatten().sum::<u64>();
        info!(level = %level, date = %date, sum, "heatmap stored");
        report.results.push(LevelOutcome {
          level,
          date,
          sum: Some(sum),
          error: None,
        });
      }
      Err(err) => {
        warn!(level = %level, date = %date, "heatmap recompute failed: {err}");
        report.results.push(LevelOutcome {
          level,
          date,
          sum: None,
          error: Some(err.to_string()),
        });
      }
    }
  }

  report
}

/// Spawns the two interval loops. A tick that fires while the same job
/// is running coalesces into a skip rather than queueing behind it.
pub fn spawn(app: Arc<AppState>) {
  let etl_app = app.clone();
  tokio::spawn(async move {
    let mut interval = tokio::time::interval(etl_app.config.etl_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
      interval.tick().await;
      run_etl_job(&etl_app).await;
    }
  });

  tokio::spawn(async move {
    let mut interval = tokio::time::interval(app.config.heatmap_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
      interval.tick().await;
      run_heatmap_job(&app, None, None).await;
    }
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{entity::event, state::Config, sv};

  async fn test_state() -> AppState {
    AppState::with_config("sqlite::memory:", Config::default()).await
  }

  #[tokio::test]
  async fn test_guard_allows_single_holder() {
    let guard = JobGuard::default();

    let slot = guard.try_acquire().unwrap();
    assert!(guard.try_acquire().is_none());

    drop(slot);
    assert!(guard.try_acquire().is_some());
  }

  #[tokio::test]
  async fn test_busy_job_is_skipped_not_queued() {
    let app = test_state().await;

    let _slot = app.jobs.heatmap.try_acquire().unwrap();
    let report = run_heatmap_job(&app, None, None).await;

    assert_eq!(report.status, "skipped");
    assert!(report.results.is_empty());
  }

  #[tokio::test]
  async fn test_slot_is_released_after_run() {
    let app = test_state().await;

    let report = run_heatmap_job(&app, None, None).await;
    assert_eq!(report.status, "ok");

    assert!(app.jobs.heatmap.try_acquire().is_some());
  }

  #[tokio::test]
  async fn test_heatmap_job_reports_every_level() {
    let config = Config {
      levels: vec![String::from("1"), String::from("2")],
      ..Config::default()
    };
    let app = AppState::with_config("sqlite::memory:", config).await;

    let report = run_heatmap_job(&app, None, None).await;

    assert_eq!(report.status, "ok");
    assert_eq!(report.results.len(), 2);
    assert!(report.results.iter().all(|outcome| outcome.sum == Some(0)));
  }

  #[tokio::test]
  async fn test_heatmap_job_bins_seeded_events() {
    let app = test_state().await;
    let user_id = sv::User::new(&app.db).create("ada").await.unwrap().id;
    let now = Utc::now().naive_utc();

    for _ in 0..3 {
      event::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        session_id: Set(None),
        event_type: Set(String::from("move")),
        event_name: Set(String::from("position")),
        payload: Set(json::json!({ "x": 1.0, "y": 2.0, "level": "1" })),
        timestamp: Set(now),
        created_at: Set(now),
      }
      .insert(&app.db)
      .await
      .unwrap();
    }

    let report = run_heatmap_job(&app, None, Some(now.date())).await;

    assert_eq!(report.status, "ok");
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].sum, Some(3));
  }

  #[tokio::test]
  async fn test_etl_job_ok_on_empty_database() {
    let app = test_state().await;

    let report = run_etl_job(&app).await;

    assert_eq!(report.status, "ok");
    assert!(app.jobs.etl.try_acquire().is_some());
  }
}
