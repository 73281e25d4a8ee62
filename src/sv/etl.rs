//! Session rollup pass over recent raw events.

use serde::Serialize;

use crate::{
  entity::{event, rollup},
  prelude::*,
};

/// Outcome of one rollup pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EtlSummary {
  pub scanned: usize,
  pub rollups: usize,
}

pub struct Etl<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Etl<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Scans the most recent `window` events and appends one rollup row
  /// per session seen: total event count plus the highest
  /// `payload.score` among events typed `score` (case-insensitive).
  ///
  /// The pass is append-only: overlapping windows across runs duplicate
  /// sessions, and downstream readers dedupe by `session_id`.
  pub async fn run(&self, window: u64) -> Result<EtlSummary> {
    let events = event::Entity::find()
      .order_by_desc(event::Column::Timestamp)
      .limit(window)
      .all(self.db)
      .await?;

    let mut sessions: HashMap<Uuid, (i64, Option<f64>)> = HashMap::new();
    for event in &events {
      let Some(session_id) = event.session_id else { continue };

      let entry = sessions.entry(session_id).or_insert((0, None));
      entry.0 += 1;

      if event.event_type.eq_ignore_ascii_case("score")
        && let Some(score) =
          event.payload.get("score").and_then(json::Value::as_f64)
      {
        entry.1 = Some(entry.1.map_or(score, |max| max.max(score)));
      }
    }

    let now = Utc::now().naive_utc();
    let rows: Vec<_> = sessions
      .iter()
      .map(|(&session_id, &(event_count, score_max))| rollup::ActiveModel {
        session_id: Set(session_id),
        event_count: Set(event_count),
        score_max: Set(score_max),
        created_at: Set(now),
        ..Default::default()
      })
      .collect();

    let summary = EtlSummary { scanned: events.len(), rollups: rows.len() };
    if !rows.is_empty() {
      rollup::Entity::insert_many(rows).exec_without_returning(self.db).await?;
    }

    Ok(summary)
  }
}
