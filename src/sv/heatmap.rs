//! Heatmap pipeline - recomputes and stores binned position matrices.

use sea_orm::sea_query::OnConflict;

use crate::{
  binner::{self, Matrix},
  entity::{event, heatmap},
  prelude::*,
};

pub struct Heatmap<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Heatmap<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Stored matrix for a `(level, date)` key. `None` simply means no
  /// heatmap has been computed for that key yet.
  pub async fn fetch(
    &self,
    level: &str,
    date: NaiveDate,
  ) -> Result<Option<heatmap::Model>> {
    let record = heatmap::Entity::find_by_id((level.to_string(), date))
      .one(self.db)
      .await?;
    Ok(record)
  }

  /// Replaces the stored matrix for `(level, date)` in a single upsert;
  /// the conflict arm overwrites `matrix` and `grid_size` wholly, never
  /// merging with a prior write.
  pub async fn store(
    &self,
    level: &str,
    date: NaiveDate,
    matrix: &Matrix,
    grid_size: usize,
  ) -> Result<()> {
    let matrix = json::to_value(matrix)
      .map_err(|e| Error::Internal(format!("failed to encode matrix: {e}")))?;

    let record = heatmap::ActiveModel {
      level: Set(level.to_string()),
      date: Set(date),
      grid_size: Set(grid_size as i32),
      matrix: Set(matrix),
      updated_at: Set(Utc::now().naive_utc()),
    };

    heatmap::Entity::insert(record)
      .on_conflict(
        OnConflict::columns([heatmap::Column::Level, heatmap::Column::Date])
          .update_columns([
            heatmap::Column::GridSize,
            heatmap::Column::Matrix,
            heatmap::Column::UpdatedAt,
          ])
          .to_owned(),
      )
      .exec_without_returning(self.db)
      .await?;

    Ok(())
  }

  /// Recomputes the heatmap for a level/date from scratch over that
  /// day's full event set and replaces the stored record.
  pub async fn recompute(
    &self,
    level: &str,
    date: NaiveDate,
    grid_size: usize,
  ) -> Result<Matrix> {
    let events = self.events_for(level, date).await?;
    debug!(level, %date, events = events.len(), "binning positions");

    let matrix = binner::bin(&events, grid_size, None, None);
    self.store(level, date, &matrix, grid_size).await?;

    Ok(matrix)
  }

  /// One day's raw events, filtered to the level named in the payload.
  async fn events_for(
    &self,
    level: &str,
    date: NaiveDate,
  ) -> Result<Vec<event::Model>> {
    let start = date.and_time(NaiveTime::MIN);
    let end = start + TimeDelta::days(1);

    let events = event::Entity::find()
      .filter(event::Column::Timestamp.gte(start))
      .filter(event::Column::Timestamp.lt(end))
      .order_by_asc(event::Column::Timestamp)
      .all(self.db)
      .await?;

    Ok(
      events
        .into_iter()
        .filter(|event| {
          payload_level(&event.payload).is_some_and(|lvl| lvl == level)
        })
        .collect(),
    )
  }
}

/// Level key from an event payload; numeric levels compare by their
/// decimal form.
fn payload_level(payload: &json::Value) -> Option<String> {
  match payload.get("level")? {
    json::Value::String(s) => Some(s.clone()),
    json::Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::{ConnectionTrait, Database, DbBackend, Schema};

  use super::*;
  use crate::{
    entity::{session, user},
    sv,
  };

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);
    for stmt in [
      schema.create_table_from_entity(user::Entity),
      schema.create_table_from_entity(session::Entity),
      schema.create_table_from_entity(event::Entity),
      schema.create_table_from_entity(heatmap::Entity),
    ] {
      db.execute(db.get_database_backend().build(&stmt)).await.unwrap();
    }

    db
  }

  fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()
  }

  async fn seed_event(
    db: &DatabaseConnection,
    user_id: Uuid,
    timestamp: DateTime,
    payload: json::Value,
  ) {
    event::ActiveModel {
      id: Set(Uuid::new_v4()),
      user_id: Set(user_id),
      session_id: Set(None),
      event_type: Set(String::from("move")),
      event_name: Set(String::from("position")),
      payload: Set(payload),
      timestamp: Set(timestamp),
      created_at: Set(timestamp),
    }
    .insert(db)
    .await
    .unwrap();
  }

  #[tokio::test]
  async fn test_store_fetch_round_trip() {
    let db = setup_test_db().await;
    let sv = Heatmap::new(&db);
    let matrix = vec![vec![1, 2], vec![3, 4]];

    sv.store("level1", day(), &matrix, 2).await.unwrap();

    let record = sv.fetch("level1", day()).await.unwrap().unwrap();
    assert_eq!(record.matrix, json::json!([[1, 2], [3, 4]]));
    assert_eq!(record.grid_size, 2);
  }

  #[tokio::test]
  async fn test_store_replaces_existing_matrix() {
    let db = setup_test_db().await;
    let sv = Heatmap::new(&db);

    sv.store("level1", day(), &vec![vec![9, 9], vec![9, 9]], 2).await.unwrap();
    sv.store("level1", day(), &vec![vec![0, 1], vec![2, 3]], 2).await.unwrap();

    let record = sv.fetch("level1", day()).await.unwrap().unwrap();
    assert_eq!(record.matrix, json::json!([[0, 1], [2, 3]]));
  }

  #[tokio::test]
  async fn test_fetch_missing_is_none() {
    let db = setup_test_db().await;

    let record = Heatmap::new(&db).fetch("level1", day()).await.unwrap();

    assert!(record.is_none());
  }

  #[tokio::test]
  async fn test_recompute_bins_one_level_one_day() {
    let db = setup_test_db().await;
    let user_id = sv::User::new(&db).create("ada").await.unwrap().id;
    let noon = day().and_hms_opt(12, 0, 0).unwrap();

    for payload in [
      json::json!({ "x": 1, "y": 1, "level": "level1" }),
      json::json!({ "x": 1, "y": 1, "level": "level1" }),
      json::json!({ "x": 9, "y": 9, "level": "level1" }),
      // Different level, malformed position, wrong day: all excluded.
      json::json!({ "x": 5, "y": 5, "level": "other" }),
      json::json!({ "level": "level1" }),
    ] {
      seed_event(&db, user_id, noon, payload).await;
    }
    seed_event(
      &db,
      user_id,
      noon + TimeDelta::days(2),
      json::json!({ "x": 2, "y": 2, "level": "level1" }),
    )
    .await;

    let sv = Heatmap::new(&db);
    let matrix = sv.recompute("level1", day(), 2).await.unwrap();

    assert_eq!(matrix, vec![vec![2, 0], vec![0, 1]]);
    let record = sv.fetch("level1", day()).await.unwrap().unwrap();
    assert_eq!(record.matrix, json::json!([[2, 0], [0, 1]]));
  }

  #[tokio::test]
  async fn test_recompute_with_no_events_stores_zero_matrix() {
    let db = setup_test_db().await;
    let sv = Heatmap::new(&db);

    let matrix = sv.recompute("level1", day(), 3).await.unwrap();

    assert_eq!(matrix, vec![vec![0; 3]; 3]);
    assert!(sv.fetch("level1", day()).await.unwrap().is_some());
  }
}
