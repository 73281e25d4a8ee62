//! Score aggregation - maintains the per-user running statistics row.

use sea_orm::sea_query::{Alias, Expr, ExprTrait, OnConflict};

use crate::{
  entity::{leaderboard, user},
  prelude::*,
};

pub struct Leaderboard<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Leaderboard<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Applies a completed session's score to the user's running record.
  ///
  /// A score of zero does not qualify: nothing is written and `None`
  /// comes back. Otherwise the write is a single conflict-resolving
  /// upsert, so concurrent completions for the same user serialize at
  /// the storage layer instead of racing a read-modify-write.
  pub async fn record_session_score(
    &self,
    user_id: Uuid,
    score: i32,
    played_at: DateTime,
  ) -> Result<Option<leaderboard::Model>> {
    Self::record_on(self.db, user_id, score, played_at).await
  }

  /// Transaction-friendly form of [`Self::record_session_score`].
  /// Session-end callers run it inside the transaction that closes the
  /// session, so a failed upsert rolls the session update back too.
  pub async fn record_on<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    score: i32,
    played_at: DateTime,
  ) -> Result<Option<leaderboard::Model>> {
    if score <= 0 {
      return Ok(None);
    }

    let now = Utc::now().naive_utc();
    let first = leaderboard::ActiveModel {
      user_id: Set(user_id),
      best_score: Set(score),
      games_played: Set(1),
      total_score: Set(score as i64),
      avg_score: Set(score as f64),
      last_played: Set(played_at),
      created_at: Set(now),
      updated_at: Set(now),
    };

    // The conflict arm evaluates against the committed row, so the
    // average must be computed from the post-increment totals inline.
    let games = Expr::col(leaderboard::Column::GamesPlayed).add(1);
    let total = Expr::col(leaderboard::Column::TotalScore).add(score);
    let avg = Expr::col(leaderboard::Column::TotalScore)
      .add(score)
      .cast_as(Alias::new("real"))
      .div(Expr::col(leaderboard::Column::GamesPlayed).add(1));
    let best = Expr::case(
      Expr::col(leaderboard::Column::BestScore).lt(score),
      Expr::val(score),
    )
    .finally(Expr::col(leaderboard::Column::BestScore));

    let record = leaderboard::Entity::insert(first)
      .on_conflict(
        OnConflict::column(leaderboard::Column::UserId)
          .value(leaderboard::Column::GamesPlayed, games)
          .value(leaderboard::Column::TotalScore, total)
          .value(leaderboard::Column::AvgScore, avg)
          .value(leaderboard::Column::BestScore, best)
          .value(leaderboard::Column::LastPlayed, Expr::val(played_at))
          .value(leaderboard::Column::UpdatedAt, Expr::val(now))
          .to_owned(),
      )
      .exec_with_returning(conn)
      .await?;

    Ok(Some(record))
  }

  /// Top records by best score with the owning user. Rank is assigned by
  /// position at the response layer; ties keep the storage order.
  pub async fn top(
    &self,
    limit: u64,
  ) -> Result<Vec<(leaderboard::Model, user::Model)>> {
    let rows = leaderboard::Entity::find()
      .find_also_related(user::Entity)
      .order_by_desc(leaderboard::Column::BestScore)
      .limit(limit)
      .all(self.db)
      .await?;

    Ok(
      rows
        .into_iter()
        .filter_map(|(record, user)| Some((record, user?)))
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::{ConnectionTrait, Database, DbBackend, Schema};

  use super::*;
  use crate::{entity::user, sv};

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);

    let stmt = schema.create_table_from_entity(user::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    let stmt = schema.create_table_from_entity(leaderboard::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    db
  }

  async fn seed_user(db: &DatabaseConnection, name: &str) -> Uuid {
    sv::User::new(db).create(name).await.unwrap().id
  }

  fn at(hour: u32) -> DateTime {
    NaiveDate::from_ymd_opt(2026, 3, 1)
      .unwrap()
      .and_hms_opt(hour, 0, 0)
      .unwrap()
  }

  #[tokio::test]
  async fn test_first_qualifying_session_creates_record() {
    let db = setup_test_db().await;
    let user_id = seed_user(&db, "ada").await;

    let record = Leaderboard::new(&db)
      .record_session_score(user_id, 42, at(10))
      .await
      .unwrap()
      .unwrap();

    assert_eq!(record.best_score, 42);
    assert_eq!(record.games_played, 1);
    assert_eq!(record.total_score, 42);
    assert_eq!(record.avg_score, 42.0);
    assert_eq!(record.last_played, at(10));
  }

  #[tokio::test]
  async fn test_scores_accumulate() {
    let db = setup_test_db().await;
    let user_id = seed_user(&db, "bob").await;
    let sv = Leaderboard::new(&db);

    let mut record = None;
    for (hour, score) in [(1, 50), (2, 80), (3, 10), (4, 80)] {
      record = sv.record_session_score(user_id, score, at(hour)).await.unwrap();
    }

    let record = record.unwrap();
    assert_eq!(record.games_played, 4);
    assert_eq!(record.total_score, 220);
    assert_eq!(record.best_score, 80);
    assert!((record.avg_score - 55.0).abs() < 1e-9);
    assert_eq!(record.last_played, at(4));
  }

  #[tokio::test]
  async fn test_zero_score_is_a_no_op() {
    let db = setup_test_db().await;
    let user_id = seed_user(&db, "carol").await;
    let sv = Leaderboard::new(&db);

    assert!(sv.record_session_score(user_id, 0, at(1)).await.unwrap().is_none());
    assert!(
      leaderboard::Entity::find_by_id(user_id).one(&db).await.unwrap().is_none()
    );

    sv.record_session_score(user_id, 30, at(2)).await.unwrap();
    sv.record_session_score(user_id, 0, at(3)).await.unwrap();

    let record =
      leaderboard::Entity::find_by_id(user_id).one(&db).await.unwrap().unwrap();
    assert_eq!(record.games_played, 1);
    assert_eq!(record.total_score, 30);
    assert_eq!(record.last_played, at(2));
  }

  #[tokio::test]
  async fn test_best_score_never_regresses() {
    let db = setup_test_db().await;
    let user_id = seed_user(&db, "dana").await;
    let sv = Leaderboard::new(&db);

    sv.record_session_score(user_id, 90, at(1)).await.unwrap();
    let record =
      sv.record_session_score(user_id, 15, at(2)).await.unwrap().unwrap();

    assert_eq!(record.best_score, 90);
    assert_eq!(record.games_played, 2);
    assert_eq!(record.last_played, at(2));
  }

  #[tokio::test]
  async fn test_top_ranks_by_best_score_with_ties() {
    let db = setup_test_db().await;
    let sv = Leaderboard::new(&db);

    for (name, score) in [("a", 50), ("b", 80), ("c", 80), ("d", 10)] {
      let user_id = seed_user(&db, name).await;
      sv.record_session_score(user_id, score, at(1)).await.unwrap();
    }

    let top = sv.top(2).await.unwrap();

    assert_eq!(top.len(), 2);
    assert!(top.iter().all(|(record, _)| record.best_score == 80));
  }
}
