//! Session rollup rows appended by the ETL pass

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leaderboard_aggregates")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub session_id: Uuid,
  pub event_count: i64,
  /// Highest `payload.score` among the session's score-typed events;
  /// NULL when the session had none.
  pub score_max: Option<f64>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
