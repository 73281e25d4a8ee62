use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  #[sea_orm(unique)]
  pub username: String,
  /// Monotonic: only ever raised, never lowered.
  pub highest_score: i32,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::session::Entity")]
  Session,
  #[sea_orm(has_many = "super::event::Entity")]
  Event,
  #[sea_orm(has_one = "super::leaderboard::Entity")]
  Leaderboard,
}

impl Related<super::session::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Session.def()
  }
}

impl Related<super::event::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Event.def()
  }
}

impl Related<super::leaderboard::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Leaderboard.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
