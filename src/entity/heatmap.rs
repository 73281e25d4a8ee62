//! Heatmap entity - binned position counts keyed by (level, date)

use json::Value;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "heatmaps")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub level: String,
  #[sea_orm(primary_key, auto_increment = false)]
  pub date: Date,
  pub grid_size: i32,
  /// `grid_size x grid_size` count matrix, rows indexing the Y axis.
  pub matrix: Value,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
