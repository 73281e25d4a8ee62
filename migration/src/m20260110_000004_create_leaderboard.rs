use sea_orm_migration::prelude::*;

use super::m20260110_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Leaderboard::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Leaderboard::UserId)
              .uuid()
              .not_null()
              .primary_key(),
          )
          .col(
            ColumnDef::new(Leaderboard::BestScore)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Leaderboard::GamesPlayed)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Leaderboard::TotalScore)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Leaderboard::AvgScore)
              .double()
              .not_null()
              .default(0.0),
          )
          .col(ColumnDef::new(Leaderboard::LastPlayed).date_time().not_null())
          .col(ColumnDef::new(Leaderboard::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Leaderboard::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_leaderboard_user")
              .from(Leaderboard::Table, Leaderboard::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("ix_leaderboard_best_score")
          .table(Leaderboard::Table)
          .col(Leaderboard::BestScore)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Leaderboard::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum Leaderboard {
  Table,
  UserId,
  BestScore,
  GamesPlayed,
  TotalScore,
  AvgScore,
  LastPlayed,
  CreatedAt,
  UpdatedAt,
}
