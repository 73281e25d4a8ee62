use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(LeaderboardAggregates::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(LeaderboardAggregates::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(LeaderboardAggregates::SessionId).uuid().not_null())
          .col(
            ColumnDef::new(LeaderboardAggregates::EventCount)
              .big_integer()
              .not_null(),
          )
          .col(ColumnDef::new(LeaderboardAggregates::ScoreMax).double().null())
          .col(
            ColumnDef::new(LeaderboardAggregates::CreatedAt)
              .date_time()
              .not_null(),
          )
          .to_owned(),
      )
      .await?;

    // Rollups are append-only; readers dedupe by session, so an index on
    // session_id is enough.
    manager
      .create_index(
        Index::create()
          .name("ix_leaderboard_aggregates_session_id")
          .table(LeaderboardAggregates::Table)
          .col(LeaderboardAggregates::SessionId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(LeaderboardAggregates::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum LeaderboardAggregates {
  Table,
  Id,
  SessionId,
  EventCount,
  ScoreMax,
  CreatedAt,
}
