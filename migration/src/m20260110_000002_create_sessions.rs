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
          .table(Sessions::Table)
          .if_not_exists()
          .col(ColumnDef::new(Sessions::Id).uuid().not_null().primary_key())
          .col(ColumnDef::new(Sessions::UserId).uuid().not_null())
          .col(ColumnDef::new(Sessions::SessionStart).date_time().not_null())
          .col(ColumnDef::new(Sessions::SessionEnd).date_time().null())
          .col(ColumnDef::new(Sessions::DurationSeconds).integer().null())
          .col(ColumnDef::new(Sessions::FinalScore).integer().null())
          .col(ColumnDef::new(Sessions::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Sessions::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_sessions_user")
              .from(Sessions::Table, Sessions::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("ix_sessions_user_id")
          .table(Sessions::Table)
          .col(Sessions::UserId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Sessions::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Sessions {
  Table,
  Id,
  UserId,
  SessionStart,
  SessionEnd,
  DurationSeconds,
  FinalScore,
  CreatedAt,
  UpdatedAt,
}
