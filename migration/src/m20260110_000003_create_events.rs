use sea_orm_migration::prelude::*;

use super::{
  m20260110_000001_create_users::Users,
  m20260110_000002_create_sessions::Sessions,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Events::Table)
          .if_not_exists()
          .col(ColumnDef::new(Events::Id).uuid().not_null().primary_key())
          .col(ColumnDef::new(Events::UserId).uuid().not_null())
          .col(ColumnDef::new(Events::SessionId).uuid().null())
          .col(ColumnDef::new(Events::EventType).string().not_null())
          .col(ColumnDef::new(Events::EventName).string().not_null())
          .col(ColumnDef::new(Events::Payload).json().not_null())
          .col(ColumnDef::new(Events::Timestamp).date_time().not_null())
          .col(ColumnDef::new(Events::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_events_user")
              .from(Events::Table, Events::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_events_session")
              .from(Events::Table, Events::SessionId)
              .to(Sessions::Table, Sessions::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("ix_events_timestamp")
          .table(Events::Table)
          .col(Events::Timestamp)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("ix_events_session_id")
          .table(Events::Table)
          .col(Events::SessionId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Events::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Events {
  Table,
  Id,
  UserId,
  SessionId,
  EventType,
  EventName,
  Payload,
  Timestamp,
  CreatedAt,
}
