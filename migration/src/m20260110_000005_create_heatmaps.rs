use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Heatmaps::Table)
          .if_not_exists()
          .col(ColumnDef::new(Heatmaps::Level).string().not_null())
          .col(ColumnDef::new(Heatmaps::Date).date().not_null())
          .col(ColumnDef::new(Heatmaps::GridSize).integer().not_null())
          .col(ColumnDef::new(Heatmaps::Matrix).json().not_null())
          .col(ColumnDef::new(Heatmaps::UpdatedAt).date_time().not_null())
          .primary_key(
            Index::create().col(Heatmaps::Level).col(Heatmaps::Date),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Heatmaps::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Heatmaps {
  Table,
  Level,
  Date,
  GridSize,
  Matrix,
  UpdatedAt,
}
