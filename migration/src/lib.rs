pub use sea_orm_migration::prelude::*;

mod m20260110_000001_create_users;
mod m20260110_000002_create_sessions;
mod m20260110_000003_create_events;
mod m20260110_000004_create_leaderboard;
mod m20260110_000005_create_heatmaps;
mod m20260117_000006_create_rollups;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260110_000001_create_users::Migration),
      Box::new(m20260110_000002_create_sessions::Migration),
      Box::new(m20260110_000003_create_events::Migration),
      Box::new(m20260110_000004_create_leaderboard::Migration),
      Box::new(m20260110_000005_create_heatmaps::Migration),
      Box::new(m20260117_000006_create_rollups::Migration),
    ]
  }
}
