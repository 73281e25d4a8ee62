pub use std::{collections::HashMap, sync::Arc, time::Duration};

pub use chrono::{
  NaiveDate, NaiveDateTime as DateTime, NaiveTime, TimeDelta, Utc,
};
pub use migration::{Migrator, MigratorTrait};
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection,
  EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
pub use tracing::{debug, error, info, warn};
pub use uuid::Uuid;

pub use crate::error::{Error, Result};
