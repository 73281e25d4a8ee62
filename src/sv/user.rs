use sea_orm::sea_query::Expr;

use crate::{entity::user, prelude::*};

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, username: &str) -> Result<user::Model> {
    let now = Utc::now().naive_utc();
    let user = user::ActiveModel {
      id: Set(Uuid::new_v4()),
      username: Set(username.to_string()),
      highest_score: Set(0),
      created_at: Set(now),
      updated_at: Set(now),
    };

    Ok(user.insert(self.db).await?)
  }

  pub async fn by_id(&self, id: Uuid) -> Result<Option<user::Model>> {
    let user = user::Entity::find_by_id(id).one(self.db).await?;
    Ok(user)
  }

  /// Monotonic best-score update: the stored value only moves up, and
  /// the comparison happens inside the update statement itself.
  pub async fn submit_score(
    &self,
    id: Uuid,
    score: i32,
  ) -> Result<(user::Model, bool)> {
    let now = Utc::now().naive_utc();
    let updated = user::Entity::update_many()
      .col_expr(user::Column::HighestScore, Expr::value(score))
      .col_expr(user::Column::UpdatedAt, Expr::value(now))
      .filter(user::Column::Id.eq(id))
      .filter(user::Column::HighestScore.lt(score))
      .exec(self.db)
      .await?;

    let user = self.by_id(id).await?.ok_or(Error::UserNotFound)?;
    Ok((user, updated.rows_affected > 0))
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::{ConnectionTrait, Database, DbBackend, Schema};

  use super::*;

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);
    let stmt = schema.create_table_from_entity(user::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();

    db
  }

  #[tokio::test]
  async fn test_create_user() {
    let db = setup_test_db().await;

    let user = User::new(&db).create("ada").await.unwrap();

    assert_eq!(user.username, "ada");
    assert_eq!(user.highest_score, 0);
  }

  #[tokio::test]
  async fn test_submit_score_is_monotonic() {
    let db = setup_test_db().await;
    let sv = User::new(&db);
    let user = sv.create("bob").await.unwrap();

    let (user_after, new_record) = sv.submit_score(user.id, 70).await.unwrap();
    assert!(new_record);
    assert_eq!(user_after.highest_score, 70);

    let (user_after, new_record) = sv.submit_score(user.id, 40).await.unwrap();
    assert!(!new_record);
    assert_eq!(user_after.highest_score, 70);
  }

  #[tokio::test]
  async fn test_submit_score_unknown_user() {
    let db = setup_test_db().await;

    let result = User::new(&db).submit_score(Uuid::new_v4(), 10).await;

    assert!(matches!(result, Err(Error::UserNotFound)));
  }
}
