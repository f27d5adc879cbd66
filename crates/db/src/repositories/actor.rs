use async_trait::async_trait;
use sqlx::Row;

use stockflow_core::domain::actor::Actor;

use super::{ActorRepository, RepositoryError};
use crate::DbPool;

pub struct SqlActorRepository {
    pool: DbPool,
}

impl SqlActorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActorRepository for SqlActorRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Actor>, RepositoryError> {
        let row = sqlx::query("SELECT id, role, is_active FROM actor WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let role: String =
            row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let is_active: i64 =
            row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        Ok(Some(Actor { id, role, is_active: is_active != 0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::SqlActorRepository;
    use crate::repositories::ActorRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn finds_actors_and_reports_activity_flag() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        sqlx::query("INSERT INTO actor (id, role, is_active) VALUES ('u-1', 'manager', 1)")
            .execute(&pool)
            .await
            .expect("insert active");
        sqlx::query("INSERT INTO actor (id, role, is_active) VALUES ('u-2', 'supervisor', 0)")
            .execute(&pool)
            .await
            .expect("insert inactive");

        let repo = SqlActorRepository::new(pool);

        let active = repo.find_by_id("u-1").await.expect("find").expect("exists");
        assert_eq!(active.role, "manager");
        assert!(active.is_active);

        let inactive = repo.find_by_id("u-2").await.expect("find").expect("exists");
        assert!(!inactive.is_active);

        assert!(repo.find_by_id("u-404").await.expect("find").is_none());
    }
}
