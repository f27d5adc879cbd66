use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;

use stockflow_core::delegation::DelegationGrant;
use stockflow_core::domain::actor::Actor;
use stockflow_core::domain::rule::{DelegationRule, DelegationScope};

use super::{DelegationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDelegationRepository {
    pool: DbPool,
}

impl SqlDelegationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_day(field: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    raw.parse::<NaiveDate>()
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

fn row_to_grant(row: &sqlx::sqlite::SqliteRow) -> Result<DelegationGrant, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let delegator_id: String =
        row.try_get("delegator_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let delegate_id: String =
        row.try_get("delegate_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let starts_on_str: String =
        row.try_get("starts_on").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let ends_on_str: String =
        row.try_get("ends_on").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let scope_str: String =
        row.try_get("scope").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: i64 =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let delegator_role: String =
        row.try_get("delegator_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let delegator_active: i64 =
        row.try_get("delegator_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let scope = DelegationScope::parse(&scope_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown delegation scope `{scope_str}`")))?;

    Ok(DelegationGrant {
        rule: DelegationRule {
            id,
            delegator_id: delegator_id.clone(),
            delegate_id,
            starts_on: parse_day("starts_on", &starts_on_str)?,
            ends_on: parse_day("ends_on", &ends_on_str)?,
            scope,
            is_active: is_active != 0,
        },
        delegator: Actor {
            id: delegator_id,
            role: delegator_role,
            is_active: delegator_active != 0,
        },
    })
}

#[async_trait]
impl DelegationRepository for SqlDelegationRepository {
    async fn active_grants_for(
        &self,
        delegate_id: &str,
        as_of_day: NaiveDate,
    ) -> Result<Vec<DelegationGrant>, RepositoryError> {
        // ISO dates compare lexicographically, so the window prefilter is a
        // plain string comparison.
        let day = as_of_day.format("%Y-%m-%d").to_string();
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT d.id, d.delegator_id, d.delegate_id, d.starts_on, d.ends_on, d.scope,
                    d.is_active, a.role AS delegator_role, a.is_active AS delegator_active
             FROM delegation_rule AS d
             JOIN actor AS a ON a.id = d.delegator_id
             WHERE d.delegate_id = ?
               AND d.is_active = 1
               AND d.starts_on <= ?
               AND d.ends_on >= ?
             ORDER BY d.id ASC",
        )
        .bind(delegate_id)
        .bind(&day)
        .bind(&day)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_grant).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::SqlDelegationRepository;
    use crate::repositories::DelegationRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        for (id, role, active) in
            [("u-mgr", "manager", 1), ("u-store", "storekeeper", 1), ("u-old", "manager", 0)]
        {
            sqlx::query("INSERT INTO actor (id, role, is_active) VALUES (?, ?, ?)")
                .bind(id)
                .bind(role)
                .bind(active)
                .execute(&pool)
                .await
                .expect("insert actor");
        }

        pool
    }

    async fn insert_delegation(
        pool: &sqlx::SqlitePool,
        id: &str,
        delegator: &str,
        delegate: &str,
        starts_on: &str,
        ends_on: &str,
        scope: &str,
        is_active: i64,
    ) {
        sqlx::query(
            "INSERT INTO delegation_rule
                 (id, delegator_id, delegate_id, starts_on, ends_on, scope, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(delegator)
        .bind(delegate)
        .bind(starts_on)
        .bind(ends_on)
        .bind(scope)
        .bind(is_active)
        .execute(pool)
        .await
        .expect("insert delegation");
    }

    fn day(raw: &str) -> NaiveDate {
        raw.parse().expect("valid date")
    }

    #[tokio::test]
    async fn returns_only_active_in_window_grants_with_delegator_joined() {
        let pool = setup().await;
        insert_delegation(&pool, "d-1", "u-mgr", "u-store", "2026-03-01", "2026-03-31", "all", 1)
            .await;
        insert_delegation(&pool, "d-2", "u-mgr", "u-store", "2026-01-01", "2026-01-31", "all", 1)
            .await;
        insert_delegation(&pool, "d-3", "u-mgr", "u-store", "2026-03-01", "2026-03-31", "all", 0)
            .await;

        let repo = SqlDelegationRepository::new(pool);
        let grants = repo.active_grants_for("u-store", day("2026-03-10")).await.expect("grants");

        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].rule.id, "d-1");
        assert_eq!(grants[0].delegator.id, "u-mgr");
        assert_eq!(grants[0].delegator.role, "manager");
        assert!(grants[0].delegator.is_active);
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let pool = setup().await;
        insert_delegation(&pool, "d-1", "u-mgr", "u-store", "2026-03-01", "2026-03-31", "all", 1)
            .await;

        let repo = SqlDelegationRepository::new(pool);
        for boundary in ["2026-03-01", "2026-03-31"] {
            let grants = repo.active_grants_for("u-store", day(boundary)).await.expect("grants");
            assert_eq!(grants.len(), 1, "day {boundary} should be inside the window");
        }

        let outside = repo.active_grants_for("u-store", day("2026-04-01")).await.expect("grants");
        assert!(outside.is_empty());
    }

    #[tokio::test]
    async fn inactive_delegators_are_still_returned_for_the_authorizer_to_reject() {
        let pool = setup().await;
        insert_delegation(&pool, "d-1", "u-old", "u-store", "2026-03-01", "2026-03-31", "all", 1)
            .await;

        let repo = SqlDelegationRepository::new(pool);
        let grants = repo.active_grants_for("u-store", day("2026-03-10")).await.expect("grants");

        assert_eq!(grants.len(), 1);
        assert!(!grants[0].delegator.is_active);
    }
}
