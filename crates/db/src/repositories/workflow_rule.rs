use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;

use stockflow_core::domain::document::DocumentType;
use stockflow_core::domain::rule::WorkflowRule;

use super::{RepositoryError, WorkflowRuleRepository};
use crate::DbPool;

pub struct SqlWorkflowRuleRepository {
    pool: DbPool,
}

impl SqlWorkflowRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_amount(field: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

fn row_to_rule(row: &sqlx::sqlite::SqliteRow) -> Result<WorkflowRule, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let document_type_str: String =
        row.try_get("document_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let min_amount_str: String =
        row.try_get("min_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let max_amount_str: Option<String> =
        row.try_get("max_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_role: String =
        row.try_get("approver_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let sla_hours: i64 =
        row.try_get("sla_hours").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let document_type = DocumentType::parse(&document_type_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown document type `{document_type_str}`"))
    })?;
    let min_amount = parse_amount("min_amount", &min_amount_str)?;
    let max_amount = match max_amount_str {
        Some(raw) => Some(parse_amount("max_amount", &raw)?),
        None => None,
    };

    Ok(WorkflowRule { id, document_type, min_amount, max_amount, approver_role, sla_hours })
}

#[async_trait]
impl WorkflowRuleRepository for SqlWorkflowRuleRepository {
    async fn rules_for(
        &self,
        document_type: DocumentType,
    ) -> Result<Vec<WorkflowRule>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, document_type, min_amount, max_amount, approver_role, sla_hours
             FROM workflow_rule
             WHERE document_type = ?
             ORDER BY CAST(min_amount AS REAL) ASC, id ASC",
        )
        .bind(document_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rule).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use stockflow_core::domain::document::DocumentType;

    use super::SqlWorkflowRuleRepository;
    use crate::repositories::WorkflowRuleRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    async fn insert_rule(
        pool: &sqlx::SqlitePool,
        id: &str,
        document_type: &str,
        min: &str,
        max: Option<&str>,
        role: &str,
        sla_hours: i64,
    ) {
        sqlx::query(
            "INSERT INTO workflow_rule
                 (id, document_type, min_amount, max_amount, approver_role, sla_hours, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(document_type)
        .bind(min)
        .bind(max)
        .bind(role)
        .bind(sla_hours)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .expect("insert rule");
    }

    #[tokio::test]
    async fn rules_come_back_ordered_by_minimum_amount() {
        let pool = setup().await;
        insert_rule(&pool, "wr-2", "material_issue", "2000", Some("10000"), "manager", 48).await;
        insert_rule(&pool, "wr-1", "material_issue", "0", Some("2000"), "supervisor", 24).await;
        insert_rule(&pool, "wr-3", "material_issue", "10000", None, "operations_head", 72).await;
        insert_rule(&pool, "wr-jo", "job_order", "0", None, "planner", 12).await;

        let repo = SqlWorkflowRuleRepository::new(pool);
        let rules = repo.rules_for(DocumentType::MaterialIssue).await.expect("load rules");

        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].approver_role, "supervisor");
        assert_eq!(rules[1].approver_role, "manager");
        assert_eq!(rules[2].approver_role, "operations_head");
        assert_eq!(rules[0].min_amount, Decimal::ZERO);
        assert_eq!(rules[1].max_amount, Some(Decimal::new(10_000, 0)));
        assert_eq!(rules[2].max_amount, None);
    }

    #[tokio::test]
    async fn no_rules_for_type_is_an_empty_set_not_an_error() {
        let pool = setup().await;
        let repo = SqlWorkflowRuleRepository::new(pool);

        let rules = repo.rules_for(DocumentType::PurchaseRequest).await.expect("load rules");
        assert!(rules.is_empty());
    }
}
