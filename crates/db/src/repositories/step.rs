use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use stockflow_core::chain::ChainLevel;
use stockflow_core::domain::document::{DocumentId, DocumentType};
use stockflow_core::domain::step::{ApprovalStep, StepId, StepStatus};

use super::{ApprovalStepRepository, RepositoryError};
use crate::DbPool;

pub struct SqlApprovalStepRepository {
    pool: DbPool,
}

impl SqlApprovalStepRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const STEP_COLUMNS: &str = "id, document_type, document_id, level, approver_role, status,
                            approver_id, notes, decided_at, created_at";

fn row_to_step(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalStep, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let document_type_str: String =
        row.try_get("document_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let document_id: String =
        row.try_get("document_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level: i64 = row.try_get("level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_role: String =
        row.try_get("approver_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_id: Option<String> =
        row.try_get("approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decided_at_str: Option<String> =
        row.try_get("decided_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let document_type = DocumentType::parse(&document_type_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown document type `{document_type_str}`"))
    })?;
    let status = StepStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown step status `{status_str}`")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("created_at: {e}")))?;
    let decided_at = match decided_at_str {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RepositoryError::Decode(format!("decided_at: {e}")))?,
        ),
        None => None,
    };

    Ok(ApprovalStep {
        id: StepId(id),
        document_type,
        document_id: DocumentId(document_id),
        level: level as u32,
        approver_role,
        status,
        approver_id,
        notes,
        decided_at,
        created_at,
    })
}

#[async_trait]
impl ApprovalStepRepository for SqlApprovalStepRepository {
    async fn create_levels(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
        levels: &[ChainLevel],
        created_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for level in levels {
            sqlx::query(
                "INSERT INTO approval_step
                     (id, document_type, document_id, level, approver_role, status, created_at)
                 VALUES (?, ?, ?, ?, ?, 'pending', ?)
                 ON CONFLICT (document_type, document_id, level) DO NOTHING",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(document_type.as_str())
            .bind(&document_id.0)
            .bind(level.position as i64)
            .bind(&level.approver_role)
            .bind(created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_actionable(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
    ) -> Result<Option<ApprovalStep>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {STEP_COLUMNS}
             FROM approval_step
             WHERE document_type = ? AND document_id = ? AND status = 'pending'
             ORDER BY level ASC
             LIMIT 1",
        ))
        .bind(document_type.as_str())
        .bind(&document_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_step(r)?)),
            None => Ok(None),
        }
    }

    async fn steps_for_document(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
    ) -> Result<Vec<ApprovalStep>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {STEP_COLUMNS}
             FROM approval_step
             WHERE document_type = ? AND document_id = ?
             ORDER BY level ASC",
        ))
        .bind(document_type.as_str())
        .bind(&document_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_step).collect::<Result<Vec<_>, _>>()
    }

    async fn pending_steps(&self) -> Result<Vec<ApprovalStep>, RepositoryError> {
        // The single-pending invariant makes status = 'pending' equivalent to
        // "each document's actionable step"; the level guard keeps the query
        // honest against rows written outside the engine.
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {STEP_COLUMNS}
             FROM approval_step AS step
             WHERE status = 'pending'
               AND level = (SELECT MIN(level) FROM approval_step
                            WHERE document_type = step.document_type
                              AND document_id = step.document_id
                              AND status = 'pending')
             ORDER BY created_at ASC, document_type ASC, document_id ASC",
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_step).collect::<Result<Vec<_>, _>>()
    }

    async fn approve(
        &self,
        step_id: &StepId,
        approver_id: &str,
        notes: Option<&str>,
        decided_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE approval_step
             SET status = 'approved', approver_id = ?, notes = ?, decided_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(approver_id)
        .bind(notes)
        .bind(decided_at.to_rfc3339())
        .bind(&step_id.0)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::Conflict);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn reject(
        &self,
        step: &ApprovalStep,
        approver_id: &str,
        notes: Option<&str>,
        decided_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE approval_step
             SET status = 'rejected', approver_id = ?, notes = ?, decided_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(approver_id)
        .bind(notes)
        .bind(decided_at.to_rfc3339())
        .bind(&step.id.0)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::Conflict);
        }

        let skipped = sqlx::query(
            "UPDATE approval_step
             SET status = 'skipped', decided_at = ?
             WHERE document_type = ? AND document_id = ? AND level > ? AND status = 'pending'",
        )
        .bind(decided_at.to_rfc3339())
        .bind(step.document_type.as_str())
        .bind(&step.document_id.0)
        .bind(step.level as i64)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(skipped)
    }
}
