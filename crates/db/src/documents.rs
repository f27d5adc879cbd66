use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tokio::sync::RwLock;

use stockflow_core::domain::document::{
    DocumentId, DocumentSnapshot, DocumentStatus, DocumentType,
};

use crate::repositories::RepositoryError;
use crate::DbPool;

/// Update contract for the status/SLA slice of a document. Each document
/// type owns its table; the engine only asks the store to persist the values
/// it computed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, id: &DocumentId) -> Result<Option<DocumentSnapshot>, RepositoryError>;

    async fn mark_pending_approval(
        &self,
        id: &DocumentId,
        sla_due_date: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn set_sla_due_date(
        &self,
        id: &DocumentId,
        sla_due_date: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn mark_approved(
        &self,
        id: &DocumentId,
        approved_by: &str,
        approved_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn mark_rejected(
        &self,
        id: &DocumentId,
        rejection_reason: Option<&str>,
    ) -> Result<(), RepositoryError>;
}

/// SQL store for one document table. Constructed once per document type;
/// table names are compile-time constants, never caller input.
pub struct SqlDocumentStore {
    pool: DbPool,
    table: &'static str,
}

impl SqlDocumentStore {
    pub fn material_issue(pool: DbPool) -> Self {
        Self { pool, table: "material_issue" }
    }

    pub fn job_order(pool: DbPool) -> Self {
        Self { pool, table: "job_order" }
    }

    pub fn purchase_request(pool: DbPool) -> Self {
        Self { pool, table: "purchase_request" }
    }

    pub fn for_type(document_type: DocumentType, pool: DbPool) -> Self {
        match document_type {
            DocumentType::MaterialIssue => Self::material_issue(pool),
            DocumentType::JobOrder => Self::job_order(pool),
            DocumentType::PurchaseRequest => Self::purchase_request(pool),
        }
    }
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn find(&self, id: &DocumentId) -> Result<Option<DocumentSnapshot>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT id, status, sla_due_date FROM {} WHERE id = ?",
            self.table
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let status_str: String =
            row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let sla_due_date_str: Option<String> =
            row.try_get("sla_due_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let status = DocumentStatus::parse(&status_str).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown document status `{status_str}`"))
        })?;
        let sla_due_date = match sla_due_date_str {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| RepositoryError::Decode(format!("sla_due_date: {e}")))?,
            ),
            None => None,
        };

        Ok(Some(DocumentSnapshot { id: DocumentId(id), status, sla_due_date }))
    }

    async fn mark_pending_approval(
        &self,
        id: &DocumentId,
        sla_due_date: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "UPDATE {} SET status = 'pending_approval', sla_due_date = ?, rejection_reason = NULL
             WHERE id = ?",
            self.table
        ))
        .bind(sla_due_date.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_sla_due_date(
        &self,
        id: &DocumentId,
        sla_due_date: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(&format!("UPDATE {} SET sla_due_date = ? WHERE id = ?", self.table))
            .bind(sla_due_date.to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_approved(
        &self,
        id: &DocumentId,
        approved_by: &str,
        approved_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "UPDATE {} SET status = 'approved', approved_by = ?, approved_at = ? WHERE id = ?",
            self.table
        ))
        .bind(approved_by)
        .bind(approved_at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_rejected(
        &self,
        id: &DocumentId,
        rejection_reason: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "UPDATE {} SET status = 'rejected', rejection_reason = ? WHERE id = ?",
            self.table
        ))
        .bind(rejection_reason)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Typed lookup table from document type to its store, built once at
/// startup. Replaces the legacy pattern of selecting a persistence target by
/// document-type string at call time.
#[derive(Clone)]
pub struct DocumentStoreRegistry {
    stores: HashMap<DocumentType, Arc<dyn DocumentStore>>,
}

impl DocumentStoreRegistry {
    pub fn new(stores: HashMap<DocumentType, Arc<dyn DocumentStore>>) -> Self {
        Self { stores }
    }

    /// One SQL store per document type over the shared pool.
    pub fn sql(pool: DbPool) -> Self {
        let stores = DocumentType::ALL
            .into_iter()
            .map(|document_type| {
                let store: Arc<dyn DocumentStore> =
                    Arc::new(SqlDocumentStore::for_type(document_type, pool.clone()));
                (document_type, store)
            })
            .collect();
        Self { stores }
    }

    pub fn store_for(&self, document_type: DocumentType) -> Option<&dyn DocumentStore> {
        self.stores.get(&document_type).map(Arc::as_ref)
    }
}

/// Test double tracking the same status/SLA slice in memory.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, StoredDocument>>,
}

#[derive(Clone, Debug)]
struct StoredDocument {
    snapshot: DocumentSnapshot,
    rejection_reason: Option<String>,
    approved_by: Option<String>,
}

impl InMemoryDocumentStore {
    pub async fn insert_draft(&self, id: &str) {
        let mut documents = self.documents.write().await;
        documents.insert(
            id.to_string(),
            StoredDocument {
                snapshot: DocumentSnapshot {
                    id: DocumentId(id.to_string()),
                    status: DocumentStatus::Draft,
                    sla_due_date: None,
                },
                rejection_reason: None,
                approved_by: None,
            },
        );
    }

    pub async fn rejection_reason(&self, id: &str) -> Option<String> {
        let documents = self.documents.read().await;
        documents.get(id).and_then(|document| document.rejection_reason.clone())
    }

    pub async fn approved_by(&self, id: &str) -> Option<String> {
        let documents = self.documents.read().await;
        documents.get(id).and_then(|document| document.approved_by.clone())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(&self, id: &DocumentId) -> Result<Option<DocumentSnapshot>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id.0).map(|document| document.snapshot.clone()))
    }

    async fn mark_pending_approval(
        &self,
        id: &DocumentId,
        sla_due_date: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        if let Some(document) = documents.get_mut(&id.0) {
            document.snapshot.status = DocumentStatus::PendingApproval;
            document.snapshot.sla_due_date = Some(sla_due_date);
            document.rejection_reason = None;
        }
        Ok(())
    }

    async fn set_sla_due_date(
        &self,
        id: &DocumentId,
        sla_due_date: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        if let Some(document) = documents.get_mut(&id.0) {
            document.snapshot.sla_due_date = Some(sla_due_date);
        }
        Ok(())
    }

    async fn mark_approved(
        &self,
        id: &DocumentId,
        approved_by: &str,
        _approved_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        if let Some(document) = documents.get_mut(&id.0) {
            document.snapshot.status = DocumentStatus::Approved;
            document.approved_by = Some(approved_by.to_string());
        }
        Ok(())
    }

    async fn mark_rejected(
        &self,
        id: &DocumentId,
        rejection_reason: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        if let Some(document) = documents.get_mut(&id.0) {
            document.snapshot.status = DocumentStatus::Rejected;
            document.rejection_reason = rejection_reason.map(str::to_string);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use stockflow_core::domain::document::{DocumentId, DocumentStatus, DocumentType};

    use super::{DocumentStore, DocumentStoreRegistry};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    async fn insert_document(pool: &sqlx::SqlitePool, table: &str, id: &str) {
        sqlx::query(&format!("INSERT INTO {table} (id, status, created_at) VALUES (?, 'draft', ?)"))
            .bind(id)
            .bind(Utc::now().to_rfc3339())
            .execute(pool)
            .await
            .expect("insert document");
    }

    #[tokio::test]
    async fn registry_routes_each_type_to_its_own_table() {
        let pool = setup().await;
        insert_document(&pool, "material_issue", "MI-001").await;
        insert_document(&pool, "job_order", "JO-001").await;

        let registry = DocumentStoreRegistry::sql(pool);

        let mi_store = registry.store_for(DocumentType::MaterialIssue).expect("mi store");
        let found = mi_store.find(&DocumentId("MI-001".to_string())).await.expect("find");
        assert_eq!(found.expect("snapshot").status, DocumentStatus::Draft);

        // The material-issue id does not exist in the job-order table.
        let jo_store = registry.store_for(DocumentType::JobOrder).expect("jo store");
        let missing = jo_store.find(&DocumentId("MI-001".to_string())).await.expect("find");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn status_and_sla_updates_round_trip() {
        let pool = setup().await;
        insert_document(&pool, "purchase_request", "PR-001").await;

        let registry = DocumentStoreRegistry::sql(pool);
        let store = registry.store_for(DocumentType::PurchaseRequest).expect("store");
        let id = DocumentId("PR-001".to_string());

        let due = Utc::now() + Duration::hours(24);
        store.mark_pending_approval(&id, due).await.expect("mark pending");

        let snapshot = store.find(&id).await.expect("find").expect("snapshot");
        assert_eq!(snapshot.status, DocumentStatus::PendingApproval);
        assert_eq!(
            snapshot.sla_due_date.map(|dt| dt.timestamp()),
            Some(due.timestamp()),
        );

        let later = due + Duration::hours(48);
        store.set_sla_due_date(&id, later).await.expect("set due");
        let snapshot = store.find(&id).await.expect("find").expect("snapshot");
        assert_eq!(snapshot.sla_due_date.map(|dt| dt.timestamp()), Some(later.timestamp()));

        store.mark_approved(&id, "u-mgr", Utc::now()).await.expect("approve");
        let snapshot = store.find(&id).await.expect("find").expect("snapshot");
        assert_eq!(snapshot.status, DocumentStatus::Approved);
    }

    #[tokio::test]
    async fn rejection_records_the_reason() {
        let pool = setup().await;
        insert_document(&pool, "material_issue", "MI-009").await;

        let registry = DocumentStoreRegistry::sql(pool.clone());
        let store = registry.store_for(DocumentType::MaterialIssue).expect("store");
        let id = DocumentId("MI-009".to_string());

        store.mark_rejected(&id, Some("insufficient stock")).await.expect("reject");

        let snapshot = store.find(&id).await.expect("find").expect("snapshot");
        assert_eq!(snapshot.status, DocumentStatus::Rejected);

        let reason: Option<String> =
            sqlx::query_scalar("SELECT rejection_reason FROM material_issue WHERE id = ?")
                .bind(&id.0)
                .fetch_one(&pool)
                .await
                .expect("read reason");
        assert_eq!(reason.as_deref(), Some("insufficient stock"));
    }
}
