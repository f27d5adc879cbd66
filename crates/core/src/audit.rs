use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::SideEffectError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    SubmitForApproval,
    ApproveLevel,
    Reject,
    Finalize,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitForApproval => "submit_for_approval",
            Self::ApproveLevel => "approve_level",
            Self::Reject => "reject",
            Self::Finalize => "finalize",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub table_name: String,
    pub record_id: String,
    pub action: AuditAction,
    pub old_values: Option<Value>,
    pub new_values: Value,
    pub performed_by: String,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        table_name: impl Into<String>,
        record_id: impl Into<String>,
        action: AuditAction,
        new_values: Value,
        performed_by: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            table_name: table_name.into(),
            record_id: record_id.into(),
            action,
            old_values: None,
            new_values,
            performed_by: performed_by.into(),
            recorded_at,
        }
    }

    pub fn with_old_values(mut self, old_values: Value) -> Self {
        self.old_values = Some(old_values);
        self
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), SideEffectError>;
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl InMemoryAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), SideEffectError> {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::{AuditAction, AuditRecord, AuditSink, InMemoryAuditSink};

    #[tokio::test]
    async fn in_memory_sink_records_value_diffs() {
        let sink = InMemoryAuditSink::default();
        sink.record(
            AuditRecord::new(
                "material_issue",
                "MI-042",
                AuditAction::SubmitForApproval,
                json!({ "status": "pending_approval" }),
                "u-7",
                Utc::now(),
            )
            .with_old_values(json!({ "status": "draft" })),
        )
        .await
        .expect("record");

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].table_name, "material_issue");
        assert_eq!(records[0].action.as_str(), "submit_for_approval");
        assert_eq!(records[0].old_values, Some(json!({ "status": "draft" })));
        assert_eq!(records[0].new_values["status"], "pending_approval");
    }
}
