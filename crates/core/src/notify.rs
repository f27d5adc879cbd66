use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::document::{DocumentId, DocumentType};
use crate::errors::SideEffectError;

/// Outbound notification channel. Best-effort, fire-and-forget relative to
/// the committed state transition; failures are logged by the caller and
/// never roll back an approval decision.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_role(
        &self,
        role: &str,
        event_name: &str,
        payload: Value,
    ) -> Result<(), SideEffectError>;

    async fn notify_document_watchers(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
        event_name: &str,
        payload: Value,
    ) -> Result<(), SideEffectError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoleNotification {
    pub role: String,
    pub event_name: String,
    pub payload: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WatcherNotification {
    pub document_type: DocumentType,
    pub document_id: DocumentId,
    pub event_name: String,
    pub payload: Value,
}

#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    role_notifications: Arc<Mutex<Vec<RoleNotification>>>,
    watcher_notifications: Arc<Mutex<Vec<WatcherNotification>>>,
}

impl InMemoryNotifier {
    pub fn role_notifications(&self) -> Vec<RoleNotification> {
        match self.role_notifications.lock() {
            Ok(notifications) => notifications.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn watcher_notifications(&self) -> Vec<WatcherNotification> {
        match self.watcher_notifications.lock() {
            Ok(notifications) => notifications.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify_role(
        &self,
        role: &str,
        event_name: &str,
        payload: Value,
    ) -> Result<(), SideEffectError> {
        let notification = RoleNotification {
            role: role.to_string(),
            event_name: event_name.to_string(),
            payload,
        };
        match self.role_notifications.lock() {
            Ok(mut notifications) => notifications.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
        Ok(())
    }

    async fn notify_document_watchers(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
        event_name: &str,
        payload: Value,
    ) -> Result<(), SideEffectError> {
        let notification = WatcherNotification {
            document_type,
            document_id: document_id.clone(),
            event_name: event_name.to_string(),
            payload,
        };
        match self.watcher_notifications.lock() {
            Ok(mut notifications) => notifications.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
        Ok(())
    }
}
