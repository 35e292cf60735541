//! Optional notification hook fired after each deletion attempt.
//!
//! Notification is best effort: a failing notifier is logged and never
//! affects the scan.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::models::ModelInstance;

/// Boxed future returned by [`Notifier::notify`].
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Outcome of one deletion attempt, as sent to notifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionEvent {
    pub instance_id: i64,
    pub model_id: i64,
    pub model_name: String,
    pub state_message: String,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

impl DeletionEvent {
    #[must_use]
    pub fn succeeded(instance: &ModelInstance) -> Self {
        Self::new(instance, None)
    }

    #[must_use]
    pub fn failed(instance: &ModelInstance, error: &crate::error::WatchError) -> Self {
        Self::new(instance, Some(error.to_string()))
    }

    fn new(instance: &ModelInstance, error: Option<String>) -> Self {
        Self {
            instance_id: instance.id,
            model_id: instance.model_id,
            model_name: instance.model_name.clone(),
            state_message: instance.state_message.clone(),
            deleted: error.is_none(),
            error,
            at: Utc::now(),
        }
    }
}

/// Receives deletion outcomes.
pub trait Notifier: Send + Sync {
    fn notify<'a>(&'a self, event: &'a DeletionEvent) -> NotifyFuture<'a>;
}

/// Notifier that does nothing; the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify<'a>(&'a self, _event: &'a DeletionEvent) -> NotifyFuture<'a> {
        Box::pin(std::future::ready(()))
    }
}

/// POSTs each event as JSON to a webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for WebhookNotifier {
    fn notify<'a>(&'a self, event: &'a DeletionEvent) -> NotifyFuture<'a> {
        Box::pin(async move {
            match self.client.post(&self.url).json(event).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(
                        instance_id = event.instance_id,
                        url = %self.url,
                        "Notification delivered"
                    );
                }
                Ok(response) => {
                    tracing::warn!(
                        instance_id = event.instance_id,
                        url = %self.url,
                        status = response.status().as_u16(),
                        "Notification endpoint rejected event"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        instance_id = event.instance_id,
                        url = %self.url,
                        error = %e,
                        "Notification failed"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::InstanceState;
    use crate::error::WatchError;

    fn instance() -> ModelInstance {
        ModelInstance {
            id: 5,
            model_id: 2,
            model_name: "qwen2".to_string(),
            state: InstanceState::Error,
            state_message: "CUDA out of memory".to_string(),
        }
    }

    #[test]
    fn success_event_has_no_error() {
        let event = DeletionEvent::succeeded(&instance());
        assert!(event.deleted);
        assert!(event.error.is_none());
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["instance_id"], 5);
    }

    #[test]
    fn failed_event_carries_message() {
        let err = WatchError::Api {
            method: "DELETE".to_string(),
            path: "/v1/model-instances/5".to_string(),
            status: 500,
        };
        let event = DeletionEvent::failed(&instance(), &err);
        assert!(!event.deleted);
        assert!(event.error.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn noop_notifier_completes() {
        NoopNotifier.notify(&DeletionEvent::succeeded(&instance())).await;
    }
}
