//! One scan cycle: find model instances in the error state and delete them.
//!
//! Every API call goes through the [`RetryCoordinator`]. A failure while
//! listing the models ends the cycle; a failure for one model or one
//! instance is logged and the cycle carries on with the next one.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::auth::Authenticator;
use super::http::HttpExecutor;
use super::models::{ListResponse, ModelInstance, ModelRef};
use super::notify::{DeletionEvent, NoopNotifier, Notifier};
use super::retry::RetryCoordinator;
use crate::error::{Result, WatchError};

/// `GET` path listing every model.
pub const MODELS_PATH: &str = "/v1/models";

/// `GET` path listing the instances of one model.
#[must_use]
pub fn instances_path(model_id: i64) -> String {
    format!("/v1/models/{model_id}/instances")
}

/// `DELETE` path of one model instance.
#[must_use]
pub fn instance_path(instance_id: i64) -> String {
    format!("/v1/model-instances/{instance_id}")
}

/// Knobs for a scan cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Report error instances without deleting them.
    pub dry_run: bool,
}

/// A model whose instance listing failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelFailure {
    pub model_id: i64,
    pub error: String,
}

/// An error instance that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDeletion {
    pub instance_id: i64,
    pub model_id: i64,
    pub error: String,
}

/// What one scan cycle saw and did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Number of models listed.
    pub models: usize,
    /// Number of instances seen across all models that could be listed.
    pub instances: usize,
    /// Ids of instances found in the error state.
    pub error_instances: Vec<i64>,
    /// Ids deleted successfully.
    pub deleted: Vec<i64>,
    /// Ids left alone because of dry-run.
    pub skipped: Vec<i64>,
    pub failed_deletions: Vec<FailedDeletion>,
    pub model_failures: Vec<ModelFailure>,
    /// Set when shutdown interrupted the cycle.
    pub cancelled: bool,
}

impl ScanReport {
    /// Whether every unit of work in the cycle succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_deletions.is_empty() && self.model_failures.is_empty()
    }
}

/// Lists models and instances and removes the ones in the error state.
pub struct ErrorModelScanner<A> {
    coordinator: RetryCoordinator<A>,
    executor: HttpExecutor,
    notifier: Arc<dyn Notifier>,
    options: ScanOptions,
    cancel: CancellationToken,
}

impl<A: Authenticator> ErrorModelScanner<A> {
    #[must_use]
    pub fn new(coordinator: RetryCoordinator<A>, executor: HttpExecutor) -> Self {
        Self {
            coordinator,
            executor,
            notifier: Arc::new(NoopNotifier),
            options: ScanOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub const fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Share a cancellation token with the scanner and its retry backoff.
    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.coordinator.set_cancellation(token.clone());
        self.cancel = token;
    }

    #[must_use]
    pub const fn coordinator(&self) -> &RetryCoordinator<A> {
        &self.coordinator
    }

    #[must_use]
    pub const fn options(&self) -> ScanOptions {
        self.options
    }

    /// Log in once, outside of any retry loop.
    ///
    /// # Errors
    ///
    /// Returns the authenticator's error.
    pub async fn login(&mut self) -> Result<()> {
        self.coordinator.login().await
    }

    /// Run one full scan cycle.
    ///
    /// # Errors
    ///
    /// Only the model listing can fail the cycle (including
    /// [`WatchError::Cancelled`]); everything below it is recorded in the
    /// returned [`ScanReport`].
    pub async fn scan(&mut self) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        let models = self.list_models().await?;
        report.models = models.len();
        debug!(models = models.len(), "Fetched model list");

        'models: for model in models {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let instances = match self.list_instances(model.id).await {
                Ok(instances) => instances,
                Err(WatchError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!(model_id = model.id, error = %e, "Failed to list model instances");
                    report.model_failures.push(ModelFailure {
                        model_id: model.id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            report.instances += instances.len();

            for instance in instances {
                debug!(
                    instance_id = instance.id,
                    model_id = instance.model_id,
                    model_name = %instance.model_name,
                    state = %instance.state,
                    "Checked instance"
                );
                if !instance.state.is_error() {
                    continue;
                }

                warn!(
                    instance_id = instance.id,
                    model_id = instance.model_id,
                    model_name = %instance.model_name,
                    state_message = %instance.state_message,
                    "Found instance in error state"
                );
                report.error_instances.push(instance.id);

                if self.options.dry_run {
                    info!(instance_id = instance.id, "Dry run, leaving instance in place");
                    report.skipped.push(instance.id);
                    continue;
                }

                if self.cancel.is_cancelled() {
                    report.cancelled = true;
                    break 'models;
                }

                match self.delete_instance(instance.id).await {
                    Ok(()) => {
                        info!(
                            instance_id = instance.id,
                            model_id = instance.model_id,
                            model_name = %instance.model_name,
                            "Deleted error instance"
                        );
                        report.deleted.push(instance.id);
                        self.notifier
                            .notify(&DeletionEvent::succeeded(&instance))
                            .await;
                    }
                    Err(WatchError::Cancelled) => {
                        report.cancelled = true;
                        break 'models;
                    }
                    Err(e) => {
                        error!(
                            instance_id = instance.id,
                            model_id = instance.model_id,
                            error = %e,
                            "Failed to delete error instance"
                        );
                        self.notifier
                            .notify(&DeletionEvent::failed(&instance, &e))
                            .await;
                        report.failed_deletions.push(FailedDeletion {
                            instance_id: instance.id,
                            model_id: instance.model_id,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            models = report.models,
            instances = report.instances,
            errors = report.error_instances.len(),
            deleted = report.deleted.len(),
            failed = report.failed_deletions.len() + report.model_failures.len(),
            cancelled = report.cancelled,
            "Scan complete"
        );

        Ok(report)
    }

    /// List every model id.
    ///
    /// # Errors
    ///
    /// Returns the retry layer's error.
    pub async fn list_models(&mut self) -> Result<Vec<ModelRef>> {
        let executor = &self.executor;
        let response = self
            .coordinator
            .run_with_retry(move |session| async move {
                executor
                    .get_json::<ListResponse<ModelRef>>(MODELS_PATH, &session)
                    .await
            })
            .await?;
        if let Some(total) = response.truncated_total() {
            warn!(
                returned = response.items.len(),
                total,
                "Model list is paginated, some models were not returned"
            );
        }
        Ok(response.items)
    }

    /// List the instances of one model.
    ///
    /// # Errors
    ///
    /// Returns the retry layer's error.
    pub async fn list_instances(&mut self, model_id: i64) -> Result<Vec<ModelInstance>> {
        let executor = &self.executor;
        let path = instances_path(model_id);
        let path = path.as_str();
        let response = self
            .coordinator
            .run_with_retry(move |session| async move {
                executor
                    .get_json::<ListResponse<ModelInstance>>(path, &session)
                    .await
            })
            .await?;
        if let Some(total) = response.truncated_total() {
            warn!(
                model_id,
                returned = response.items.len(),
                total,
                "Instance list is paginated, some instances were not returned"
            );
        }
        Ok(response.items)
    }

    /// Delete one model instance.
    ///
    /// # Errors
    ///
    /// Returns the retry layer's error.
    pub async fn delete_instance(&mut self, instance_id: i64) -> Result<()> {
        let executor = &self.executor;
        let path = instance_path(instance_id);
        let path = path.as_str();
        self.coordinator
            .run_with_retry(move |session| async move { executor.delete(path, &session).await })
            .await
    }
}
