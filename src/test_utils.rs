//! Test utilities for gswatch.
//!
//! Provides test data factories, a scripted authenticator, a recording
//! notifier, and an isolated temp directory for config files.
//!
//! # Usage
//!
//! ```rust,ignore
//! use gswatch::test_utils::*;
//!
//! let instance = make_test_instance(2, 10, InstanceState::Error);
//! let dir = TestDir::new();
//! dir.create_file("config.toml", &make_test_config_toml("http://127.0.0.1:9"));
//! ```

use std::collections::VecDeque;
use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::{Value, json};

use crate::core::auth::Authenticator;
use crate::core::models::{InstanceState, ModelInstance};
use crate::core::notify::{DeletionEvent, Notifier, NotifyFuture};
use crate::core::session::{Credentials, Session, SessionCookie};
use crate::error::{Result, WatchError};

// =============================================================================
// Test Data Factories
// =============================================================================

/// Create a `ModelInstance` with a realistic name and message.
#[must_use]
pub fn make_test_instance(id: i64, model_id: i64, state: InstanceState) -> ModelInstance {
    let state_message = if state.is_error() {
        "CUDA error: out of memory".to_string()
    } else {
        String::new()
    };
    ModelInstance {
        id,
        model_id,
        model_name: format!("model-{model_id}"),
        state,
        state_message,
    }
}

/// Create a valid session carrying one cookie.
#[must_use]
pub fn make_test_session() -> Session {
    Session::new(vec![SessionCookie {
        name: "gpustack_session".to_string(),
        value: "test-token".to_string(),
    }])
}

#[must_use]
pub fn make_test_credentials() -> Credentials {
    Credentials::new("admin", "test-password")
}

/// JSON body of `GET /v1/models` for the given ids.
#[must_use]
pub fn make_models_json(ids: &[i64]) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "name": format!("model-{id}")}))
        .collect();
    json!({"items": items, "pagination": {"total": ids.len(), "page": 1}})
}

/// JSON body of `GET /v1/models/{id}/instances`.
#[must_use]
pub fn make_instances_json(instances: &[ModelInstance]) -> Value {
    json!({"items": instances, "pagination": {"total": instances.len(), "page": 1}})
}

/// Sample `config.toml` pointing at `base_url`.
#[must_use]
pub fn make_test_config_toml(base_url: &str) -> String {
    format!(
        r#"[api]
base_url = "{base_url}"
username = "admin"
password = "test-password"

[polling]
interval_seconds = 1
request_timeout_seconds = 2
max_retries = 3
retry_delay_seconds = 0

[general]
log_level = "debug"
"#
    )
}

// =============================================================================
// Test Doubles
// =============================================================================

/// Authenticator that replays a fixed script of login results.
///
/// Once the script is exhausted every login succeeds with
/// [`make_test_session`].
#[derive(Debug, Default)]
pub struct ScriptedAuthenticator {
    script: Mutex<VecDeque<Result<Session>>>,
    calls: AtomicU32,
}

impl ScriptedAuthenticator {
    #[must_use]
    pub fn new(script: Vec<Result<Session>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        }
    }

    /// The first `times` logins fail with `status`; later ones succeed.
    #[must_use]
    pub fn rejecting(status: u16, times: usize) -> Self {
        Self::new(
            (0..times)
                .map(|_| Err(WatchError::AuthRejected { status }))
                .collect(),
        )
    }

    /// Number of login calls made so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Authenticator for ScriptedAuthenticator {
    async fn login(&self, _credentials: &Credentials) -> Result<Session> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .expect("script lock poisoned")
            .pop_front();
        next.unwrap_or_else(|| Ok(make_test_session()))
    }
}

/// Notifier that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<DeletionEvent>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of received events, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<DeletionEvent> {
        self.events.lock().expect("events lock poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify<'a>(&'a self, event: &'a DeletionEvent) -> NotifyFuture<'a> {
        self.events
            .lock()
            .expect("events lock poisoned")
            .push(event.clone());
        Box::pin(std::future::ready(()))
    }
}

// =============================================================================
// Temporary Directories
// =============================================================================

/// An isolated temporary directory, removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file with `content`, creating parent directories as needed.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
        path
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests for Test Utilities
// =============================================================================
