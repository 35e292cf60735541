#![allow(dead_code)]
//! A wiremock stand-in for the GPUStack API.

use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use gswatch::core::auth::{HttpAuthenticator, LOGIN_PATH};
use gswatch::core::http::HttpExecutor;
use gswatch::core::models::ModelInstance;
use gswatch::core::retry::{RetryCoordinator, RetryPolicy};
use gswatch::core::scanner::{ErrorModelScanner, MODELS_PATH, instance_path, instances_path};
use gswatch::test_utils::{make_instances_json, make_models_json, make_test_credentials};

pub const SESSION_COOKIE: &str = "gpustack_session=abc123";
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Mock API server with helpers for each endpoint the watcher calls.
pub struct MockGpuStack {
    pub server: MockServer,
}

impl MockGpuStack {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// `POST /auth/login` answers 200 and sets the session cookie.
    pub async fn mount_login_ok(&self) {
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", format!("{SESSION_COOKIE}; Path=/; HttpOnly")),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mount_login_status(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// `GET /v1/models`, only for requests carrying the session cookie.
    pub async fn mount_models(&self, ids: &[i64]) {
        self.mount_authed_json("GET", MODELS_PATH, make_models_json(ids))
            .await;
    }

    pub async fn mount_instances(&self, model_id: i64, instances: &[ModelInstance]) {
        self.mount_authed_json(
            "GET",
            &instances_path(model_id),
            make_instances_json(instances),
        )
        .await;
    }

    /// `DELETE /v1/model-instances/{id}` answering `status`.
    pub async fn mount_delete(&self, instance_id: i64, status: u16) {
        Mock::given(method("DELETE"))
            .and(path(instance_path(instance_id)))
            .and(header("cookie", SESSION_COOKIE))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Answer `status` to the next `times` requests for `method_name path_str`,
    /// ahead of any other mock for the same route.
    pub async fn mount_status_once(&self, method_name: &str, path_str: &str, status: u16, times: u64) {
        Mock::given(method(method_name))
            .and(path(path_str))
            .respond_with(ResponseTemplate::new(status))
            .up_to_n_times(times)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    async fn mount_authed_json(&self, method_name: &str, path_str: &str, body: Value) {
        Mock::given(method(method_name))
            .and(path(path_str))
            .and(header("cookie", SESSION_COOKIE))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Requests received so far for `method_name path_str`.
    pub async fn count(&self, method_name: &str, path_str: &str) -> usize {
        self.requests()
            .await
            .iter()
            .filter(|r| r.method.as_str() == method_name && r.url.path() == path_str)
            .count()
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    pub fn executor(&self) -> HttpExecutor {
        HttpExecutor::with_timeout(&self.uri(), TEST_TIMEOUT).expect("client build")
    }

    /// A scanner wired to this server with no backoff.
    pub fn scanner(&self, max_retries: u32) -> ErrorModelScanner<HttpAuthenticator> {
        let executor = self.executor();
        let coordinator = RetryCoordinator::new(
            HttpAuthenticator::new(executor.clone()),
            make_test_credentials(),
            RetryPolicy::new(max_retries, Duration::ZERO),
        );
        ErrorModelScanner::new(coordinator, executor)
    }
}
