//! Session handling, the API client, and the scan/poll engine.

pub mod auth;
pub mod http;
pub mod logging;
pub mod models;
pub mod notify;
pub mod poller;
pub mod retry;
pub mod scanner;
pub mod session;

pub use auth::{Authenticator, HttpAuthenticator, LOGIN_PATH};
pub use http::{ApiResponse, CallOutcome, DEFAULT_TIMEOUT, HttpExecutor, build_client};
pub use models::{InstanceState, ListResponse, ModelInstance, ModelRef, Pagination};
pub use notify::{DeletionEvent, NoopNotifier, Notifier, WebhookNotifier};
pub use poller::{DEFAULT_POLL_INTERVAL, PollStats, Poller, PollerState, poll_loop};
pub use retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, RetryCoordinator, RetryPolicy};
pub use scanner::{
    ErrorModelScanner, FailedDeletion, MODELS_PATH, ModelFailure, ScanOptions, ScanReport,
    instance_path, instances_path,
};
pub use session::{Credentials, Session, SessionCookie};
