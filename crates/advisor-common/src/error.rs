/// Error types shared across the advisor crates.
///
/// These cover side-channel infrastructure (webhook delivery) whose failures are
/// logged and discarded by callers. Pipeline errors live in the service crate.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rejected message: status={0}")]
    WebhookStatus(reqwest::StatusCode),
}
