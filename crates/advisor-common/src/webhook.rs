//! Fire-and-forget log side channel.
//!
//! The search pipeline reports a handful of events (query received, suggestions
//! generated, search failed) to an external chat webhook. Delivery never blocks the
//! caller and every failure is swallowed after a local `warn!`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CommonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "🔵 [INFORMATION]",
            LogLevel::Warning => "🟠 [WARNING]",
            LogLevel::Error => "🔴 [ERROR]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
}

impl LogEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            message: message.into(),
        }
    }
}

impl LogEvent {
    /// `<prefix> <YYYY. MM. DD. HH:MM:SS UTC>: <message>`
    pub fn render_at(&self, at: DateTime<Utc>) -> String {
        format!(
            "{} {}: {}",
            self.level.prefix(),
            at.format("%Y. %m. %d. %H:%M:%S UTC"),
            self.message
        )
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_at(Utc::now()))
    }
}

/// Sink for side-channel log events. `emit` must not fail or block.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}

/// Sink used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn emit(&self, event: LogEvent) {
        debug!(level = ?event.level, message = %event.message, "log sink disabled, dropping event");
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

#[derive(Clone)]
pub struct DiscordWebhookSink {
    url: Arc<str>,
    timeout: Duration,
    http: reqwest::Client,
}

impl DiscordWebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("product-advisor")
            .build()?;
        Ok(Self {
            url: Arc::from(url.into()),
            timeout,
            http,
        })
    }

    /// Post one event and wait for the outcome.
    pub async fn deliver(&self, event: &LogEvent) -> Result<(), CommonError> {
        let content = event.to_string();
        let resp = self
            .http
            .post(self.url.as_ref())
            .timeout(self.timeout)
            .json(&WebhookPayload { content: &content })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CommonError::WebhookStatus(resp.status()));
        }
        Ok(())
    }
}

impl LogSink for DiscordWebhookSink {
    fn emit(&self, event: LogEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime, dropping webhook log event");
            return;
        };
        let sink = self.clone();
        handle.spawn(async move {
            if let Err(e) = sink.deliver(&event).await {
                warn!(error = %e, "webhook log delivery failed");
            }
        });
    }
}

/// Build the sink for an optional webhook URL, falling back to [`NoopSink`].
pub fn sink_from_url(url: Option<&str>, timeout: Duration) -> Arc<dyn LogSink> {
    let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
        return Arc::new(NoopSink);
    };
    match DiscordWebhookSink::new(url, timeout) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            warn!(error = %e, "failed to build webhook client, log sink disabled");
            Arc::new(NoopSink)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    #[test]
    fn event_display_is_prefixed() {
        let text = LogEvent::error("Search failed").to_string();
        assert!(text.starts_with("🔴 [ERROR] "));
        assert!(text.ends_with(": Search failed"));
    }

    #[test]
    fn timestamp_is_rendered_in_utc() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 21, 5, 9).unwrap();
        assert_eq!(
            LogEvent::warning("slow tier").render_at(at),
            "🟠 [WARNING] 2026. 03. 07. 21:05:09 UTC: slow tier"
        );
    }

    #[tokio::test]
    async fn deliver_posts_content_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sink = DiscordWebhookSink::new(format!("{}/hook", server.uri()), Duration::from_secs(2))
            .unwrap();
        sink.deliver(&LogEvent::info("User searched for: \"earbuds\""))
            .await
            .unwrap();

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let content = body["content"].as_str().unwrap();
        assert!(content.starts_with("🔵 [INFORMATION] "));
        assert!(content.ends_with("User searched for: \"earbuds\""));
    }

    #[tokio::test]
    async fn deliver_reports_rejected_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sink = DiscordWebhookSink::new(server.uri(), Duration::from_secs(2)).unwrap();
        let err = sink.deliver(&LogEvent::warning("x")).await.unwrap_err();
        assert!(matches!(err, CommonError::WebhookStatus(s) if s.as_u16() == 500));
    }

    #[tokio::test]
    async fn emit_swallows_unreachable_webhook() {
        let sink =
            DiscordWebhookSink::new("http://127.0.0.1:9/unreachable", Duration::from_millis(200))
                .unwrap();
        sink.emit(LogEvent::info("dropped"));
    }

    #[test]
    fn blank_url_disables_sink() {
        // NoopSink does not need a runtime; emitting must be a no-op.
        let sink = sink_from_url(Some("  "), Duration::from_secs(1));
        sink.emit(LogEvent::info("nothing"));
    }
}
