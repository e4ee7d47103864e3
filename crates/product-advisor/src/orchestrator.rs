//! Search request pipeline: validate, fetch content, extract suggestions, respond.
//!
//! Side-channel log events go to a [`LogSink`] and never affect the outcome.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use advisor_common::api::{SearchRequest, SearchResponse, SuggestionRecord};
use advisor_common::webhook::{LogEvent, LogSink};

use crate::content::ContentCascade;
use crate::error::AppError;
use crate::extractor::SuggestionExtractor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub query: String,
    pub language: String,
}

/// Reject empty queries and missing languages before any downstream call.
pub fn validate(request: &SearchRequest) -> Result<ValidatedQuery, AppError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::MissingQuery);
    }
    let language = request
        .language
        .as_deref()
        .filter(|l| !l.is_empty())
        .ok_or(AppError::MissingLanguage)?;
    Ok(ValidatedQuery {
        query: query.to_string(),
        language: language.to_string(),
    })
}

#[derive(Clone)]
pub struct SearchOrchestrator {
    content: Arc<ContentCascade>,
    extractor: Arc<SuggestionExtractor>,
    sink: Arc<dyn LogSink>,
}

impl SearchOrchestrator {
    pub fn new(
        content: Arc<ContentCascade>,
        extractor: Arc<SuggestionExtractor>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            content,
            extractor,
            sink,
        }
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, AppError> {
        let valid = validate(request)?;
        let started = Instant::now();

        match self.run(&valid).await {
            Ok(suggestions) => {
                let search_time = started.elapsed().as_millis() as u64;
                info!(
                    query = %valid.query,
                    count = suggestions.len(),
                    search_time_ms = search_time,
                    "search complete"
                );
                self.sink.emit(LogEvent::info(format!(
                    "Generated {} suggestions for: \"{}\" in {}ms",
                    suggestions.len(),
                    valid.query,
                    search_time
                )));
                Ok(SearchResponse {
                    total_results: suggestions.len(),
                    suggestions,
                    search_time,
                })
            }
            Err(e) => {
                let search_time = started.elapsed().as_millis() as u64;
                error!(
                    query = %valid.query,
                    error = %e,
                    search_time_ms = search_time,
                    "search failed"
                );
                self.sink.emit(LogEvent::error(format!(
                    "Search failed for \"{}\": {} ({}ms)",
                    valid.query, e, search_time
                )));
                Err(e)
            }
        }
    }

    async fn run(&self, valid: &ValidatedQuery) -> Result<Vec<SuggestionRecord>, AppError> {
        if !self.extractor.has_credential() {
            return Err(AppError::MissingCredential);
        }

        self.sink.emit(LogEvent::info(format!(
            "User searched for: \"{}\" (Language: {})",
            valid.query, valid.language
        )));

        let content = Arc::clone(&self.content);
        let extractor = Arc::clone(&self.extractor);
        let ValidatedQuery { query, language } = valid.clone();

        // A panic inside the pipeline surfaces as a JoinError instead of tearing down
        // the connection task.
        tokio::spawn(async move {
            let block = content.fetch_content(&query, &language).await;
            extractor.extract(&query, &block, &language).await
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
    }
}
