//! Client search state: last query, results, loading/error flags and the active
//! filters, plus the filtered/sorted view the UI renders.

use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use advisor_common::api::{
    PriceRange, SearchFilters, SortBy, DEFAULT_CATEGORY, MAX_CONFIDENCE, MIN_CONFIDENCE,
};

use crate::api::{ClientSearchRequest, ProductSuggestion, SearchApi};

pub const SEARCH_ERROR_MESSAGE: &str = "Failed to fetch search results. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub current_query: String,
    pub results: Vec<ProductSuggestion>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub total_results: usize,
    /// Client-measured round trip of the last successful search, in milliseconds.
    pub search_time: u64,
    pub filters: SearchFilters,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            current_query: String::new(),
            results: Vec::new(),
            is_loading: false,
            error: None,
            total_results: 0,
            search_time: 0,
            filters: SearchFilters {
                sort_by: Some(SortBy::Relevance),
                ..Default::default()
            },
        }
    }
}

pub struct SearchStore<A> {
    api: A,
    state: SearchState,
}

impl<A: SearchApi> SearchStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: SearchState::default(),
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn has_results(&self) -> bool {
        !self.state.results.is_empty()
    }

    pub async fn search(
        &mut self,
        query: &str,
        filters: Option<SearchFilters>,
        language: Option<&str>,
    ) {
        self.state.is_loading = true;
        self.state.error = None;
        self.state.current_query = query.to_string();
        if let Some(filters) = filters {
            self.state.filters.merge(filters);
        }

        let started = Instant::now();
        let request = ClientSearchRequest {
            query: query.to_string(),
            language: language.map(str::to_string),
            filters: self.state.filters.clone(),
        };

        match self.api.search(&request).await {
            Ok(response) => {
                self.state.results = response.suggestions.into_iter().map(backfill).collect();
                self.state.total_results = response
                    .total_results
                    .filter(|&n| n > 0)
                    .unwrap_or(self.state.results.len());
                self.state.search_time = started.elapsed().as_millis() as u64;
                debug!(
                    query,
                    results = self.state.results.len(),
                    search_time_ms = self.state.search_time,
                    "search results stored"
                );
            }
            Err(e) => {
                warn!(error = %e, query, "search request failed");
                self.state.error = Some(SEARCH_ERROR_MESSAGE.to_string());
                self.state.results.clear();
                self.state.total_results = 0;
            }
        }

        self.state.is_loading = false;
    }

    pub fn update_filters(&mut self, filters: SearchFilters) {
        self.state.filters.merge(filters);
    }

    /// Reset query, results and counters. Filters are kept.
    pub fn clear_results(&mut self) {
        self.state.results.clear();
        self.state.current_query.clear();
        self.state.error = None;
        self.state.total_results = 0;
        self.state.search_time = 0;
    }

    /// Replay the last search with the current filters. No-op without a query.
    pub async fn retry_last_search(&mut self, language: Option<&str>) {
        if self.state.current_query.is_empty() {
            return;
        }
        let query = self.state.current_query.clone();
        let filters = self.state.filters.clone();
        self.search(&query, Some(filters), language).await;
    }

    /// Results after the price and category filters, ordered by `sort_by`.
    pub fn filtered_results(&self) -> Vec<ProductSuggestion> {
        filter_and_sort(&self.state.results, &self.state.filters)
    }
}

pub fn filter_and_sort(
    results: &[ProductSuggestion],
    filters: &SearchFilters,
) -> Vec<ProductSuggestion> {
    let mut out: Vec<ProductSuggestion> = results
        .iter()
        .filter(|p| match filters.price_range {
            Some(price) => p.price_range == Some(price),
            None => true,
        })
        .filter(|p| match filters.categories.as_deref() {
            Some(wanted) if !wanted.is_empty() => p
                .categories
                .as_deref()
                .is_some_and(|cats| cats.iter().any(|c| wanted.contains(c))),
            _ => true,
        })
        .cloned()
        .collect();

    match filters.sort_by.unwrap_or_default() {
        SortBy::Popularity => out.sort_by(|a, b| {
            b.confidence
                .unwrap_or(0.0)
                .total_cmp(&a.confidence.unwrap_or(0.0))
        }),
        // A missing price ranks 0 and therefore sorts before `low`.
        SortBy::Price => out.sort_by_key(|p| p.price_range.map(|r| r.rank()).unwrap_or(0)),
        SortBy::Relevance => {}
    }
    out
}

fn backfill(mut suggestion: ProductSuggestion) -> ProductSuggestion {
    let mut rng = rand::thread_rng();
    if suggestion.confidence.is_none() {
        suggestion.confidence = Some(rng.gen_range(MIN_CONFIDENCE..MAX_CONFIDENCE));
    }
    if suggestion.categories.is_none() {
        suggestion.categories = Some(vec![DEFAULT_CATEGORY.to_string()]);
    }
    if suggestion.price_range.is_none() {
        suggestion.price_range = PriceRange::ALL.choose(&mut rng).copied();
    }
    suggestion
}
