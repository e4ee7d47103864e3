use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIDENCE: f64 = 0.7;
pub const MIN_CONFIDENCE: f64 = 0.6;
pub const MAX_CONFIDENCE: f64 = 1.0;
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PriceRange {
    Low,
    #[default]
    Medium,
    High,
}

impl PriceRange {
    pub const ALL: [PriceRange; 3] = [PriceRange::Low, PriceRange::Medium, PriceRange::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceRange::Low => "low",
            PriceRange::Medium => "medium",
            PriceRange::High => "high",
        }
    }

    /// Sort rank used by the client price ordering (low < medium < high).
    pub fn rank(&self) -> u8 {
        match self {
            PriceRange::Low => 1,
            PriceRange::Medium => 2,
            PriceRange::High => 3,
        }
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(PriceRange::Low),
            "medium" => Ok(PriceRange::Medium),
            "high" => Ok(PriceRange::High),
            other => Err(format!("unknown price range: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Relevance,
    Popularity,
    Price,
}

/// One product recommendation decoded from a completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRecord {
    pub name: String,
    pub reason: String,
    /// Always within `[0.6, 1.0]` for parsed records; the failure sentinel uses 0.1.
    pub confidence: f64,
    pub categories: Vec<String>,
    pub price_range: PriceRange,
    /// Empty when the model gave no link.
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

impl SearchFilters {
    /// Overwrite fields that are present in `other`, keep the rest.
    pub fn merge(&mut self, other: SearchFilters) {
        if other.price_range.is_some() {
            self.price_range = other.price_range;
        }
        if other.categories.is_some() {
            self.categories = other.categories;
        }
        if other.sort_by.is_some() {
            self.sort_by = other.sort_by;
        }
    }
}

/// Body of `POST /api/search`.
///
/// Fields are lenient on input so that missing values reach validation and get the
/// proper error message instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub suggestions: Vec<SuggestionRecord>,
    pub total_results: usize,
    /// Wall time of the server pipeline in milliseconds.
    pub search_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_camel_case() {
        let record = SuggestionRecord {
            name: "Pixel Buds".to_string(),
            reason: "Good fit".to_string(),
            confidence: 0.8,
            categories: vec!["Audio".to_string()],
            price_range: PriceRange::Low,
            link: String::new(),
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["priceRange"], "low");
        assert_eq!(json["confidence"], 0.8);
    }

    #[test]
    fn filters_merge_keeps_existing_fields() {
        let mut filters = SearchFilters::default();
        filters.merge(SearchFilters {
            price_range: Some(PriceRange::Low),
            ..Default::default()
        });
        filters.merge(SearchFilters {
            sort_by: Some(SortBy::Popularity),
            ..Default::default()
        });
        assert_eq!(filters.price_range, Some(PriceRange::Low));
        assert_eq!(filters.sort_by, Some(SortBy::Popularity));
        assert_eq!(filters.categories, None);
    }

    #[test]
    fn request_tolerates_missing_fields() {
        let req: SearchRequest = serde_json::from_str(r#"{"query":"earbuds"}"#).expect("parse");
        assert_eq!(req.query, "earbuds");
        assert!(req.language.is_none());

        let req: SearchRequest = serde_json::from_str("{}").expect("parse");
        assert!(req.query.is_empty());
    }

    #[test]
    fn price_range_from_str() {
        assert_eq!("high".parse::<PriceRange>(), Ok(PriceRange::High));
        assert!("HIGH".parse::<PriceRange>().is_err());
    }
}
