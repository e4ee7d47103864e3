//! Completion-backed suggestion extraction.
//!
//! The prompt asks for three recommendations in a line-tagged format
//! (`PRODUCT_<i>_<TAG>: value`) and [`parse_suggestions`] decodes that format back
//! into records. Any failure collapses into a single sentinel record so callers
//! always receive a non-empty list.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{info, warn};

use advisor_common::api::{
    PriceRange, SuggestionRecord, DEFAULT_CATEGORY, DEFAULT_CONFIDENCE, MAX_CONFIDENCE,
    MIN_CONFIDENCE,
};
use advisor_common::openai::{ChatCompletionRequest, Message, OpenAiClient, OpenAiClientError};

use crate::config::CompletionSettings;

pub const SUGGESTION_COUNT: usize = 3;

const LINK_PLACEHOLDER: &str = "empty";
const SENTINEL_NAME: &str = "Service Temporarily Unavailable";
const SENTINEL_REASON: &str = "We encountered an error while generating product recommendations. \
Please try your search again in a few moments. If the problem persists, please contact our development team.";
const SENTINEL_CONFIDENCE: f64 = 0.1;
const SENTINEL_CATEGORY: &str = "Error";

static TAG_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bPRODUCT_(\d+)_(NAME|REASON|CONFIDENCE|CATEGORIES|PRICE|LINK):(.*)$")
        .expect("valid regex")
});
static CONFIDENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)").expect("valid regex"));
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(low|medium|high)").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Completion(#[from] OpenAiClientError),

    #[error("no valid suggestions parsed from completion")]
    NothingParsed,
}

pub struct SuggestionExtractor {
    openai: Arc<OpenAiClient>,
    settings: CompletionSettings,
}

impl SuggestionExtractor {
    pub fn new(openai: Arc<OpenAiClient>, settings: CompletionSettings) -> Self {
        Self { openai, settings }
    }

    pub fn has_credential(&self) -> bool {
        self.openai.has_credential()
    }

    /// Never empty: failures become [`sentinel_record`].
    pub async fn extract(
        &self,
        query: &str,
        content: &str,
        language: &str,
    ) -> Vec<SuggestionRecord> {
        match self.try_extract(query, content, language).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, query, "suggestion extraction failed, returning sentinel");
                vec![sentinel_record()]
            }
        }
    }

    pub async fn try_extract(
        &self,
        query: &str,
        content: &str,
        language: &str,
    ) -> Result<Vec<SuggestionRecord>, ExtractError> {
        let request = ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                Message::system(system_prompt(query, language)),
                Message::user(user_prompt(query, content)),
            ],
            temperature: Some(self.settings.temperature),
            max_tokens: Some(self.settings.max_tokens),
        };

        let text = self.openai.complete_text(&request).await?;
        let records = parse_suggestions(&text);
        info!(
            model = %self.settings.model,
            parsed = records.len(),
            "completion parsed"
        );
        if records.is_empty() {
            return Err(ExtractError::NothingParsed);
        }
        Ok(records)
    }
}

pub fn system_prompt(query: &str, language: &str) -> String {
    let mut prompt = format!(
        "You are an expert product advisor analyzing Reddit discussions. The user is searching for \"{query}\".\n\n\
Based on the Reddit data, provide exactly {SUGGESTION_COUNT} product recommendations.\n\n\
IMPORTANT: Respond in {language} language for product names and descriptions.\n\n\
Provide your response in the following format (WITHOUT the json markdown markers):"
    );
    for i in 1..=SUGGESTION_COUNT {
        prompt.push_str(&format!(
            "\nPRODUCT_{i}_NAME: [Product name]\n\
PRODUCT_{i}_REASON: [Detailed explanation why you recommend it]\n\
PRODUCT_{i}_CONFIDENCE: [Number between {MIN_CONFIDENCE} and {MAX_CONFIDENCE:.1}]\n\
PRODUCT_{i}_CATEGORIES: [Category1,Category2,Category3]\n\
PRODUCT_{i}_PRICE: [low/medium/high]\n\
PRODUCT_{i}_LINK: [URL if available, or empty]\n"
        ));
    }
    prompt.trim_end().to_string()
}

pub fn user_prompt(query: &str, content: &str) -> String {
    format!(
        "Reddit data analysis for \"{query}\":\n\n{content}\n\nProvide {SUGGESTION_COUNT} product recommendations based on this data."
    )
}

pub fn sentinel_record() -> SuggestionRecord {
    SuggestionRecord {
        name: SENTINEL_NAME.to_string(),
        reason: SENTINEL_REASON.to_string(),
        confidence: SENTINEL_CONFIDENCE,
        categories: vec![SENTINEL_CATEGORY.to_string()],
        price_range: PriceRange::Medium,
        link: String::new(),
    }
}

#[derive(Debug, Default)]
struct TaggedFields<'a> {
    name: Option<&'a str>,
    reason: Option<&'a str>,
    confidence: Option<&'a str>,
    categories: Option<&'a str>,
    price: Option<&'a str>,
    link: Option<&'a str>,
}

impl<'a> TaggedFields<'a> {
    fn slot(&mut self, tag: &str) -> Option<&mut Option<&'a str>> {
        match tag {
            "NAME" => Some(&mut self.name),
            "REASON" => Some(&mut self.reason),
            "CONFIDENCE" => Some(&mut self.confidence),
            "CATEGORIES" => Some(&mut self.categories),
            "PRICE" => Some(&mut self.price),
            "LINK" => Some(&mut self.link),
            _ => None,
        }
    }

    fn into_record(self) -> Option<SuggestionRecord> {
        let name = self.name?;
        let reason = self.reason?;
        Some(SuggestionRecord {
            name: name.to_string(),
            reason: reason.to_string(),
            confidence: parse_confidence(self.confidence),
            categories: parse_categories(self.categories),
            price_range: parse_price(self.price),
            link: parse_link(self.link),
        })
    }
}

/// Decode the line-tagged completion format.
///
/// Grammar: a line containing `PRODUCT_<i>_<TAG>: <value>` with `i` in `1..=3` sets
/// `TAG` of record `i` unless already set. Anything before the tag (bullets, numbering,
/// emphasis) is ignored. Values are single-line and trimmed of whitespace and `*`; empty values
/// count as absent. Records without both NAME and REASON are dropped. Defaults:
/// CONFIDENCE 0.7 (clamped to `[0.6, 1.0]` when present), CATEGORIES `["General"]`,
/// PRICE `medium`, LINK empty (the literal `empty` also means empty).
pub fn parse_suggestions(text: &str) -> Vec<SuggestionRecord> {
    let mut fields: Vec<TaggedFields<'_>> =
        (0..SUGGESTION_COUNT).map(|_| TaggedFields::default()).collect();

    for line in text.lines() {
        let Some(caps) = TAG_LINE_RE.captures(line) else {
            continue;
        };
        let Some(index) = caps[1]
            .parse::<usize>()
            .ok()
            .filter(|i| (1..=SUGGESTION_COUNT).contains(i))
        else {
            continue;
        };
        // Markdown emphasis around the tag leaves `**` on both sides of the value.
        let value = caps
            .get(3)
            .map(|m| m.as_str().trim_matches(|c: char| c == '*' || c.is_whitespace()))
            .unwrap_or_default();
        if value.is_empty() {
            continue;
        }
        if let Some(slot) = fields[index - 1].slot(&caps[2]) {
            if slot.is_none() {
                *slot = Some(value);
            }
        }
    }

    fields.into_iter().filter_map(TaggedFields::into_record).collect()
}

fn parse_confidence(value: Option<&str>) -> f64 {
    value
        .and_then(|v| CONFIDENCE_RE.find(v))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE))
        .unwrap_or(DEFAULT_CONFIDENCE)
}

fn parse_categories(value: Option<&str>) -> Vec<String> {
    match value {
        Some(v) => v.split(',').map(|c| c.trim().to_string()).collect(),
        None => vec![DEFAULT_CATEGORY.to_string()],
    }
}

fn parse_price(value: Option<&str>) -> PriceRange {
    value
        .and_then(|v| PRICE_RE.captures(v))
        .and_then(|c| c[1].parse::<PriceRange>().ok())
        .unwrap_or_default()
}

fn parse_link(value: Option<&str>) -> String {
    match value {
        Some(LINK_PLACEHOLDER) | None => String::new(),
        Some(v) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use advisor_common::openai::OpenAiClientConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const WELL_FORMED: &str = "\
PRODUCT_1_NAME: Sony WF-1000XM5
PRODUCT_1_REASON: Best noise cancelling in the threads.
PRODUCT_1_CONFIDENCE: 0.92
PRODUCT_1_CATEGORIES: Audio, Earbuds ,Wireless
PRODUCT_1_PRICE: high
PRODUCT_1_LINK: https://example.com/sony

PRODUCT_2_NAME: Soundpeats Air4
PRODUCT_2_REASON: Budget pick recommended repeatedly.
PRODUCT_2_CONFIDENCE: 1.7
PRODUCT_2_CATEGORIES: Audio
PRODUCT_2_PRICE: low
PRODUCT_2_LINK: empty

PRODUCT_3_NAME: Jabra Elite 8
PRODUCT_3_REASON: Durable for workouts.
PRODUCT_3_CONFIDENCE: 0.2
PRODUCT_3_CATEGORIES: Sport
PRODUCT_3_PRICE: medium
PRODUCT_3_LINK:
";

    #[test]
    fn parses_three_records_with_clamped_confidence() {
        let records = parse_suggestions(WELL_FORMED);
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].name, "Sony WF-1000XM5");
        assert_eq!(records[0].confidence, 0.92);
        assert_eq!(records[0].categories, vec!["Audio", "Earbuds", "Wireless"]);
        assert_eq!(records[0].price_range, PriceRange::High);
        assert_eq!(records[0].link, "https://example.com/sony");

        assert_eq!(records[1].confidence, 1.0);
        assert_eq!(records[1].price_range, PriceRange::Low);
        assert_eq!(records[1].link, "");

        assert_eq!(records[2].confidence, 0.6);
        assert_eq!(records[2].link, "");
    }

    #[test]
    fn missing_name_tag_drops_only_that_record() {
        let text = WELL_FORMED.replace("PRODUCT_3_NAME: Jabra Elite 8\n", "");
        let records = parse_suggestions(&text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "Soundpeats Air4");
    }

    #[test]
    fn optional_fields_fall_back_to_defaults() {
        let text = "PRODUCT_1_NAME: Thing\nPRODUCT_1_REASON: Because\nPRODUCT_1_CONFIDENCE: high\nPRODUCT_1_PRICE: cheap\n";
        let records = parse_suggestions(text);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(r.categories, vec![DEFAULT_CATEGORY]);
        assert_eq!(r.price_range, PriceRange::Medium);
        assert_eq!(r.link, "");
    }

    #[test]
    fn empty_values_do_not_borrow_the_next_line() {
        let text = "PRODUCT_1_NAME: A\nPRODUCT_1_REASON: B\nPRODUCT_1_LINK:\nPRODUCT_2_NAME: C\nPRODUCT_2_REASON: D\n";
        let records = parse_suggestions(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].link, "");
        assert_eq!(records[1].name, "C");
    }

    #[test]
    fn categories_keep_duplicates_and_first_tag_wins() {
        let text = "  PRODUCT_2_NAME: First\nPRODUCT_2_NAME: Second\nPRODUCT_2_REASON: r\nPRODUCT_2_CATEGORIES: A, A,B\nPRODUCT_4_NAME: ignored\nPRODUCT_4_REASON: ignored\n";
        let records = parse_suggestions(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "First");
        assert_eq!(records[0].categories, vec!["A", "A", "B"]);
    }

    #[test]
    fn decorated_tag_lines_are_parsed() {
        for prefix in ["**", "- ", "1. ", "* **"] {
            let text = format!(
                "{prefix}PRODUCT_1_NAME:** Sony WH-1000XM5\n\
                 {prefix}PRODUCT_1_REASON: Good\n\
                 {prefix}PRODUCT_1_PRICE:** high\n"
            );
            let records = parse_suggestions(&text);
            assert_eq!(records.len(), 1, "prefix {prefix:?}");
            assert_eq!(records[0].name, "Sony WH-1000XM5");
            assert_eq!(records[0].reason, "Good");
            assert_eq!(records[0].price_range, PriceRange::High);
        }
    }

    #[test]
    fn tag_must_stand_alone() {
        let text = "XPRODUCT_1_NAME: nope\nPRODUCT_1_REASON: r\n";
        assert!(parse_suggestions(text).is_empty());
    }

    #[test]
    fn confidence_uses_leading_number() {
        assert_eq!(parse_confidence(Some("0.85.")), 0.85);
        assert_eq!(parse_confidence(Some("0.9.1")), 0.9);
        assert_eq!(parse_confidence(Some(".75")), 0.75);
        assert_eq!(parse_confidence(Some("1.")), 1.0);
        assert_eq!(parse_confidence(Some("0.85 (high)")), 0.85);
        assert_eq!(parse_confidence(Some(".")), DEFAULT_CONFIDENCE);
        assert_eq!(parse_confidence(Some("[0.9]")), DEFAULT_CONFIDENCE);
        assert_eq!(parse_confidence(None), DEFAULT_CONFIDENCE);
    }

    #[test]
    fn prompts_carry_query_language_and_content() {
        let system = system_prompt("wireless earbuds", "hu");
        assert!(system.contains("searching for \"wireless earbuds\""));
        assert!(system.contains("Respond in hu language"));
        for i in 1..=3 {
            assert!(system.contains(&format!("PRODUCT_{i}_NAME: [Product name]")));
            assert!(system.contains(&format!("PRODUCT_{i}_LINK: [URL if available, or empty]")));
        }
        assert!(system.contains("[Number between 0.6 and 1.0]"));

        let user = user_prompt("earbuds", "Title: X");
        assert_eq!(
            user,
            "Reddit data analysis for \"earbuds\":\n\nTitle: X\n\nProvide 3 product recommendations based on this data."
        );
    }

    fn extractor(base_url: &str) -> SuggestionExtractor {
        let client = OpenAiClient::new(OpenAiClientConfig {
            base_url: base_url.to_string(),
            api_key: Some("sk-test".to_string()),
            default_timeout: Duration::from_secs(5),
            max_error_body_bytes: 1024,
        })
        .unwrap();
        SuggestionExtractor::new(Arc::new(client), CompletionSettings::default())
    }

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "gen-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
        })
    }

    #[tokio::test]
    async fn extract_sends_fixed_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(WELL_FORMED)))
            .expect(1)
            .mount(&server)
            .await;

        let records = extractor(&server.uri())
            .extract("earbuds", "content block", "en")
            .await;
        assert_eq!(records.len(), 3);

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "openai/gpt-oss-20b:free");
        assert_eq!(body["max_tokens"], 1172);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("content block"));
        assert!(body.get("stream").is_none());
    }

    #[tokio::test]
    async fn unparseable_completion_yields_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("I cannot help.")))
            .mount(&server)
            .await;

        let records = extractor(&server.uri()).extract("q", "c", "en").await;
        assert_eq!(records, vec![sentinel_record()]);
        assert_eq!(records[0].confidence, 0.1);
        assert_eq!(records[0].categories, vec!["Error"]);
    }

    #[tokio::test]
    async fn completion_failure_yields_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(1)
            .mount(&server)
            .await;

        let records = extractor(&server.uri()).extract("q", "c", "en").await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Service Temporarily Unavailable");
    }
}
