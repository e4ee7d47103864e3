/// MCP tool surface for the search pipeline.
///
/// Exposes one tool, `search_products`, which runs the same pipeline as
/// `POST /api/search` and returns the same response shape.
use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;

use advisor_common::api::{SearchRequest, SearchResponse};

use crate::orchestrator::SearchOrchestrator;

#[derive(Clone)]
pub struct AdvisorMcpServer {
    orchestrator: SearchOrchestrator,
    tool_router: ToolRouter<AdvisorMcpServer>,
}

impl AdvisorMcpServer {
    pub fn new(orchestrator: SearchOrchestrator) -> Self {
        Self {
            orchestrator,
            tool_router: Self::tool_router(),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchProductsParams {
    /// Product query, e.g. "wireless earbuds".
    query: String,
    /// Two-letter language code for the recommendation text, e.g. "en".
    language: String,
}

#[tool_router]
impl AdvisorMcpServer {
    #[tool(
        description = "Recommend three products for a query based on recent Reddit discussions. \
Returns structured suggestions with confidence, categories, price range and link."
    )]
    async fn search_products(
        &self,
        Parameters(params): Parameters<SearchProductsParams>,
    ) -> Result<Json<SearchResponse>, String> {
        let request = SearchRequest {
            query: params.query,
            language: Some(params.language),
            filters: None,
        };
        self.orchestrator
            .search(&request)
            .await
            .map(Json)
            .map_err(|e| e.public_message())
    }
}

#[tool_handler]
impl ServerHandler for AdvisorMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "product-advisor".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Product advisor. Call search_products with a query and a language code to get \
three recommendations synthesized from Reddit discussions."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::orchestrator::tests::{
        mount_completion, orchestrator, RecordingSink, THREE_PRODUCTS,
    };

    async fn mcp_server(api_key: Option<&str>) -> (AdvisorMcpServer, MockServer) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_completion(&server, THREE_PRODUCTS).await;
        let orch = orchestrator(&server, api_key, Arc::new(RecordingSink::default()));
        (AdvisorMcpServer::new(orch), server)
    }

    fn params(query: &str) -> Parameters<SearchProductsParams> {
        Parameters(SearchProductsParams {
            query: query.to_string(),
            language: "en".to_string(),
        })
    }

    #[tokio::test]
    async fn search_products_runs_the_pipeline() {
        let (mcp, _server) = mcp_server(Some("sk")).await;
        match mcp.search_products(params("earbuds")).await {
            Ok(Json(response)) => {
                assert_eq!(response.total_results, 3);
                assert_eq!(response.suggestions[0].name, "Alpha");
            }
            Err(message) => panic!("unexpected error: {message}"),
        }
    }

    #[tokio::test]
    async fn search_products_reports_public_error_messages() {
        let (mcp, _server) = mcp_server(None).await;
        match mcp.search_products(params("earbuds")).await {
            Ok(_) => panic!("expected missing credential error"),
            Err(message) => assert_eq!(message, "OpenRouter API key not configured"),
        }

        let (mcp, _server) = mcp_server(Some("sk")).await;
        match mcp.search_products(params("   ")).await {
            Ok(_) => panic!("expected validation error"),
            Err(message) => assert_eq!(message, "Query is required"),
        }
    }

    #[test]
    fn search_tool_publishes_output_schema() {
        let tools = AdvisorMcpServer::tool_router().list_all();
        let tool = tools
            .iter()
            .find(|t| t.name == "search_products")
            .unwrap_or_else(|| panic!("missing tool: search_products"));
        assert!(
            tool.output_schema.is_some(),
            "search_products should publish output_schema"
        );
    }
}
