//! `web_search` — the optional external web search tool (spec §2 item 4,
//! §4 "Tools: ... optional web search").
//!
//! Out of scope per spec §1 is the physical search backend; this adapter
//! only shapes the request/response around whatever HTTP search API the
//! deployment points it at (a Tavily/Brave/SerpAPI-shaped JSON endpoint:
//! `{"results":[{"title","url","content"}, ...]}`).

use async_trait::async_trait;
use serde::Deserialize;

use axon_tool::registry::{ToolDyn, ToolError};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
struct SearchResultItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Calls an external web-search HTTP endpoint and formats the top results
/// as plain text for the sub-agent's tool surface.
pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    max_results: usize,
}

impl WebSearchTool {
    /// Build the tool against `endpoint` (a full URL accepting `{"query",
    /// "max_results"}` POST bodies), optionally authenticated with
    /// `api_key`.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, max_results: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            max_results: max_results.max(1),
        }
    }

    fn format_results(items: &[SearchResultItem]) -> String {
        if items.is_empty() {
            return "No web results found.".to_string();
        }
        items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {} ({})\n{}", i + 1, item.title.trim(), item.url.trim(), item.content.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl ToolDyn for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the public web. Input: a natural-language query. Use only when the knowledge graph \
         and indexed chunks don't cover the question, e.g. very recent events."
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("query text must not be empty".into()));
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "query": query, "max_results": self.max_results }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                ToolError::Transient(e.to_string())
            } else {
                ToolError::ExecutionFailed(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(ToolError::ExecutionFailed(format!("web search endpoint returned {}", response.status())));
        }

        let parsed: SearchResponse =
            response.json().await.map_err(|e| ToolError::ExecutionFailed(format!("invalid response: {e}")))?;
        let mut items = parsed.results;
        items.truncate(self.max_results);
        Ok(Self::format_results(&items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let tool = WebSearchTool::new("http://localhost:0/search", None, 5);
        assert!(matches!(tool.call("   ").await, Err(ToolError::InvalidInput(_))));
    }

    #[test]
    fn format_results_handles_empty() {
        assert_eq!(WebSearchTool::format_results(&[]), "No web results found.");
    }

    #[test]
    fn format_results_includes_title_and_url() {
        let items = vec![SearchResultItem {
            title: "Breadth-first search".into(),
            url: "https://example.com/bfs".into(),
            content: "BFS explores level by level.".into(),
        }];
        let out = WebSearchTool::format_results(&items);
        assert!(out.contains("Breadth-first search"));
        assert!(out.contains("https://example.com/bfs"));
        assert!(out.contains("BFS explores level by level."));
    }
}
