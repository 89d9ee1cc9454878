// src/mcp/tools/search.rs

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::info;

use crate::mcp::schema::{Field, ToolSchema};
use crate::mcp::tool::{ToolDescriptor, ToolFailure, ToolHandler, ToolOutput, ToolResult};

pub const BRAVE_API_BASE: &str = "https://api.search.brave.com/res/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Web,
    News,
}

impl SearchKind {
    fn path(&self) -> &'static str {
        match self {
            Self::Web => "web/search",
            Self::News => "news/search",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Web => "Search",
            Self::News => "News search",
        }
    }
}

/// Brave Search API access shared by the web and news tools.
#[derive(Clone)]
pub struct BraveSearch {
    http: Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl BraveSearch {
    pub fn new(http: Client, api_key: Option<SecretString>) -> Self {
        Self {
            http,
            api_key,
            base_url: BRAVE_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn search(&self, kind: SearchKind, query: &str, count: u64) -> ToolResult {
        let Some(api_key) = &self.api_key else {
            return Err(ToolFailure::error(
                "Brave Search API key not configured. Please set BRAVE_API_KEY environment variable.",
            )
            .suggestion("Get your API key from https://api-dashboard.search.brave.com/"));
        };

        info!("Running Brave {:?} search", kind);
        match self.fetch(kind, api_key, query, count).await {
            Ok(data) => Ok(ToolOutput::Json(shape_results(kind, query, &data))),
            Err(e) => Err(ToolFailure::error(format!("{} failed: {}", kind.label(), e))
                .with("query", json!(query))
                .suggestion(match kind {
                    SearchKind::Web => {
                        "Try a different search query or check your internet connection."
                    }
                    SearchKind::News => {
                        "Try a different news query or check your internet connection."
                    }
                })),
        }
    }

    async fn fetch(
        &self,
        kind: SearchKind,
        api_key: &SecretString,
        query: &str,
        count: u64,
    ) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, kind.path());
        let count = count.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[("q", query), ("count", count.as_str())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            let api = match kind {
                SearchKind::Web => "Brave Search API",
                SearchKind::News => "Brave News API",
            };
            return Err(anyhow!("{} error: {}", api, response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}

fn shape_results(kind: SearchKind, query: &str, data: &Value) -> Value {
    let raw = match kind {
        SearchKind::Web => data.pointer("/web/results"),
        SearchKind::News => data.get("results"),
    }
    .and_then(Value::as_array)
    .cloned()
    .unwrap_or_default();

    let items: Vec<Value> = raw
        .iter()
        .map(|r| match kind {
            SearchKind::Web => json!({
                "title": r.get("title"),
                "url": r.get("url"),
                "description": r.get("description"),
            }),
            SearchKind::News => json!({
                "title": r.get("title"),
                "url": r.get("url"),
                "description": r.get("description"),
                "published_date": r.get("age"),
            }),
        })
        .collect();

    let key = match kind {
        SearchKind::Web => "results",
        SearchKind::News => "articles",
    };
    let mut out = json!({
        "query": query,
        "total_results": items.len(),
    });
    out[key] = Value::Array(items);
    out
}

struct SearchHandler {
    search: BraveSearch,
    kind: SearchKind,
}

#[async_trait]
impl ToolHandler for SearchHandler {
    async fn call(&self, args: Value) -> ToolResult {
        let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
        let count = args.get("count").and_then(Value::as_u64).unwrap_or(10);
        self.search.search(self.kind, query, count).await
    }
}

fn schema(query_desc: &str, count_desc: &str) -> ToolSchema {
    ToolSchema::object()
        .field(Field::string("query").describe(query_desc))
        .field(
            Field::integer("count")
                .min(1.0)
                .max(20.0)
                .default(json!(10))
                .describe(count_desc),
        )
}

pub fn descriptors(search: BraveSearch) -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "brave_search",
            "Search the web using Brave Search API for current information",
            schema("Search query", "Number of results"),
            Arc::new(SearchHandler {
                search: search.clone(),
                kind: SearchKind::Web,
            }),
        )
        .with_title("Brave Web Search"),
        ToolDescriptor::new(
            "brave_news_search",
            "Search for recent news articles using Brave Search",
            schema("News search query", "Number of articles"),
            Arc::new(SearchHandler {
                search,
                kind: SearchKind::News,
            }),
        )
        .with_title("Brave News Search"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        // An unroutable base URL would surface as "Search failed" if a request were made.
        let search = BraveSearch::new(Client::new(), None).with_base_url("http://127.0.0.1:9");
        let err = search.search(SearchKind::Web, "somnia", 5).await.unwrap_err();
        assert!(err.text().contains("not configured"));
        assert!(err.get("suggestion").is_some());
        assert!(err.get("query").is_none());
    }

    #[test]
    fn shapes_web_results() {
        let data = json!({ "web": { "results": [
            { "title": "Somnia", "url": "https://somnia.network", "description": "L1", "extra": 1 }
        ]}});
        let out = shape_results(SearchKind::Web, "somnia", &data);
        assert_eq!(out["total_results"], 1);
        assert_eq!(out["results"][0]["url"], "https://somnia.network");
        assert!(out["results"][0].get("extra").is_none());
    }

    #[test]
    fn shapes_news_results_with_dates() {
        let data = json!({ "results": [{ "title": "t", "url": "u", "description": "d", "age": "2 hours ago" }] });
        let out = shape_results(SearchKind::News, "q", &data);
        assert_eq!(out["articles"][0]["published_date"], "2 hours ago");
    }

    #[test]
    fn empty_payloads_yield_zero_results() {
        let out = shape_results(SearchKind::Web, "q", &json!({}));
        assert_eq!(out["total_results"], 0);
        assert_eq!(out["results"], json!([]));
    }
}
