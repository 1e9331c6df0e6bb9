//! Indexer (subgraph) client (A4, §6).
//!
//! Paginated GraphQL POST client for order events. The teacher has no
//! subgraph client of its own; the pagination/http-client idiom here is
//! enriched from `cowprotocol-services`' orderbook-indexing conventions.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

/// Page size for subgraph pagination; continuation happens while a page
/// comes back full.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SgEvent {
    #[serde(rename = "__typename")]
    pub typename: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SgTransaction {
    pub timestamp: String,
    pub events: Vec<SgEvent>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<TransactionsData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct TransactionsData {
    transactions: Vec<SgTransaction>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Collaborator supplying order events (`AddOrder`/`RemoveOrder`) and
/// general clearing-activity transactions, for registry ingestion and
/// the downtime report.
#[async_trait]
pub trait OrderEventSource: Send + Sync {
    async fn fetch_transactions_page(&self, skip: usize, page_size: usize) -> SolverResult<Vec<SgTransaction>>;

    /// Fetch every page starting at `skip = 0`, following while a page
    /// comes back full (`DEFAULT_PAGE_SIZE` increments).
    async fn fetch_all_transactions(&self) -> SolverResult<Vec<SgTransaction>> {
        let mut all = Vec::new();
        let mut skip = 0;
        loop {
            let page = self.fetch_transactions_page(skip, DEFAULT_PAGE_SIZE).await?;
            let page_len = page.len();
            all.extend(page);
            if page_len < DEFAULT_PAGE_SIZE {
                break;
            }
            skip += DEFAULT_PAGE_SIZE;
        }
        Ok(all)
    }
}

/// HTTP GraphQL client against a deployed subgraph endpoint.
pub struct SubgraphClient {
    client: reqwest::Client,
    url: String,
}

impl SubgraphClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    fn query(skip: usize, page_size: usize) -> String {
        format!(
            "{{ transactions(first: {page_size}, skip: {skip}, orderBy: timestamp, orderDirection: asc) {{ \
             timestamp events {{ __typename }} }} }}"
        )
    }
}

#[async_trait]
impl OrderEventSource for SubgraphClient {
    async fn fetch_transactions_page(&self, skip: usize, page_size: usize) -> SolverResult<Vec<SgTransaction>> {
        let body = serde_json::json!({ "query": Self::query(skip, page_size) });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SolverError::fetch(e.to_string()))?;

        let parsed: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| SolverError::decode(e.to_string()))?;

        if let Some(errors) = parsed.errors {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(SolverError::fetch(messages.join("; ")));
        }

        parsed
            .data
            .map(|d| d.transactions)
            .ok_or_else(|| SolverError::fetch("subgraph response had no data"))
    }
}
