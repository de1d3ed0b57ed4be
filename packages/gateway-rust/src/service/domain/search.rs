//! Reference collaborators for the `search` service.
//!
//! Searches an in-memory document list. Useful as a wiring example and as a
//! fixture for end-to-end tests of the entrance.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use mse_core::{
    service_ids, BaseResponse, Converter, ExecutionContext, GatewayResponse, Interceptor,
    ProxyInvoker, ResponseContext, Validator,
};
use serde::{Deserialize, Serialize};

use crate::service::entrance::GatewayEntrance;
use crate::service::registry::{RegistryBuilder, ServiceRegistry};

/// Upper bound on page size applied by [`SearchInterceptor`] unless configured otherwise.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 50;

pub type SearchRegistry = ServiceRegistry<SearchRequest, SearchResponse, SearchQuery, SearchHits>;
pub type SearchEntrance = GatewayEntrance<SearchRequest, SearchResponse, SearchQuery, SearchHits>;
pub type SearchRegistryBuilder =
    RegistryBuilder<SearchRequest, SearchResponse, SearchQuery, SearchHits>;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Inbound search call. Pages are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    10
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 0,
            page_size: default_page_size(),
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub score: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
    #[serde(default)]
    pub total: usize,
}

impl GatewayResponse for SearchResponse {
    fn is_success(&self) -> bool {
        self.base.is_success()
    }

    fn message(&self) -> Option<&str> {
        self.base.message()
    }

    fn set_success(&mut self, success: bool) {
        self.base.set_success(success);
    }

    fn set_message(&mut self, message: String) {
        self.base.set_message(message);
    }
}

// ---------------------------------------------------------------------------
// Internal value objects
// ---------------------------------------------------------------------------

/// Normalized query handed to the invoker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Lowercased, whitespace-split query terms.
    pub terms: Vec<String>,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHits {
    pub hits: Vec<SearchHit>,
    /// Matches before pagination.
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: String,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

pub struct SearchValidator;

#[async_trait]
impl Validator<SearchRequest> for SearchValidator {
    async fn validate(&self, request: &SearchRequest) -> anyhow::Result<()> {
        anyhow::ensure!(!request.query.trim().is_empty(), "query must not be blank");
        anyhow::ensure!(request.page_size > 0, "page_size must be positive");
        Ok(())
    }
}

pub struct SearchConverter;

#[async_trait]
impl Converter<SearchRequest, SearchResponse, SearchQuery, SearchHits> for SearchConverter {
    async fn request_to_vo(&self, request: &SearchRequest) -> anyhow::Result<SearchQuery> {
        let limit = usize::try_from(request.page_size).context("page_size out of range")?;
        let offset = usize::try_from(request.page)
            .ok()
            .and_then(|page| page.checked_mul(limit))
            .context("page offset out of range")?;
        Ok(SearchQuery {
            terms: request
                .query
                .split_whitespace()
                .map(str::to_lowercase)
                .collect(),
            offset,
            limit,
        })
    }

    async fn vo_to_response(
        &self,
        response: ResponseContext<SearchHits>,
    ) -> anyhow::Result<SearchResponse> {
        if !response.is_success() {
            anyhow::bail!(
                "search backend answered {}: {}",
                response.code.as_deref().unwrap_or("-"),
                response.message.as_deref().unwrap_or("-")
            );
        }
        let data = response
            .into_data()
            .context("search backend answered without data")?;
        Ok(SearchResponse {
            base: BaseResponse::ok(),
            hits: data.hits,
            total: data.total,
        })
    }
}

/// Clamps the page size to a configured maximum.
pub struct SearchInterceptor {
    max_page_size: usize,
}

impl SearchInterceptor {
    #[must_use]
    pub fn new(max_page_size: usize) -> Self {
        Self { max_page_size }
    }
}

impl Default for SearchInterceptor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGE_SIZE)
    }
}

#[async_trait]
impl Interceptor<SearchQuery, SearchHits> for SearchInterceptor {
    async fn intercept(
        &self,
        ctx: &ExecutionContext<SearchQuery, SearchHits>,
    ) -> anyhow::Result<SearchQuery> {
        let mut query = ctx
            .request()
            .cloned()
            .context("no search query in context")?;
        query.limit = query.limit.min(self.max_page_size);
        Ok(query)
    }
}

/// Scores documents by how often the query terms occur in title and body.
/// A document must contain every term to match.
pub struct InMemorySearchInvoker {
    documents: Arc<[Document]>,
}

impl InMemorySearchInvoker {
    #[must_use]
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: documents.into(),
        }
    }

    fn score(document: &Document, terms: &[String]) -> Option<u32> {
        let title = document.title.to_lowercase();
        let body = document.body.to_lowercase();
        let mut score = 0_u32;
        for term in terms {
            let hits = title.matches(term.as_str()).count() + body.matches(term.as_str()).count();
            if hits == 0 {
                return None;
            }
            score = score.saturating_add(u32::try_from(hits).unwrap_or(u32::MAX));
        }
        Some(score)
    }
}

#[async_trait]
impl ProxyInvoker<SearchQuery, SearchHits> for InMemorySearchInvoker {
    async fn invoke(&self, request: &SearchQuery) -> anyhow::Result<ResponseContext<SearchHits>> {
        let mut matches: Vec<SearchHit> = self
            .documents
            .iter()
            .filter_map(|doc| {
                Self::score(doc, &request.terms).map(|score| SearchHit {
                    id: doc.id.clone(),
                    title: doc.title.clone(),
                    score,
                })
            })
            .collect();
        matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

        let total = matches.len();
        let hits = matches
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();
        Ok(ResponseContext::ok(SearchHits { hits, total }))
    }
}

/// Registers the full search collaborator set under `service_ids::SEARCH`.
pub fn register_search(builder: &mut SearchRegistryBuilder, documents: Vec<Document>) {
    builder.register_set(
        service_ids::SEARCH,
        SearchValidator,
        SearchConverter,
        SearchInterceptor::default(),
        InMemorySearchInvoker::new(documents),
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
