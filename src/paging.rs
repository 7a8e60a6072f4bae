//! Pagination over TeamCity collection responses
//!
//! All collection endpoints share one shape, `{ count?, nextHref?, <key>:
//! [...] }`, where only the collection key name varies per resource. A
//! missing collection key is an empty page, never an error. `count` is
//! advisory only and never terminates a fetch loop; a backing collection can
//! shrink between page requests.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::config::PagingConfig;
use crate::error::Result;
use crate::invoker::Invoker;
use crate::locator::{merge_segments, split_top_level};
use crate::transport::Transport;

/// One immutable page of a collection.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Server-reported total, advisory only.
    pub total_count: Option<usize>,
    /// Opaque next-page link reported by the server, when present.
    pub next_href: Option<String>,
}

/// How to reach the page after a given one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Derived from a full page: the next request's start offset.
    Offset(usize),
    /// Server-provided opaque link.
    Href(String),
}

impl<T> Page<T> {
    /// The continuation marker for this page, if any. A server link wins;
    /// otherwise a full page implies a derived next offset. A short page has
    /// no continuation.
    pub fn continuation(&self, offset: usize, limit: usize) -> Option<Continuation> {
        if let Some(href) = &self.next_href {
            return Some(Continuation::Href(href.clone()));
        }
        if !self.items.is_empty() && self.items.len() >= limit {
            return Some(Continuation::Offset(offset + self.items.len()));
        }
        None
    }
}

/// Parameters of one page request, derived per call and then discarded.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    pub locator: String,
}

impl PageRequest {
    /// Merge paging markers with the caller's filter criteria. The engine's
    /// `count`/`start` come first so a caller-supplied duplicate is dropped
    /// by the merge rules.
    pub fn locator_with_markers(&self) -> String {
        let markers = format!("count:{},start:{}", self.limit, self.offset);
        merge_segments(&markers, &split_top_level(&self.locator))
    }
}

/// A single page plus position indicators, for page-mode callers.
#[derive(Debug, Clone)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// 1-based page number that was fetched.
    pub page: usize,
    pub page_size: usize,
    pub total_count: Option<usize>,
    pub has_more: bool,
    pub has_previous: bool,
}

/// Parse the uniform collection shape into a typed page.
pub fn parse_collection<T: DeserializeOwned>(value: &Value, key: &str) -> Result<Page<T>> {
    let items = match value.get(key) {
        Some(items) => serde_json::from_value::<Vec<T>>(items.clone())?,
        None => Vec::new(),
    };

    let total_count = value
        .get("count")
        .and_then(Value::as_u64)
        .map(|n| n as usize);

    let next_href = value
        .get("nextHref")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Page {
        items,
        total_count,
        next_href,
    })
}

/// Issues page requests through the invoker and assembles results.
pub struct Paginator {
    transport: Arc<dyn Transport>,
    invoker: Arc<Invoker>,
    config: PagingConfig,
}

impl Paginator {
    pub fn new(transport: Arc<dyn Transport>, invoker: Arc<Invoker>, config: PagingConfig) -> Self {
        Self {
            transport,
            invoker,
            config,
        }
    }

    fn clamp_page_size(&self, requested: usize) -> usize {
        if requested == 0 {
            self.config.default_page_size
        } else {
            requested.min(self.config.max_page_size)
        }
    }

    /// Fetch exactly one page. Retry happens inside the invoker, never here.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        locator: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<T>> {
        let request = PageRequest {
            offset,
            limit: self.clamp_page_size(limit),
            locator: locator.to_string(),
        };
        let query = vec![("locator".to_string(), request.locator_with_markers())];

        let value = self
            .invoker
            .invoke(|| self.transport.get(path, &query))
            .await?;

        parse_collection(&value, key)
    }

    /// Fetch with the configured default intent. When `auto_fetch_all` is
    /// set this walks every page like [`fetch_all`](Self::fetch_all);
    /// otherwise it makes exactly one request and returns the first page of
    /// items. Callers with an explicit intent use `fetch_all` or
    /// `fetch_single` directly.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        locator: &str,
    ) -> Result<Vec<T>> {
        if self.config.auto_fetch_all {
            self.fetch_all(path, key, locator, 0, 0).await
        } else {
            let limit = self.config.default_page_size;
            let page = self.fetch_page::<T>(path, key, locator, 0, limit).await?;
            Ok(page.items)
        }
    }

    /// Fetch all pages sequentially, up to `max_pages`, concatenating items
    /// in the order received. The offset advances by the number of items
    /// actually returned so a short final page is tolerated; the loop stops
    /// on a short page, a missing continuation marker, or the page bound,
    /// whichever comes first.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        locator: &str,
        page_size: usize,
        max_pages: usize,
    ) -> Result<Vec<T>> {
        let limit = self.clamp_page_size(page_size);
        let max_pages = if max_pages == 0 {
            self.config.max_pages
        } else {
            max_pages
        };

        let mut all = Vec::new();
        let mut offset = 0usize;

        for _ in 0..max_pages {
            let page = self.fetch_page::<T>(path, key, locator, offset, limit).await?;
            let received = page.items.len();
            let continuation = page.continuation(offset, limit);
            all.extend(page.items);

            match continuation {
                Some(Continuation::Offset(next)) => offset = next,
                // The href is opaque; position is still tracked by offset.
                Some(Continuation::Href(_)) if received >= limit => offset += received,
                _ => break,
            }
        }

        Ok(all)
    }

    /// Fetch a single 1-based page with explicit position indicators; makes
    /// exactly one page request.
    pub async fn fetch_single<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        locator: &str,
        page: usize,
        page_size: usize,
    ) -> Result<PageResult<T>> {
        let page = page.max(1);
        let limit = self.clamp_page_size(page_size);
        let offset = (page - 1) * limit;

        let fetched = self.fetch_page::<T>(path, key, locator, offset, limit).await?;
        let has_more = fetched.continuation(offset, limit).is_some();

        Ok(PageResult {
            has_more,
            has_previous: page > 1,
            page,
            page_size: limit,
            total_count: fetched.total_count,
            items: fetched.items,
        })
    }
}
