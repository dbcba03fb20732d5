//! Pagination strategies over the hosting API.
//!
//! Two strategies are supported: probing the `Link` header of a single-item page to
//! learn a total count without walking, and walking pages by number until a short
//! page comes back. Pages are always requested one at a time in increasing order.

use super::client::SearchResults;
use crate::Result;
use crate::facts::resilient_http::{Executor, RequestOutcome};
use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

const LOG_TARGET: &str = "   hosting";

/// Page size used when probing. The `rel="last"` page number only equals the item
/// count when every page holds exactly one item.
const PROBE_PAGE_SIZE: u8 = 1;

/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: u8 = 100;

/// Where the items of a page live in the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// The body is a JSON array of items.
    Array,

    /// The body is a search result whose `items` field holds the array.
    SearchItems,
}

/// Result of a link-relation probe.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    /// Total number of items, when it could be determined.
    pub total: Option<u64>,

    /// The first item of the listing, if any.
    pub first: Option<Value>,
}

#[derive(Debug)]
pub struct Paginator<'a> {
    executor: &'a Executor,
    page_size: u8,
}

impl<'a> Paginator<'a> {
    #[must_use]
    pub fn new(executor: &'a Executor, page_size: u8) -> Self {
        Self {
            executor,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    #[must_use]
    pub const fn page_size(&self) -> u8 {
        self.page_size
    }

    /// Learn the total item count of a listing from a single request.
    ///
    /// Returns `Ok(None)` when the request did not succeed. Errors are returned only
    /// on cancellation.
    pub async fn probe(&self, url: &str, query: &[(&str, String)]) -> Result<Option<Probe>> {
        let Some(outcome) = self.fetch_page(url, query, PROBE_PAGE_SIZE, 1).await? else {
            return Ok(None);
        };

        let last_page = parse_last_page(&outcome.headers);
        let items = items_of(outcome.body, Listing::Array);

        Ok(Some(Probe {
            total: last_page.or(Some(items.len() as u64)),
            first: items.into_iter().next(),
        }))
    }

    /// Walk a listing page by page and collect every item that deserializes as `T`.
    ///
    /// The walk stops at the first empty or short page, after `max_pages` pages, or at
    /// the first failed page, in which case the items gathered so far are returned.
    /// Errors are returned only on cancellation.
    pub async fn walk<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        listing: Listing,
        max_pages: Option<u32>,
    ) -> Result<Vec<T>> {
        let mut collected = Vec::new();
        let mut page = 1u32;

        loop {
            let Some(outcome) = self.fetch_page(url, query, self.page_size, page).await? else {
                log::debug!(target: LOG_TARGET, "stopping walk of {url} at page {page} after {} item(s)", collected.len());
                break;
            };

            let items = items_of(outcome.body, listing);
            let fetched = items.len();

            collected.extend(items.into_iter().filter_map(|item| {
                serde_json::from_value::<T>(item)
                    .inspect_err(|e| log::debug!(target: LOG_TARGET, "skipping malformed item from {url}: {e}"))
                    .ok()
            }));

            if fetched < usize::from(self.page_size) {
                break;
            }

            if max_pages.is_some_and(|max| page >= max) {
                log::debug!(target: LOG_TARGET, "reached page limit ({page}) for {url}, stopping after {} item(s)", collected.len());
                break;
            }

            page += 1;
        }

        Ok(collected)
    }

    /// Read the `total_count` of a search query without fetching its items.
    ///
    /// Returns `Ok(None)` when the search failed. Errors are returned only on cancellation.
    pub async fn search_total(&self, url: &str, search: &str) -> Result<Option<u64>> {
        let query = [("q", search.to_string())];

        let Some(outcome) = self.fetch_page(url, &query, PROBE_PAGE_SIZE, 1).await? else {
            return Ok(None);
        };

        Ok(serde_json::from_value::<SearchResults>(outcome.body)
            .ok()
            .and_then(|results| results.total_count))
    }

    /// Fetch one page, yielding `None` for any outcome other than a 2xx response.
    async fn fetch_page(&self, url: &str, query: &[(&str, String)], per_page: u8, page: u32) -> Result<Option<RequestOutcome>> {
        let mut params = query.to_vec();
        params.push(("per_page", per_page.to_string()));
        params.push(("page", page.to_string()));

        match self.executor.execute(url, &params).await {
            Ok(outcome) if outcome.is_success() => Ok(Some(outcome)),
            Ok(outcome) => {
                log::debug!(target: LOG_TARGET, "request to {url} (page {page}) returned {}", outcome.status);
                Ok(None)
            }
            Err(e) if self.executor.cancel_token().is_cancelled() => Err(e),
            Err(e) => {
                log::debug!(target: LOG_TARGET, "request to {url} (page {page}) failed: {e:#}");
                Ok(None)
            }
        }
    }
}

/// Extract the item array from a page body.
fn items_of(body: Value, listing: Listing) -> Vec<Value> {
    let array = match (listing, body) {
        (Listing::Array, array) => array,
        (Listing::SearchItems, Value::Object(mut map)) => map.remove("items").unwrap_or(Value::Null),
        (Listing::SearchItems, _) => Value::Null,
    };

    match array {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Extract the page number of the `rel="last"` link from a `Link` header.
fn parse_last_page(headers: &HeaderMap) -> Option<u64> {
    let link = headers.get(LINK)?.to_str().ok()?;

    link.split(',').find_map(|part| {
        let part = part.trim();
        if !part.contains(r#"rel="last""#) {
            return None;
        }

        let start = part.find('<')? + 1;
        let end = part.find('>')?;
        let target = Url::parse(part.get(start..end)?).ok()?;

        target
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse::<u64>().ok())
    })
}
