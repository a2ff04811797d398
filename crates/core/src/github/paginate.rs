//! Lazy, restartable page-by-page listing for GitHub collection endpoints.
//!
//! GitHub list endpoints take `per_page` and `page` query parameters. A
//! [`Paginator`] fetches one page per [`next_page`](Paginator::next_page)
//! call and reports exhaustion when the API returns an empty page, so a
//! caller can stop after the first page it cares about without loading an
//! entire organization.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::client::GitHubClient;
use crate::errors::GitHubError;

/// Page size used for every listing (the API maximum).
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Cursor over the pages of one collection endpoint.
pub struct Paginator<T> {
    client: GitHubClient,
    url: String,
    query: Vec<(String, String)>,
    per_page: u32,
    next_page: u32,
    exhausted: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Paginator<T> {
    pub(crate) fn new(
        client: GitHubClient,
        url: String,
        query: Vec<(String, String)>,
        per_page: u32,
    ) -> Self {
        Self {
            client,
            url,
            query,
            per_page,
            next_page: 1,
            exhausted: false,
            _item: PhantomData,
        }
    }

    /// Fetch the next page. Returns `Ok(None)` once an empty page was seen.
    ///
    /// On error the cursor does not advance, so calling again re-requests the
    /// same page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>, GitHubError> {
        if self.exhausted {
            return Ok(None);
        }
        let items: Vec<T> = self
            .client
            .get_page(&self.url, &self.query, self.per_page, self.next_page)
            .await?;
        if items.is_empty() {
            debug!(url = %self.url, page = self.next_page, "reached empty page");
            self.exhausted = true;
            return Ok(None);
        }
        self.next_page += 1;
        Ok(Some(items))
    }

    /// Rewind to the first page.
    pub fn reset(&mut self) {
        self.next_page = 1;
        self.exhausted = false;
    }

    /// The page number the next call will request.
    pub fn current_page(&self) -> u32 {
        self.next_page
    }

    /// Drain every remaining page into one vector.
    pub async fn collect_all(mut self) -> Result<Vec<T>, GitHubError> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        debug!(url = %self.url, count = all.len(), "collected all pages");
        Ok(all)
    }
}
