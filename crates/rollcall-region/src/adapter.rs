//! The `RegionAdapter` trait — the narrow contract every per-region
//! parsing plug-in implements.

use crate::error::Result;
use crate::fetch::FetchClient;
use crate::types::{
    DetailOutcome, DetailPage, DetailRef, FormTokens, ResultsListing, ResultsPage,
};
use async_trait::async_trait;
use rollcall_core::{NameQuery, RegionId};

/// Stateless per-jurisdiction adapter.
///
/// Adapters transform fetched pages into structured results and nothing
/// else: no storage access, no task enqueueing, no retry policy. All
/// methods may fail with a transient or permanent [`crate::RegionError`];
/// the engine decides what to do about each. Parsing methods are
/// synchronous — only the fetching methods touch the network, and every
/// fetch goes through the engine-supplied [`FetchClient`] so proxy and
/// timeout policy stay centralized.
#[async_trait]
pub trait RegionAdapter: Send + Sync {
    /// The region this adapter crawls.
    fn region(&self) -> &RegionId;

    /// Fetch the search form page and extract the hidden tokens the site
    /// requires to validate the first search POST.
    async fn fetch_search_form(&self, client: &FetchClient) -> Result<FormTokens>;

    /// POST a name search using previously extracted tokens, returning the
    /// first results page.
    async fn submit_search(
        &self,
        client: &FetchClient,
        tokens: &FormTokens,
        query: &NameQuery,
    ) -> Result<ResultsPage>;

    /// Fetch a subsequent results page using the "next page" form state
    /// echoed from the previous results page.
    async fn fetch_results_page(
        &self,
        client: &FetchClient,
        tokens: &FormTokens,
    ) -> Result<ResultsPage>;

    /// Parse one results page into listing rows, the optional next-page
    /// form and a cursor hint.
    fn parse_results_page(&self, page: &ResultsPage) -> Result<ResultsListing>;

    /// Follow one listing row (or disambiguation entry) to its detail page.
    async fn fetch_detail(&self, client: &FetchClient, detail: &DetailRef) -> Result<DetailPage>;

    /// Parse a detail page into either a structured record or a
    /// disambiguation listing.
    fn parse_detail(&self, page: &DetailPage) -> Result<DetailOutcome>;
}
