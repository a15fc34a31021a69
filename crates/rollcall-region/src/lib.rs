//! Region adapter contract for Rollcall.
//!
//! Every jurisdiction's roster site is wrapped in a `RegionAdapter`: a
//! stateless plug-in that knows how to fetch and parse that one site's
//! pages. The crawl engine drives adapters through a fixed method set and
//! never sees raw HTML itself; adapters never enqueue work or touch
//! storage. Parsing failures are classified as transient (network) or
//! permanent (page shape) so the engine can decide between retry and drop.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod registry;
pub mod types;

pub use adapter::RegionAdapter;
pub use error::{ErrorKind, RegionError, Result};
pub use fetch::FetchClient;
pub use registry::RegionRegistry;
pub use types::{
    DetailOutcome, DetailPage, DetailRef, DisambiguationEntry, FormTokens, Offense, ResultsListing,
    ResultsPage, SentenceDuration, StructuredRecord,
};
