//! Client for the Weibo mobile web API and the crawl loops built on it.

pub mod api;
pub mod cards;
pub mod crawler;
mod de;
pub mod retry;
pub mod timeline;


pub use api::{Endpoints, WeiboApi, WeiboApiClient};
pub use cards::{Card, RawCard, SearchData};
pub use crawler::{SearchQuery, SearchSummary, StopReason, TimelineSummary, WeiboCrawler};
pub use retry::{RetryConfig, RetryExecutor};
pub use timeline::{TimelineItem, TimelineQuery, UserTimeline};
