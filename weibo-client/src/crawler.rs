use crate::api::WeiboApi;
use crate::cards::{Card, RawCard};
use crate::timeline::{TimelineQuery, UserTimeline};
use crawler_core::{parse_weibo_time, AppConfig, CoreError, Post, PostSink, TimeWindow};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub keyword: String,
    /// Stop once more than this many records have been collected
    pub limit: usize,
    pub window: TimeWindow,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>, limit: usize) -> Self {
        Self {
            keyword: keyword.into(),
            limit,
            window: TimeWindow::unbounded(),
        }
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back without cards
    Exhausted,
    /// More than `limit` records were collected
    LimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    pub keyword: String,
    pub pages: u32,
    pub records: usize,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSummary {
    pub uid: u64,
    pub pages: u32,
    pub records: usize,
}

/// Drives searches and timeline crawls over one injected API client.
pub struct WeiboCrawler<A> {
    api: A,
    page_delay: Duration,
}

impl<A: WeiboApi> WeiboCrawler<A> {
    pub fn new(api: A, config: &AppConfig) -> Self {
        Self::with_page_delay(api, config.page_delay())
    }

    pub fn with_page_delay(api: A, page_delay: Duration) -> Self {
        Self { api, page_delay }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Walk search pages for one keyword, exporting the accumulated records
    /// to `sink` after every page.
    ///
    /// Stops on the first page without cards, or once the accumulated count
    /// exceeds `limit`; the final page is always kept whole, so the result
    /// may exceed `limit` by up to one page. Any error aborts the crawl and
    /// leaves the last successful export in place.
    pub async fn search<S: PostSink + ?Sized>(
        &self,
        query: &SearchQuery,
        sink: &mut S,
    ) -> Result<SearchSummary, CoreError> {
        if query.window.is_unbounded() {
            info!("Searching '{}' (limit {})", query.keyword, query.limit);
        } else {
            info!(
                "Searching '{}' (limit {}, window {:?})",
                query.keyword, query.limit, query.window
            );
        }

        let mut posts: Vec<Post> = Vec::new();
        let mut page = 0u32;

        let stop_reason = loop {
            page += 1;
            tokio::time::sleep(self.page_delay).await;

            let data = self.api.search_page(&query.keyword, page).await?;
            if data.cards.is_empty() {
                debug!("Page {} for '{}' has no cards", page, query.keyword);
                break StopReason::Exhausted;
            }

            let card_count = data.cards.len();
            let before = posts.len();
            for raw in data.cards {
                if let Some(post) = self.normalize_card(raw, &query.window).await? {
                    posts.push(post);
                }
            }

            info!(
                "'{}' page {}: {} of {} cards kept, {} total",
                query.keyword,
                page,
                posts.len() - before,
                card_count,
                posts.len()
            );

            if !posts.is_empty() {
                sink.write_posts(&query.keyword, &posts)?;
            }

            if posts.len() > query.limit {
                break StopReason::LimitReached;
            }
        };

        info!(
            "Finished '{}' after {} pages with {} records ({:?})",
            query.keyword,
            page,
            posts.len(),
            stop_reason
        );

        Ok(SearchSummary {
            keyword: query.keyword.clone(),
            pages: page,
            records: posts.len(),
            stop_reason,
        })
    }

    /// Turn one raw card into a record, or `None` when the card carries no
    /// post or the post falls outside `window`. Truncated posts get their
    /// full text fetched; out-of-window posts never trigger that request.
    pub async fn normalize_card(
        &self,
        raw: RawCard,
        window: &TimeWindow,
    ) -> Result<Option<Post>, CoreError> {
        let Some(mblog) = Card::resolve(raw)?.into_mblog() else {
            return Ok(None);
        };

        let publish_time = parse_weibo_time(&mblog.created_at)?;
        if !window.contains(&publish_time) {
            debug!("Post {} at {} is outside the window", mblog.id, publish_time);
            return Ok(None);
        }

        let full_text = if mblog.is_long_text {
            debug!("Expanding long text of post {}", mblog.id);
            Some(self.api.long_text(&mblog.id).await?)
        } else {
            None
        };

        mblog.into_post(full_text).map(Some)
    }

    pub fn user_timeline(&self, query: TimelineQuery) -> UserTimeline<'_, A> {
        UserTimeline::new(&self.api, query, self.page_delay)
    }

    /// Crawl a user timeline to the end (or `max_pages`), exporting the
    /// accumulated posts after every page.
    pub async fn crawl_user<S: PostSink + ?Sized>(
        &self,
        query: TimelineQuery,
        sink: &mut S,
    ) -> Result<TimelineSummary, CoreError> {
        let mut timeline = self.user_timeline(query);
        let uid = timeline.uid();
        info!("Crawling timeline of {}", uid);

        let mut posts = Vec::new();

        while let Some(batch) = timeline.next_batch().await? {
            posts.extend(batch);
            if !posts.is_empty() {
                sink.write_timeline(uid, &posts)?;
            }
        }

        info!(
            "Finished timeline of {} after {} pages with {} records",
            uid,
            timeline.pages_fetched(),
            posts.len()
        );

        Ok(TimelineSummary {
            uid,
            pages: timeline.pages_fetched(),
            records: posts.len(),
        })
    }
}
