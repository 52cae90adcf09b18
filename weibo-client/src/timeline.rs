//! Page-by-page stream over one user's own posts.

use crate::api::WeiboApi;
use crate::de;
use crawler_core::{check_keyword_list, parse_weibo_time, CoreError, TimeWindow, TimelinePost};
use futures::stream::{self, Stream};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineResponse {
    pub data: TimelineData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineData {
    pub list: Vec<TimelineItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineItem {
    #[serde(deserialize_with = "de::id_string")]
    pub id: String,
    pub user: TimelineUser,
    pub text_raw: String,
    pub created_at: String,
    #[serde(deserialize_with = "de::count")]
    pub attitudes_count: u64,
    #[serde(deserialize_with = "de::count")]
    pub comments_count: u64,
    #[serde(deserialize_with = "de::count")]
    pub reposts_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineUser {
    #[serde(deserialize_with = "de::id_u64")]
    pub id: u64,
}

impl TimelineItem {
    pub fn into_post(self) -> Result<TimelinePost, CoreError> {
        Ok(TimelinePost {
            user_id: self.user.id,
            publish_time: parse_weibo_time(&self.created_at)?,
            id: self.id,
            text: self.text_raw,
            like_count: self.attitudes_count,
            comment_count: self.comments_count,
            forward_count: self.reposts_count,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TimelineQuery {
    pub uid: u64,
    pub window: TimeWindow,
    /// Keep only posts containing one of these; empty keeps everything
    pub keywords: Vec<String>,
    /// Stop after this many pages even if the user has more
    pub max_pages: Option<u32>,
}

impl TimelineQuery {
    pub fn new(uid: u64) -> Self {
        Self {
            uid,
            window: TimeWindow::unbounded(),
            keywords: Vec::new(),
            max_pages: None,
        }
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

/// Explicit cursor over a user's timeline.
///
/// [`next_batch`](Self::next_batch) yields one filtered batch per page and
/// `None` once the platform returns an empty page or `max_pages` is reached.
/// After that no further requests are made. A failed request leaves the
/// cursor on the same page.
pub struct UserTimeline<'a, A: ?Sized> {
    api: &'a A,
    query: TimelineQuery,
    page_delay: Duration,
    next_page: u32,
    finished: bool,
}

impl<'a, A: WeiboApi + ?Sized> UserTimeline<'a, A> {
    pub fn new(api: &'a A, query: TimelineQuery, page_delay: Duration) -> Self {
        Self {
            api,
            query,
            page_delay,
            next_page: 1,
            finished: false,
        }
    }

    pub fn uid(&self) -> u64 {
        self.query.uid
    }

    pub fn pages_fetched(&self) -> u32 {
        self.next_page - 1
    }

    pub async fn next_batch(&mut self) -> Result<Option<Vec<TimelinePost>>, CoreError> {
        if self.finished {
            return Ok(None);
        }
        if let Some(max_pages) = self.query.max_pages {
            if self.pages_fetched() >= max_pages {
                info!(
                    "Stopping timeline of {} after {} pages",
                    self.query.uid, max_pages
                );
                self.finished = true;
                return Ok(None);
            }
        }

        tokio::time::sleep(self.page_delay).await;
        let items = self
            .api
            .user_timeline_page(self.query.uid, self.next_page)
            .await?;

        if items.is_empty() {
            info!(
                "Timeline of {} exhausted at page {}",
                self.query.uid, self.next_page
            );
            self.finished = true;
            return Ok(None);
        }

        let fetched = items.len();
        let mut batch = Vec::with_capacity(fetched);
        for item in items {
            let post = item.into_post()?;
            if self.query.window.contains(&post.publish_time)
                && check_keyword_list(&self.query.keywords, &post.text)
            {
                batch.push(post);
            }
        }

        debug!(
            "Timeline page {} of {}: kept {} of {} posts",
            self.next_page,
            self.query.uid,
            batch.len(),
            fetched
        );
        self.next_page += 1;
        Ok(Some(batch))
    }

    /// Adapt the cursor into a stream of batches. The stream ends at the
    /// first empty page or after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<TimelinePost>, CoreError>> + 'a
    where
        A: 'a,
    {
        stream::try_unfold(self, |mut timeline| async move {
            Ok(timeline.next_batch().await?.map(|batch| (batch, timeline)))
        })
    }
}
