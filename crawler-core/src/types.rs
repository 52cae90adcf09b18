use crate::error::CoreError;
use chrono::{DateTime, FixedOffset};

/// One normalized search result.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub user_name: String,
    pub user_id: u64,
    pub gender: String,
    pub publish_time: DateTime<FixedOffset>,
    pub text: String,
    pub like_count: u64,
    pub comment_count: u64,
    pub forward_count: u64,
    /// Timestamp exactly as the platform rendered it
    pub origin_publish_time: String,
}

/// One post from a user's own timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePost {
    pub user_id: u64,
    pub id: String,
    pub text: String,
    pub publish_time: DateTime<FixedOffset>,
    pub like_count: u64,
    pub comment_count: u64,
    pub forward_count: u64,
}

/// Destination for accumulated records. Each call receives the full set
/// collected so far and replaces whatever the previous call wrote.
pub trait PostSink {
    fn write_posts(&mut self, keyword: &str, posts: &[Post]) -> Result<(), CoreError>;

    fn write_timeline(&mut self, uid: u64, posts: &[TimelinePost]) -> Result<(), CoreError>;
}
