//! Search result cards and their normalization into [`Post`] records.
//!
//! A result page mixes several card shapes: posts carried directly in
//! `mblog`, posts wrapped in the first entry of a `card_group`, intro
//! banners and empty placeholder groups. [`Card::resolve`] decides which
//! shape a raw card has once, so the crawl loop only ever matches on the
//! resolved variant.

use crate::de;
use crawler_core::{parse_weibo_time, CoreError, Post, WeiboApiError};
use serde::Deserialize;
use serde_json::Value;

pub const CARD_TYPE_INTRO: i64 = 7;
pub const CARD_TYPE_EMPTY_GROUP: i64 = 8;
pub const CARD_TYPE_GROUP: i64 = 11;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub data: SearchData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchData {
    pub cards: Vec<RawCard>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCard {
    pub card_type: Option<i64>,
    pub mblog: Option<Value>,
    pub card_group: Option<Vec<RawCard>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MBlog {
    #[serde(deserialize_with = "de::id_string")]
    pub id: String,
    pub user: MBlogUser,
    pub created_at: String,
    pub text: String,
    #[serde(deserialize_with = "de::count")]
    pub attitudes_count: u64,
    #[serde(deserialize_with = "de::count")]
    pub comments_count: u64,
    #[serde(deserialize_with = "de::count")]
    pub reposts_count: u64,
    #[serde(rename = "isLongText", default)]
    pub is_long_text: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MBlogUser {
    #[serde(deserialize_with = "de::id_u64")]
    pub id: u64,
    pub screen_name: String,
    #[serde(default)]
    pub gender: String,
}

#[derive(Debug, Clone)]
pub enum Card {
    /// Post carried in the card's own `mblog`
    DirectPost(Box<MBlog>),
    /// Post carried in `card_group[0].mblog`
    GroupedPost(Box<MBlog>),
    Intro,
    EmptyGroup,
    /// No post payload could be found
    Unresolved,
}

impl Card {
    pub fn resolve(raw: RawCard) -> Result<Self, CoreError> {
        match raw.card_type {
            Some(CARD_TYPE_INTRO) => return Ok(Card::Intro),
            Some(CARD_TYPE_EMPTY_GROUP) => return Ok(Card::EmptyGroup),
            Some(CARD_TYPE_GROUP) if raw.card_group.is_none() => return Ok(Card::EmptyGroup),
            _ => {}
        }

        if let Some(mblog) = raw.mblog {
            return Ok(Card::DirectPost(Box::new(parse_mblog(mblog)?)));
        }

        let grouped = raw
            .card_group
            .and_then(|group| group.into_iter().next())
            .and_then(|first| first.mblog);
        match grouped {
            Some(mblog) => Ok(Card::GroupedPost(Box::new(parse_mblog(mblog)?))),
            None => Ok(Card::Unresolved),
        }
    }

    pub fn into_mblog(self) -> Option<MBlog> {
        match self {
            Card::DirectPost(mblog) | Card::GroupedPost(mblog) => Some(*mblog),
            Card::Intro | Card::EmptyGroup | Card::Unresolved => None,
        }
    }
}

fn parse_mblog(value: Value) -> Result<MBlog, CoreError> {
    serde_json::from_value(value).map_err(|e| {
        WeiboApiError::invalid_response(format!("malformed post payload: {}", e)).into()
    })
}

impl MBlog {
    /// Build the flat record. `text` replaces the inline body when the post
    /// was truncated and its full text has been fetched.
    pub fn into_post(self, text: Option<String>) -> Result<Post, CoreError> {
        let publish_time = parse_weibo_time(&self.created_at)?;
        Ok(Post {
            id: self.id,
            user_name: self.user.screen_name,
            user_id: self.user.id,
            gender: self.user.gender,
            publish_time,
            text: text.unwrap_or(self.text),
            like_count: self.attitudes_count,
            comment_count: self.comments_count,
            forward_count: self.reposts_count,
            origin_publish_time: self.created_at,
        })
    }
}
