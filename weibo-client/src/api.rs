use crate::cards::{SearchData, SearchResponse};
use crate::de;
use crate::retry::{RetryConfig, RetryExecutor};
use crate::timeline::{TimelineItem, TimelineResponse};
use async_trait::async_trait;
use crawler_core::{AppConfig, CoreError, WeiboApiError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info};
use url::Url;

const SEARCH_URL: &str = "https://m.weibo.cn/api/container/getIndex";
const LONG_TEXT_URL: &str = "https://m.weibo.cn/statuses/extend";
const USER_TIMELINE_URL: &str = "https://weibo.com/ajax/statuses/mymblog";
const NICKNAME_URL: &str = "https://weibo.com/n/";

/// Where each request goes. [`Endpoints::default`] is the public Weibo site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub search: String,
    pub long_text: String,
    pub user_timeline: String,
    /// Prefix the URL-escaped nickname is appended to
    pub nickname: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            search: SEARCH_URL.to_string(),
            long_text: LONG_TEXT_URL.to_string(),
            user_timeline: USER_TIMELINE_URL.to_string(),
            nickname: NICKNAME_URL.to_string(),
        }
    }
}

/// The four Weibo endpoints the crawler talks to.
#[async_trait]
pub trait WeiboApi: Send + Sync {
    async fn search_page(&self, keyword: &str, page: u32) -> Result<SearchData, CoreError>;

    /// Full body of a post the search index truncated.
    async fn long_text(&self, post_id: &str) -> Result<String, CoreError>;

    async fn user_timeline_page(&self, uid: u64, page: u32)
        -> Result<Vec<TimelineItem>, CoreError>;

    async fn lookup_uid(&self, nickname: &str) -> Result<u64, CoreError>;
}

#[derive(Debug, Clone, Deserialize)]
struct LongTextResponse {
    data: LongTextData,
}

#[derive(Debug, Clone, Deserialize)]
struct LongTextData {
    #[serde(rename = "longTextContent")]
    long_text_content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct UidResponse {
    data: UidData,
}

#[derive(Debug, Clone, Deserialize)]
struct UidData {
    #[serde(deserialize_with = "de::id_u64")]
    uid: u64,
}

/// Container id for a search: scope code plus the raw keyword. The whole
/// value is URL-escaped as a single query parameter when sent.
pub fn container_id(search_type: u32, keyword: &str) -> String {
    format!("100103type={}&q={}", search_type, keyword)
}

/// HTTP session shared by every request of a crawl: default headers
/// (cookie included), timeout, and the retry policy.
#[derive(Debug)]
pub struct WeiboApiClient {
    http_client: Client,
    retry: RetryExecutor,
    search_type: u32,
    endpoints: Endpoints,
}

impl WeiboApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, CoreError> {
        Self::with_endpoints(config, Endpoints::default())
    }

    pub fn with_endpoints(config: &AppConfig, endpoints: Endpoints) -> Result<Self, CoreError> {
        let mut headers = HeaderMap::new();
        for (name, value) in config.request_headers() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                CoreError::InvalidInput {
                    message: format!("invalid header name: {}", name),
                }
            })?;
            let value = HeaderValue::from_str(&value).map_err(|_| CoreError::InvalidInput {
                message: format!("invalid value for header {}", name.as_str()),
            })?;
            headers.insert(name, value);
        }

        let http_client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            retry: RetryExecutor::new(RetryConfig::from(config)),
            search_type: config.search_type,
            endpoints,
        })
    }

    pub fn retry_executor(&self) -> &RetryExecutor {
        &self.retry
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, CoreError> {
        self.retry
            .execute(url, || self.send_once(url, query))
            .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, CoreError> {
        debug!("GET {} {:?}", url, query);

        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::WeiboApi(WeiboApiError::RequestTimeout {
                        url: url.to_string(),
                    })
                } else {
                    error!("Network error for {}: {}", url, e);
                    CoreError::Network(e)
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            debug!("{} responded with status {}", url, status);
            return Err(WeiboApiError::RequestFailed {
                url: url.to_string(),
                status,
            }
            .into());
        }

        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse response from {}: {}", url, e);
            WeiboApiError::invalid_response(format!("{}: {}", url, e)).into()
        })
    }
}

#[async_trait]
impl WeiboApi for WeiboApiClient {
    async fn search_page(&self, keyword: &str, page: u32) -> Result<SearchData, CoreError> {
        let query = [
            ("containerid", container_id(self.search_type, keyword)),
            ("page_type", "searchall".to_string()),
            ("page", page.to_string()),
        ];
        let response: SearchResponse = self.get_json(&self.endpoints.search, &query).await?;

        debug!(
            "Search page {} for '{}' returned {} cards",
            page,
            keyword,
            response.data.cards.len()
        );
        Ok(response.data)
    }

    async fn long_text(&self, post_id: &str) -> Result<String, CoreError> {
        let query = [("id", post_id.to_string())];
        let response: LongTextResponse = self.get_json(&self.endpoints.long_text, &query).await?;
        Ok(response.data.long_text_content)
    }

    async fn user_timeline_page(
        &self,
        uid: u64,
        page: u32,
    ) -> Result<Vec<TimelineItem>, CoreError> {
        let query = [
            ("uid", uid.to_string()),
            ("page", page.to_string()),
            ("feature", "0".to_string()),
        ];
        let response: TimelineResponse = self.get_json(&self.endpoints.user_timeline, &query).await?;
        Ok(response.data.list)
    }

    async fn lookup_uid(&self, nickname: &str) -> Result<u64, CoreError> {
        let url = nickname_url(&self.endpoints.nickname, nickname)?;

        match self.get_json::<UidResponse>(url.as_str(), &[]).await {
            Ok(response) => {
                info!("Resolved {} to uid {}", nickname, response.data.uid);
                Ok(response.data.uid)
            }
            Err(CoreError::WeiboApi(WeiboApiError::RequestFailed { status, .. })) => {
                error!("Nickname lookup for {} failed with status {}", nickname, status);
                Err(WeiboApiError::UserNotFound {
                    nickname: nickname.to_string(),
                }
                .into())
            }
            Err(e) => Err(e),
        }
    }
}

pub fn nickname_url(base: &str, nickname: &str) -> Result<Url, CoreError> {
    let invalid = || CoreError::InvalidInput {
        message: format!("invalid nickname: {}", nickname),
    };
    if nickname.trim().is_empty() {
        return Err(invalid());
    }

    let mut url = Url::parse(base).map_err(|e| CoreError::InvalidInput {
        message: format!("invalid nickname endpoint '{}': {}", base, e),
    })?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .push(nickname);
    Ok(url)
}
