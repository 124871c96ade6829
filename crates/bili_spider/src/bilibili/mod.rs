use async_stream::try_stream;
pub use client::BiliClient;
pub use comment::VideoComments;
pub use endpoint::Endpoints;
pub use error::{ApiError, CollectError, DecodeError, FetchError};
use futures::{Stream, StreamExt, TryStreamExt};
pub use gate::{Gate, RouteDecision};
pub use proxy::{ProxyPool, ProxySelection};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
pub use upper::Upper;

mod client;
mod comment;
mod endpoint;
mod error;
mod gate;
mod proxy;
mod upper;

/// 所有接口共用的响应外层结构
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub(crate) fn into_data(self, url: &str) -> Result<T, DecodeError> {
        if self.code != 0 {
            return Err(DecodeError::ErrorResponse {
                url: url.to_owned(),
                code: self.code,
                message: self.message,
            });
        }
        self.data.ok_or_else(|| DecodeError::MissingData { url: url.to_owned() })
    }
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<Envelope<T>, DecodeError> {
    serde_json::from_str(body).map_err(|source| DecodeError::Malformed {
        url: url.to_owned(),
        source,
    })
}

/// 投稿列表中的单个视频，只解析 aid，其余字段原样保留
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub aid: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 单条评论或楼中楼回复，只解析 rpid 与 replies，其余字段原样保留
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub rpid: i64,
    #[serde(default)]
    pub replies: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Comment {
    pub fn has_replies(&self) -> bool {
        self.replies.as_ref().is_some_and(|replies| !replies.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoPage {
    list: VideoList,
}

#[derive(Debug, Deserialize)]
struct VideoList {
    vlist: Option<Vec<Video>>,
}

impl VideoPage {
    pub(crate) fn into_videos(self) -> Vec<Video> {
        self.list.vlist.unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentPage {
    replies: Option<Vec<Comment>>,
}

impl CommentPage {
    pub(crate) fn into_comments(self) -> Vec<Comment> {
        self.replies.unwrap_or_default()
    }
}

/// 从第 1 页开始逐页请求，遇到空页或连接失败时结束；被拒绝的请求与响应结构错误会作为流中的错误抛出
pub(crate) fn paginate<'a, P, T>(
    client: &'a BiliClient,
    label: String,
    page_url: impl Fn(u32) -> Url + 'a,
    into_items: impl Fn(P) -> Vec<T> + 'a,
) -> impl Stream<Item = Result<T, DecodeError>> + 'a
where
    P: DeserializeOwned + 'a,
    T: 'a,
{
    try_stream! {
        let mut page = 1;
        loop {
            client.pacer().before_page(page).await;
            let data = match client.get_data::<P>(&page_url(page)).await {
                Ok(data) => data,
                Err(ApiError::Fetch(e)) => {
                    error!("获取{}第 {} 页失败，提前结束分页：{:#}", label, page, e);
                    break;
                }
                Err(ApiError::Decode(e)) => Err(e)?,
            };
            let items = into_items(data);
            if items.is_empty() {
                debug!("{}第 {} 页为空，分页结束", label, page);
                break;
            }
            for item in items {
                yield item;
            }
            page += 1;
        }
    }
}

/// 收集流中的元素，达到数量上限后立即停止（可能截断在某一页中间），收到中断信号时返回 Cancelled
pub(crate) async fn collect_limited<T>(
    stream: impl Stream<Item = Result<T, DecodeError>>,
    limit: Option<usize>,
    cancel: &CancellationToken,
) -> Result<Vec<T>, CollectError> {
    let items = stream
        .take(limit.unwrap_or(usize::MAX))
        .take_until(cancel.cancelled())
        .try_collect::<Vec<_>>()
        .await?;
    if cancel.is_cancelled() {
        return Err(CollectError::Cancelled);
    }
    Ok(items)
}
