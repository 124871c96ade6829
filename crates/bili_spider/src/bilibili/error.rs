use reqwest::StatusCode;
use thiserror::Error;

/// 单次请求在传输层面的失败，不会在请求内部重试
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build client through proxy {proxy} for {url}: {source}")]
    Client {
        url: String,
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// 服务器给出了响应，但不是预期的数据
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("request {url} was rejected with status {status}")]
    Rejected { url: String, status: StatusCode },
    #[error("failed to parse response of {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("API returned error code {code} for {url}: {message}")]
    ErrorResponse { url: String, code: i64, message: String },
    #[error("response of {url} has no data field")]
    MissingData { url: String },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// 分页收集的失败，传输层面的请求失败只会让分页提前结束，不会出现在这里
#[derive(Error, Debug)]
pub enum CollectError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("collection interrupted")]
    Cancelled,
}
