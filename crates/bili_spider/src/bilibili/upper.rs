use futures::Stream;
use serde_json::Value;

use crate::bilibili::{ApiError, BiliClient, DecodeError, Video, VideoPage, paginate};

/// 一个 UP 主账号，用于获取其信息和投稿视频列表
pub struct Upper<'a> {
    client: &'a BiliClient,
    pub mid: u64,
}

impl<'a> Upper<'a> {
    pub fn new(client: &'a BiliClient, mid: u64) -> Self {
        Self { client, mid }
    }

    /// 获取账号信息，账号不存在时返回 Ok(None)
    pub async fn get_info(&self) -> Result<Option<Value>, ApiError> {
        let url = self.client.endpoints().account_info(self.mid);
        match self.client.get_optional_data::<Value>(&url).await {
            Ok(info) => Ok(info),
            // 接口对不存在的账号返回 -404
            Err(ApiError::Decode(DecodeError::ErrorResponse { code: -404, .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 从第一页开始按接口顺序返回所有投稿视频
    pub fn into_video_stream(self) -> impl Stream<Item = Result<Video, DecodeError>> + 'a {
        let (client, mid) = (self.client, self.mid);
        paginate(
            client,
            format!("UP 主 {mid} 的投稿列表"),
            move |page| client.endpoints().video_page(mid, page),
            VideoPage::into_videos,
        )
    }
}
