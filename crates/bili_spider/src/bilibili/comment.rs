use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::bilibili::{BiliClient, CollectError, Comment, CommentPage, DecodeError, collect_limited, paginate};

/// 一个视频下的评论区
pub struct VideoComments<'a> {
    client: &'a BiliClient,
    pub aid: i64,
}

impl<'a> VideoComments<'a> {
    pub fn new(client: &'a BiliClient, aid: i64) -> Self {
        Self { client, aid }
    }

    /// 按页返回所有一级评论
    pub fn comment_stream(&self) -> impl Stream<Item = Result<Comment, DecodeError>> + use<'a> {
        let (client, aid) = (self.client, self.aid);
        paginate(
            client,
            format!("视频 {aid} 的评论"),
            move |page| client.endpoints().comment_page(aid, page),
            CommentPage::into_comments,
        )
    }

    /// 按页返回某条一级评论下的所有回复
    pub fn reply_stream(&self, root: i64) -> impl Stream<Item = Result<Comment, DecodeError>> + use<'a> {
        let (client, aid) = (self.client, self.aid);
        paginate(
            client,
            format!("视频 {aid} 评论 {root} 的回复"),
            move |page| client.endpoints().reply_page(aid, root, page),
            CommentPage::into_comments,
        )
    }

    /// 收集评论区的全部内容
    ///
    /// 先收集完所有一级评论，开启 `with_replies` 时再依次展开有回复的评论，
    /// 回复按其所属评论的顺序追加在末尾。`limit` 限制的是返回的总条数。
    pub async fn collect(
        &self,
        limit: Option<usize>,
        with_replies: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Comment>, CollectError> {
        info!("开始获取视频 {} 的评论", self.aid);
        let mut comments = collect_limited(self.comment_stream(), limit, cancel).await?;
        if !with_replies {
            return Ok(comments);
        }
        let roots = comments
            .iter()
            .filter(|comment| comment.has_replies())
            .map(|comment| comment.rpid)
            .collect::<Vec<_>>();
        for root in roots {
            let remaining = match limit {
                Some(limit) if comments.len() >= limit => break,
                Some(limit) => Some(limit - comments.len()),
                None => None,
            };
            let replies = collect_limited(self.reply_stream(root), remaining, cancel).await?;
            comments.extend(replies);
        }
        Ok(comments)
    }
}
