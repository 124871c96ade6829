use std::fmt::Debug;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::bilibili::{BiliClient, CollectError, Upper, Video, VideoComments, collect_limited};
use crate::config::Config;
use crate::error::AccountError;
use crate::storage::{CompletionMarker, FinishInfo, Namespace, Storage};

/// 单个账号的处理结果
#[derive(Debug)]
pub enum AccountOutcome {
    /// 所有视频都已处理，failed 为评论获取失败而被跳过的视频数
    Complete { videos: usize, failed: usize },
    NoVideo,
    Aborted(AccountError),
    Interrupted,
}

/// 状态转移的结果：继续下一步或提前结束
enum Transition<T> {
    Next(T),
    Finish(AccountOutcome),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub complete: usize,
    pub no_video: usize,
    pub aborted: usize,
    pub interrupted: usize,
    /// 已完成账号中处理过的视频总数
    pub videos: usize,
    /// 其中获取评论失败的视频数
    pub failed_videos: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &AccountOutcome) {
        match outcome {
            AccountOutcome::Complete { videos, failed } => {
                self.complete += 1;
                self.videos += videos;
                self.failed_videos += failed;
            }
            AccountOutcome::NoVideo => self.no_video += 1,
            AccountOutcome::Aborted(_) => self.aborted += 1,
            AccountOutcome::Interrupted => self.interrupted += 1,
        }
    }
}

pub struct Spider<'a> {
    config: &'a Config,
    client: &'a BiliClient,
    storage: &'a Storage,
    cancel: CancellationToken,
}

impl<'a> Spider<'a> {
    pub fn new(config: &'a Config, client: &'a BiliClient, storage: &'a Storage, cancel: CancellationToken) -> Self {
        Self {
            config,
            client,
            storage,
            cancel,
        }
    }

    /// 按顺序处理所有账号，单个账号的失败不影响后续账号，收到中断信号时在账号之间停止
    pub async fn process_accounts(&self, accounts: &[u64]) -> RunSummary {
        info!("开始抓取全部 {} 个 UP 主", accounts.len());
        let mut summary = RunSummary::default();
        for (idx, &mid) in accounts.iter().enumerate() {
            if idx > 0 {
                if let Some(delay) = self.client.pacer().account_delay() {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.cancel.cancelled() => {}
                    }
                }
            }
            if self.cancel.is_cancelled() {
                warn!("收到中断信号，剩余 {} 个 UP 主不再处理", accounts.len() - idx);
                break;
            }
            match AssertUnwindSafe(self.process_account(mid)).catch_unwind().await {
                Ok(outcome) => summary.record(&outcome),
                Err(_) => {
                    error!("处理 UP 主 {} 时发生 panic，继续处理下一个", mid);
                    summary.aborted += 1;
                }
            }
        }
        info!(
            "全部 UP 主处理完毕：完成 {} 个，无视频 {} 个，中止 {} 个，中断 {} 个；共处理 {} 个视频，其中 {} 个获取评论失败",
            summary.complete,
            summary.no_video,
            summary.aborted,
            summary.interrupted,
            summary.videos,
            summary.failed_videos
        );
        summary
    }

    /// 处理单个账号：账号信息 -> 视频列表 -> 每个视频的评论 -> 完成标记
    pub async fn process_account(&self, mid: u64) -> AccountOutcome {
        async {
            info!("开始抓取 UP 主 {}", mid);
            match self.run_account(mid).await {
                Ok(outcome) => outcome,
                Err(AccountError::Interrupted(_)) => {
                    warn!("UP 主 {} 的处理被中断，不写入完成标记", mid);
                    AccountOutcome::Interrupted
                }
                Err(e) => {
                    error!("UP 主 {} 处理中止：{:#}", mid, e);
                    AccountOutcome::Aborted(e)
                }
            }
        }
        .instrument(info_span!("account", mid))
        .await
    }

    async fn run_account(&self, mid: u64) -> Result<AccountOutcome, AccountError> {
        let upper = Upper::new(self.client, mid);
        let info = self.fetch_info(&upper).await?;
        self.save(&info, Namespace::Users, &format!("{mid}.json")).await;
        let videos = match self.fetch_videos(upper).await? {
            Transition::Next(videos) => videos,
            Transition::Finish(outcome) => return Ok(outcome),
        };
        let failed = self.process_videos(mid, &videos).await?;
        self.finish(mid, FinishInfo::Complete).await;
        info!("UP 主 {} 抓取完成", mid);
        Ok(AccountOutcome::Complete {
            videos: videos.len(),
            failed,
        })
    }

    /// Start -> InfoFetched
    async fn fetch_info(&self, upper: &Upper<'_>) -> Result<Value, AccountError> {
        let mid = upper.mid;
        match upper.get_info().await {
            Ok(Some(info)) => Ok(info),
            Ok(None) => Err(AccountError::NotFound(mid)),
            Err(source) => Err(AccountError::Info { mid, source }),
        }
    }

    /// InfoFetched -> VideoListFetched，视频列表为空时写入 no video 标记并结束
    async fn fetch_videos(&self, upper: Upper<'_>) -> Result<Transition<Vec<Video>>, AccountError> {
        let mid = upper.mid;
        let mut videos = match collect_limited(upper.into_video_stream(), None, &self.cancel).await {
            Ok(videos) => videos,
            Err(CollectError::Cancelled) => return Err(AccountError::Interrupted(mid)),
            Err(CollectError::Decode(source)) => return Err(AccountError::VideoList { mid, source }),
        };
        if videos.is_empty() {
            warn!("UP 主 {} 没有视频", mid);
            self.finish(mid, FinishInfo::NoVideo).await;
            return Ok(Transition::Finish(AccountOutcome::NoVideo));
        }
        self.save(&videos, Namespace::Videos, &format!("{mid}.json")).await;
        info!("UP 主 {} 共有 {} 个视频", mid, videos.len());
        if let Some(limit) = self.config.video_limit() {
            videos.truncate(limit);
        }
        Ok(Transition::Next(videos))
    }

    /// VideoListFetched -> CommentsProcessed，返回获取评论失败的视频数
    async fn process_videos(&self, mid: u64, videos: &[Video]) -> Result<usize, AccountError> {
        info!("开始抓取 {} 个视频的评论", videos.len());
        let mut failed = 0;
        for (idx, video) in videos.iter().enumerate() {
            let aid = video.aid;
            let comments = VideoComments::new(self.client, aid)
                .collect(self.config.comment_limit(), self.config.comment_reply, &self.cancel)
                .await;
            match comments {
                Ok(comments) => self.save(&comments, Namespace::Comments, &format!("{aid}.json")).await,
                Err(CollectError::Cancelled) => return Err(AccountError::Interrupted(mid)),
                Err(CollectError::Decode(e)) => {
                    error!("获取视频 {} 的评论失败，跳过该视频：{:#}", aid, e);
                    failed += 1;
                }
            }
            info!("当前进度：{}/{}", idx + 1, videos.len());
        }
        Ok(failed)
    }

    /// CommentsProcessed -> Done
    async fn finish(&self, mid: u64, info: FinishInfo) {
        self.save(
            &CompletionMarker::now(info),
            Namespace::Users,
            &format!("{mid}_finish.json"),
        )
        .await;
    }

    /// 写入失败只记录日志
    async fn save<T: Serialize + Debug>(&self, value: &T, namespace: Namespace, name: &str) {
        match self.storage.write(value, namespace, name).await {
            Ok(path) => info!("数据已保存至 {}", path.display()),
            Err(e) => error!("保存数据失败：{:#}", e),
        }
    }
}
