#[macro_use]
extern crate tracing;

mod bilibili;
mod config;
mod error;
mod storage;
mod utils;
mod workflow;

use std::process::ExitCode;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;

use crate::bilibili::{BiliClient, Endpoints, Gate, ProxyPool};
use crate::config::{ARGS, Config};
use crate::storage::Storage;
use crate::utils::init_logger;
use crate::utils::signal::cancel_on_terminate;
use crate::workflow::Spider;

#[tokio::main]
async fn main() -> ExitCode {
    Lazy::force(&ARGS);
    init_logger(&ARGS.log_level);
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("启动失败：{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    info!("开始初始化..");
    let config = Config::load(&ARGS.config)?;
    let storage = Storage::new(config.data_dir());
    storage.prepare().await.context("failed to create data directories")?;
    let endpoints = Endpoints::new(&config.api_base).context("invalid api_base")?;
    let limiter = config.rate_limit.as_ref().map(|rate_limit| rate_limit.limiter());
    let gate = if config.proxy {
        info!("已开启代理");
        let pool = ProxyPool::fetch(&config.proxy_api)
            .await?
            .validate(&endpoints.proxy_probe())
            .await;
        if pool.is_empty() {
            warn!("没有可用的代理，请求将直接发出");
        }
        Gate::proxied(pool, config.proxy_selection, limiter)
    } else {
        Gate::direct(limiter)
    };
    let client = BiliClient::new(&config, endpoints, gate)?;
    let cancel = cancel_on_terminate();
    let spider = Spider::new(&config, &client, &storage, cancel);
    spider.process_accounts(&config.account_list).await;
    Ok(())
}
