use std::time::Duration;

use anyhow::{Context, Result};
use dashmap::DashMap;
use parking_lot::Once;
use reqwest::{Proxy, Url, header};
use serde::de::DeserializeOwned;
use ua_generator::ua;

use crate::bilibili::{ApiError, DecodeError, Endpoints, FetchError, Gate, RouteDecision, decode};
use crate::config::Config;
use crate::utils::pacing::Pacer;

/// 构造 reqwest::ClientBuilder 前确保 rustls 的加密后端已经安装
pub(crate) fn client_builder() -> reqwest::ClientBuilder {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
    reqwest::Client::builder().gzip(true)
}

/// 请求 Bilibili 接口的客户端，每次请求前通过 Gate 决定限速与代理
pub struct BiliClient {
    headers: header::HeaderMap,
    timeout: Duration,
    direct: reqwest::Client,
    // 每个代理地址对应一个 reqwest::Client，首次使用时创建
    proxied: DashMap<String, reqwest::Client>,
    gate: Gate,
    endpoints: Endpoints,
    pacer: Pacer,
}

impl BiliClient {
    pub fn new(config: &Config, endpoints: Endpoints, gate: Gate) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(ua::spoof_chrome_ua()),
        );
        headers.insert(
            header::REFERER,
            header::HeaderValue::from_static("https://www.bilibili.com"),
        );
        if !config.cookie.is_empty() {
            headers.insert(
                header::COOKIE,
                header::HeaderValue::from_str(&config.cookie).context("cookie contains invalid header characters")?,
            );
        }
        let timeout = config.timeout();
        let direct = build_client(headers.clone(), timeout, None).context("failed to build reqwest client")?;
        let pacer = Pacer::new(&config.pacing, gate.proxy_enabled());
        Ok(Self {
            headers,
            timeout,
            direct,
            proxied: DashMap::new(),
            gate,
            endpoints,
            pacer,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// 发起一次 GET 请求，返回响应体文本；非 2xx 状态码视为被服务器拒绝
    pub async fn fetch(&self, url: &Url) -> Result<String, ApiError> {
        let client = match self.gate.acquire().await {
            RouteDecision::Direct => self.direct.clone(),
            RouteDecision::Proxy(proxy) => self
                .proxied_client(&proxy)
                .map_err(|source| FetchError::Client {
                    url: url.to_string(),
                    proxy,
                    source,
                })?,
            RouteDecision::NoRoute => {
                // 代理池为空时不中止请求，直接连接
                warn!("已开启代理但代理池为空，直接请求 {}", url);
                self.direct.clone()
            }
        };
        let resp = client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DecodeError::Rejected {
                url: url.to_string(),
                status,
            }
            .into());
        }
        Ok(resp.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?)
    }

    /// 请求并解析出响应中的 data 字段
    pub async fn get_data<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let body = self.fetch(url).await?;
        Ok(decode::<T>(url.as_str(), &body)?.into_data(url.as_str())?)
    }

    /// 与 get_data 相同，但 data 为空时返回 Ok(None)
    pub async fn get_optional_data<T: DeserializeOwned>(&self, url: &Url) -> Result<Option<T>, ApiError> {
        let body = self.fetch(url).await?;
        match decode::<T>(url.as_str(), &body)?.into_data(url.as_str()) {
            Ok(data) => Ok(Some(data)),
            Err(DecodeError::MissingData { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn proxied_client(&self, proxy: &str) -> reqwest::Result<reqwest::Client> {
        if let Some(client) = self.proxied.get(proxy) {
            return Ok(client.clone());
        }
        let client = build_client(self.headers.clone(), self.timeout, Some(proxy))?;
        self.proxied.insert(proxy.to_owned(), client.clone());
        Ok(client)
    }
}

fn build_client(headers: header::HeaderMap, timeout: Duration, proxy: Option<&str>) -> reqwest::Result<reqwest::Client> {
    let mut builder = client_builder()
        .default_headers(headers)
        .connect_timeout(timeout)
        .timeout(timeout);
    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }
    builder.build()
}
