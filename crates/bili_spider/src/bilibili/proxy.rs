use std::time::Duration;

use anyhow::{Context, Result};
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use rand::seq::IndexedRandom;
use reqwest::{Proxy, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::bilibili::client::client_builder;

/// 代理接口返回的地址之间的分隔符
const PROXY_DELIMITER: &str = "<br/>";
/// 检查代理可用性的超时时间
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// 同时检查的代理数量
const PROBE_CONCURRENCY: usize = 8;

/// 代理的选择方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxySelection {
    #[default]
    Random,
    RoundRobin,
}

/// 启动时获取并校验一次的代理池，运行过程中不再重新校验
#[derive(Debug, Default)]
pub struct ProxyPool {
    proxies: Vec<String>,
    cursor: Mutex<usize>,
}

impl ProxyPool {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies: proxies.iter().map(|p| normalize(p)).collect(),
            cursor: Mutex::new(0),
        }
    }

    /// 解析代理接口返回的文本，地址之间以 `<br/>` 分隔
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.split(PROXY_DELIMITER)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        )
    }

    /// 从代理接口获取候选代理
    pub async fn fetch(proxy_api: &str) -> Result<Self> {
        info!("开始获取代理列表..");
        let text = client_builder()
            .build()
            .context("failed to build reqwest client")?
            .get(proxy_api)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .with_context(|| format!("failed to request proxy api {proxy_api}"))?
            .text()
            .await
            .with_context(|| format!("failed to read response of proxy api {proxy_api}"))?;
        let pool = Self::parse(&text);
        info!("获取到 {} 个代理：{:?}", pool.len(), pool.proxies);
        Ok(pool)
    }

    /// 逐个检查代理，只保留能在超时时间内正常访问 probe 的代理，保持原有顺序
    pub async fn validate(self, probe: &Url) -> Self {
        info!("开始检查代理可用性..");
        let checked = stream::iter(self.proxies)
            .map(|proxy| async move {
                let valid = check_proxy(&proxy, probe).await;
                if valid {
                    info!("代理 {} 可用", proxy);
                } else {
                    warn!("代理 {} 不可用", proxy);
                }
                valid.then_some(proxy)
            })
            .buffered(PROBE_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;
        let pool = Self {
            proxies: checked.into_iter().flatten().collect(),
            cursor: Mutex::new(0),
        };
        info!("可用代理共 {} 个：{:?}", pool.len(), pool.proxies);
        pool
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn random_pick(&self) -> Option<String> {
        self.proxies.choose(&mut rand::rng()).cloned()
    }

    /// 按顺序轮流返回代理，游标到达末尾后回到开头
    pub fn next_round_robin(&self) -> Option<String> {
        if self.proxies.is_empty() {
            return None;
        }
        let mut cursor = self.cursor.lock();
        let proxy = self.proxies[*cursor % self.proxies.len()].clone();
        *cursor = (*cursor + 1) % self.proxies.len();
        Some(proxy)
    }
}

fn normalize(proxy: &str) -> String {
    if proxy.starts_with("http") {
        proxy.to_owned()
    } else {
        format!("http://{proxy}")
    }
}

async fn check_proxy(proxy: &str, probe: &Url) -> bool {
    let client = match Proxy::all(proxy).and_then(|p| client_builder().proxy(p).timeout(PROBE_TIMEOUT).build()) {
        Ok(client) => client,
        Err(e) => {
            debug!("代理 {} 无法使用：{:#}", proxy, e);
            return false;
        }
    };
    match client.get(probe.clone()).send().await {
        Ok(resp) => resp.status() == StatusCode::OK,
        Err(e) => {
            debug!("通过代理 {} 请求失败：{:#}", proxy, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_parse_proxy_list() {
        let pool = ProxyPool::parse("1.2.3.4:8080<br/>https://5.6.7.8:3128<br/><br/> 9.9.9.9:1 <br/>");
        assert_eq!(
            pool.proxies,
            ["http://1.2.3.4:8080", "https://5.6.7.8:3128", "http://9.9.9.9:1"]
        );
        assert!(ProxyPool::parse("").is_empty());
    }

    #[test]
    fn test_round_robin_is_a_cycle() {
        let proxies = (0..5).map(|i| format!("10.0.0.{i}:80")).collect::<Vec<_>>();
        let pool = ProxyPool::new(proxies);
        for _ in 0..3 {
            let visited = (0..pool.len())
                .map(|_| pool.next_round_robin().unwrap())
                .collect::<HashSet<_>>();
            assert_eq!(visited.len(), pool.len());
        }
        assert_eq!(pool.next_round_robin().as_deref(), Some("http://10.0.0.0:80"));
        assert!(ProxyPool::default().next_round_robin().is_none());
    }

    #[test]
    fn test_random_pick() {
        let pool = ProxyPool::new(vec!["a:1".to_owned(), "b:2".to_owned()]);
        for _ in 0..20 {
            let picked = pool.random_pick().unwrap();
            assert!(picked == "http://a:1" || picked == "http://b:2");
        }
        assert!(ProxyPool::default().random_pick().is_none());
    }

    #[tokio::test]
    async fn test_fetch_proxy_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/proxies"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1.1.1.1:80<br/>2.2.2.2:81<br/>"))
            .mount(&server)
            .await;
        let pool = ProxyPool::fetch(&format!("{}/proxies", server.uri())).await.unwrap();
        assert_eq!(pool.proxies, ["http://1.1.1.1:80", "http://2.2.2.2:81"]);
    }

    #[tokio::test]
    async fn test_validate_drops_unreachable_proxies() {
        // mock 服务器同时充当代理，代理请求会以绝对地址的形式发给它
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let alive = server.address().to_string();
        let pool = ProxyPool::new(vec![alive.clone(), "127.0.0.1:1".to_owned()]);
        let probe = Url::parse("http://api.example.invalid/x/v2/reply/main").unwrap();
        let pool = pool.validate(&probe).await;
        assert_eq!(pool.proxies, [format!("http://{alive}")]);
    }
}
