use std::sync::Arc;

use leaky_bucket::RateLimiter;

use crate::bilibili::{ProxyPool, ProxySelection};

/// 一次请求的路由决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// 未开启代理，直接连接
    Direct,
    /// 经由该代理发出请求
    Proxy(String),
    /// 已开启代理但代理池为空，由调用方决定如何处理
    NoRoute,
}

/// 每次请求前调用，负责限速以及选择代理
pub struct Gate {
    pool: Option<Arc<ProxyPool>>,
    selection: ProxySelection,
    limiter: Option<RateLimiter>,
}

impl Gate {
    pub fn direct(limiter: Option<RateLimiter>) -> Self {
        Self {
            pool: None,
            selection: ProxySelection::default(),
            limiter,
        }
    }

    pub fn proxied(pool: impl Into<Arc<ProxyPool>>, selection: ProxySelection, limiter: Option<RateLimiter>) -> Self {
        Self {
            pool: Some(pool.into()),
            selection,
            limiter,
        }
    }

    pub fn proxy_enabled(&self) -> bool {
        self.pool.is_some()
    }

    pub async fn acquire(&self) -> RouteDecision {
        if let Some(limiter) = &self.limiter {
            limiter.acquire_one().await;
        }
        let Some(pool) = &self.pool else {
            return RouteDecision::Direct;
        };
        let proxy = match self.selection {
            ProxySelection::Random => pool.random_pick(),
            ProxySelection::RoundRobin => pool.next_round_robin(),
        };
        proxy.map_or(RouteDecision::NoRoute, RouteDecision::Proxy)
    }
}
