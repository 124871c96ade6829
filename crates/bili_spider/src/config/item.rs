use std::time::Duration;

use leaky_bucket::RateLimiter;
use serde::{Deserialize, Serialize};

/// 未使用代理时的请求节奏，单位为秒
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PacingConfig {
    pub min_delay: u64,
    pub max_delay: u64,
    /// 每隔多少页等待一次
    pub every: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay: 1,
            max_delay: 3,
            every: 2,
        }
    }
}

/// 令牌桶限速，每 duration 毫秒允许 limit 次请求
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RateLimit {
    pub limit: usize,
    pub duration: u64,
}

impl RateLimit {
    pub fn limiter(&self) -> RateLimiter {
        RateLimiter::builder()
            .initial(self.limit)
            .refill(self.limit)
            .max(self.limit)
            .interval(Duration::from_millis(self.duration))
            .build()
    }
}
