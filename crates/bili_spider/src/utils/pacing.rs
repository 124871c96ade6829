use std::time::Duration;

use rand::Rng;

use crate::config::PacingConfig;

/// 请求节奏控制：未使用代理时在部分翻页前及账号之间随机等待，使用代理时不等待
#[derive(Debug, Clone)]
pub struct Pacer {
    enabled: bool,
    min_delay: u64,
    max_delay: u64,
    every: u32,
}

impl Pacer {
    pub fn new(config: &PacingConfig, proxy_enabled: bool) -> Self {
        Self {
            enabled: !proxy_enabled,
            min_delay: config.min_delay.min(config.max_delay),
            max_delay: config.max_delay,
            every: config.every.max(1),
        }
    }

    /// 请求第 page 页之前需要等待的时间
    pub fn page_delay(&self, page: u32) -> Option<Duration> {
        if page % self.every != 0 {
            return None;
        }
        self.jitter()
    }

    /// 处理下一个账号之前需要等待的时间
    pub fn account_delay(&self) -> Option<Duration> {
        self.jitter()
    }

    pub async fn before_page(&self, page: u32) {
        if let Some(delay) = self.page_delay(page) {
            tokio::time::sleep(delay).await;
        }
    }

    fn jitter(&self) -> Option<Duration> {
        if !self.enabled || self.max_delay == 0 {
            return None;
        }
        let secs = rand::rng().random_range(self.min_delay..=self.max_delay);
        Some(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacing(min_delay: u64, max_delay: u64, every: u32) -> PacingConfig {
        PacingConfig {
            min_delay,
            max_delay,
            every,
        }
    }

    #[test]
    fn test_delay_on_even_pages() {
        let pacer = Pacer::new(&pacing(1, 3, 2), false);
        for page in 1..=20 {
            let delay = pacer.page_delay(page);
            if page % 2 == 0 {
                let delay = delay.expect("even pages should wait");
                assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(3));
            } else {
                assert!(delay.is_none());
            }
        }
        assert!(pacer.account_delay().is_some());
    }

    #[test]
    fn test_no_delay_with_proxy() {
        let pacer = Pacer::new(&pacing(1, 3, 2), true);
        assert!((1..=10).all(|page| pacer.page_delay(page).is_none()));
        assert!(pacer.account_delay().is_none());
    }

    #[test]
    fn test_zero_delay_disables_pacing() {
        let pacer = Pacer::new(&pacing(0, 0, 1), false);
        assert!(pacer.page_delay(1).is_none());
        assert!(pacer.account_delay().is_none());
    }

    #[test]
    fn test_custom_cadence() {
        let pacer = Pacer::new(&pacing(2, 2, 3), false);
        assert_eq!(pacer.page_delay(3), Some(Duration::from_secs(2)));
        assert_eq!(pacer.page_delay(4), None);
        assert_eq!(pacer.page_delay(6), Some(Duration::from_secs(2)));
    }
}
