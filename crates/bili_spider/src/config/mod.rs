use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

mod clap;
mod global;
mod item;

use crate::bilibili::ProxySelection;
use crate::config::global::DATA_DIR_PATTERN;
pub use crate::config::global::ARGS;
pub use crate::config::item::PacingConfig;
use crate::config::item::RateLimit;
use crate::error::ConfigError;

fn default_data_dir() -> String {
    "data".to_owned()
}

fn default_timeout() -> u64 {
    15
}

fn default_api_base() -> String {
    "https://api.bilibili.com".to_owned()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub account_list: Vec<u64>,
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub proxy_api: String,
    #[serde(default)]
    pub proxy_selection: ProxySelection,
    #[serde(default)]
    pub cookie: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// 为 0 时不限制
    #[serde(default)]
    pub video_limit: usize,
    /// 为 0 时不限制
    #[serde(default)]
    pub comment_limit: usize,
    #[serde(default)]
    pub comment_reply: bool,
    /// 单次请求的超时时间，单位为秒
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account_list: Vec::new(),
            proxy: false,
            proxy_api: String::new(),
            proxy_selection: ProxySelection::default(),
            cookie: String::new(),
            data_dir: default_data_dir(),
            video_limit: 0,
            comment_limit: 0,
            comment_reply: false,
            timeout: default_timeout(),
            pacing: PacingConfig::default(),
            rate_limit: None,
            api_base: default_api_base(),
        }
    }
}

impl Config {
    /// 读取并检查配置文件，文件不存在时写入默认配置并返回错误
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("开始加载配置文件 {}..", path.display());
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("配置文件不存在，写入默认配置..");
                Self::default().save(path)?;
                return Err(ConfigError::NotFound(path.to_owned()));
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        info!("检查配置文件..");
        config.check()?;
        info!("配置文件检查通过");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_owned(),
                source,
            })?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })
    }

    /// 检查配置是否合法，同时为留空的 data_dir 填充默认值
    pub fn check(&mut self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if self.account_list.is_empty() {
            errors.push("未设置需要抓取的账号，程序空转没有意义".to_owned());
        }
        if self.account_list.contains(&0) {
            errors.push("账号 id 必须为正整数".to_owned());
        }
        if self.proxy && self.proxy_api.trim().is_empty() {
            errors.push("已开启代理但未设置 proxy_api".to_owned());
        }
        if self.data_dir.is_empty() {
            self.data_dir = default_data_dir();
        } else if !DATA_DIR_PATTERN.is_match(&self.data_dir) {
            errors.push(format!(
                "data_dir 只能包含字母、数字、下划线、短横线和点，检测到: {}",
                self.data_dir
            ));
        }
        if self.timeout == 0 {
            errors.push("timeout 必须大于 0".to_owned());
        }
        if self.pacing.min_delay > self.pacing.max_delay {
            errors.push("pacing.min_delay 不能大于 pacing.max_delay".to_owned());
        }
        if self.pacing.every == 0 {
            errors.push("pacing.every 必须大于 0".to_owned());
        }
        if self.rate_limit.as_ref().is_some_and(|r| r.limit == 0 || r.duration == 0) {
            errors.push("rate_limit 的 limit 与 duration 都必须大于 0".to_owned());
        }
        if !Url::parse(&self.api_base).is_ok_and(|url| matches!(url.scheme(), "http" | "https")) {
            errors.push(format!("api_base 不是合法的 http 地址: {}", self.api_base));
        }
        for error in &errors {
            error!("{}", error);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn video_limit(&self) -> Option<usize> {
        (self.video_limit != 0).then_some(self.video_limit)
    }

    pub fn comment_limit(&self) -> Option<usize> {
        (self.comment_limit != 0).then_some(self.comment_limit)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// 指向 mock 服务器且不等待的配置
#[cfg(test)]
pub(crate) fn test_config(api_base: &str) -> Config {
    Config {
        account_list: vec![1],
        timeout: 5,
        pacing: PacingConfig {
            min_delay: 0,
            max_delay: 0,
            every: 2,
        },
        api_base: api_base.to_owned(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let mut config: Config = toml::from_str("account_list = [42, 7]").unwrap();
        config.check().unwrap();
        assert_eq!(config.account_list, [42, 7]);
        assert!(!config.proxy);
        assert_eq!(config.proxy_selection, ProxySelection::Random);
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.video_limit(), None);
        assert_eq!(config.comment_limit(), None);
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(config.pacing.every, 2);
        assert!(config.rate_limit.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let mut config: Config = toml::from_str(
            r#"
            account_list = [1]
            proxy = true
            proxy_api = "http://127.0.0.1:5010/get_all"
            proxy_selection = "round_robin"
            cookie = "SESSDATA=xxx"
            data_dir = ""
            video_limit = 10
            comment_limit = 200
            comment_reply = true

            [rate_limit]
            limit = 4
            duration = 250
            "#,
        )
        .unwrap();
        config.check().unwrap();
        assert_eq!(config.proxy_selection, ProxySelection::RoundRobin);
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.video_limit(), Some(10));
        assert_eq!(config.comment_limit(), Some(200));
        assert!(config.comment_reply);
        assert_eq!(config.rate_limit.map(|r| (r.limit, r.duration)), Some((4, 250)));
    }

    #[test]
    fn test_check_collects_all_errors() {
        let mut config = Config {
            account_list: vec![0],
            proxy: true,
            data_dir: "../etc".to_owned(),
            timeout: 0,
            pacing: PacingConfig {
                min_delay: 5,
                max_delay: 1,
                every: 0,
            },
            api_base: "ftp://example.com".to_owned(),
            ..Default::default()
        };
        let Err(ConfigError::Invalid(errors)) = config.check() else {
            panic!("config should be invalid");
        };
        assert_eq!(errors.len(), 7);
        let mut config = Config::default();
        assert!(matches!(config.check(), Err(ConfigError::Invalid(errors)) if errors.len() == 1));
    }

    #[test]
    fn test_missing_config_writes_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        assert!(matches!(Config::load(&path), Err(ConfigError::NotFound(_))));
        let written: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(written.account_list.is_empty());
        assert_eq!(written.api_base, "https://api.bilibili.com");
        // 默认配置没有账号，再次加载时无法通过检查
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
        std::fs::write(&path, "account_list = [3]\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().account_list, [3]);
    }
}
