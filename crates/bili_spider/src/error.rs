use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::bilibili::{ApiError, DecodeError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {} not found, a default one has been written, please fill it in", .0.display())]
    NotFound(PathBuf),
    #[error("failed to access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),
}

#[derive(Error, Debug)]
#[error("failed to write {}: {source}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// 导致单个账号中止处理的错误，这些情况都不会写入完成标记
#[derive(Error, Debug)]
pub enum AccountError {
    #[error("account {0} not found")]
    NotFound(u64),
    #[error("failed to get info of account {mid}: {source}")]
    Info {
        mid: u64,
        #[source]
        source: ApiError,
    },
    #[error("failed to get video list of account {mid}: {source}")]
    VideoList {
        mid: u64,
        #[source]
        source: DecodeError,
    },
    #[error("processing of account {0} interrupted")]
    Interrupted(u64),
}
