use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::clap::Args;

/// 全局的 ARGS，用来解析命令行参数
pub static ARGS: Lazy<Args> = Lazy::new(Args::parse);

/// data_dir 只允许使用的字符
pub(super) static DATA_DIR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\-.]+$").expect("invalid data_dir pattern"));
