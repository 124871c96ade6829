use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// 配置文件路径，不存在时会写入一份默认配置
    #[arg(short, long, default_value = "config.toml", env = "BILI_SPIDER_CONFIG")]
    pub config: PathBuf,

    #[arg(short, long, default_value = "None,bili_spider=info", env = "RUST_LOG")]
    pub log_level: String,
}
