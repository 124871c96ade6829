use std::fmt::Debug;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};
use tokio::fs;

use crate::error::WriteError;

/// 数据目录下的固定分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Namespace {
    Users,
    Videos,
    Comments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishInfo {
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "no video")]
    NoVideo,
}

/// 账号处理结束时写入的完成标记
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub time: String,
    pub info: FinishInfo,
}

impl CompletionMarker {
    pub fn now(info: FinishInfo) -> Self {
        Self {
            time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            info,
        }
    }
}

/// 将数据以 JSON 的形式写入 `<root>/<namespace>/<name>`，已存在的文件会被覆盖
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 创建所有分类目录
    pub async fn prepare(&self) -> Result<(), WriteError> {
        for namespace in Namespace::iter() {
            let dir = self.root.join(namespace.as_ref());
            fs::create_dir_all(&dir)
                .await
                .map_err(|source| WriteError { path: dir, source })?;
        }
        Ok(())
    }

    pub fn path(&self, namespace: Namespace, name: &str) -> PathBuf {
        self.root.join(namespace.as_ref()).join(name)
    }

    /// 序列化失败时退而写入值的 Debug 文本，只有文件操作失败才会返回错误
    pub async fn write<T: Serialize + Debug>(
        &self,
        value: &T,
        namespace: Namespace,
        name: &str,
    ) -> Result<PathBuf, WriteError> {
        let content = serde_json::to_string(value).unwrap_or_else(|e| {
            warn!("序列化 {}/{} 失败，改为写入原始文本：{:#}", namespace, name, e);
            format!("{value:?}")
        });
        let path = self.path(namespace, name);
        // 先写入临时文件再重命名，中断时不会留下写了一半的文件
        let tmp = temp_path(&path);
        fs::write(&tmp, content).await.map_err(|source| WriteError {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).await.map_err(|source| WriteError {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
