//! 错误类型
//!
//! 查询引擎本身不会失败，错误只出现在加载与存储边界。

use std::io;

use thiserror::Error;

/// 加载、存储与配置相关的错误
#[derive(Debug, Error)]
pub enum FundingError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("JSON解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("第 {index} 条记录不满足数据集约束: {reason}")]
    InvalidRecord { index: usize, reason: String },
    #[error("未找到预设: {0}")]
    UnknownPreset(String),
    #[error("配置错误: {0}")]
    Configuration(String),
}
