//! 存储模块 - 配置、预设数据库与数据集快照

pub mod config;
pub mod database;
pub mod snapshot;
