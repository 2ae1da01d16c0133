//! 数据集快照模块
//!
//! 快照是JSON文件：原始快照是 `RawFundingRecord` 数组，加载时清洗；
//! 清洗后的快照是 `FundingRecord` 数组，加载时重新校验约束。

use crate::core::dataset::{Dataset, LoadReport, RawFundingRecord};
use crate::core::error::FundingError;
use crate::core::models::FundingRecord;
use std::fs;
use std::path::Path;

/// 加载原始快照并清洗
pub fn load_raw_snapshot(path: &Path) -> Result<(Dataset, LoadReport), FundingError> {
    let content = fs::read_to_string(path)?;
    let rows: Vec<RawFundingRecord> = serde_json::from_str(&content)?;
    tracing::info!("读取原始快照 {}，共 {} 行", path.display(), rows.len());
    Ok(Dataset::from_raw(&rows))
}

/// 加载清洗后的快照
pub fn load_snapshot(path: &Path) -> Result<Dataset, FundingError> {
    let content = fs::read_to_string(path)?;
    let records: Vec<FundingRecord> = serde_json::from_str(&content)?;
    let dataset = Dataset::from_records(records)?;
    tracing::info!("读取快照 {}，共 {} 条记录", path.display(), dataset.len());
    Ok(dataset)
}

/// 保存清洗后的快照
pub fn save_snapshot(path: &Path, dataset: &Dataset) -> Result<(), FundingError> {
    // 确保目录存在
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(dataset.records())?;
    fs::write(path, content)?;
    Ok(())
}
