//! FundLens - 创业融资数据筛选与聚合引擎
//!
//! 核心设计原则：
//! - 数据集加载后只读，查询不修改数据
//! - 筛选条件是显式的配置对象，按值传入纯函数
//! - 空结果是正常输出，不是错误

pub mod core;
pub mod storage;

pub use crate::core::dataset::{Dataset, LoadReport, RawFundingRecord};
pub use crate::core::error::FundingError;
pub use crate::core::models::{FilterCriteria, FundingRecord, GroupKey, Period};
pub use crate::core::query_engine::FundingQueryEngine;
pub use crate::core::report::{DashboardReport, ReportBuilder};
