//! 数据集模块
//!
//! 负责把松散的原始行清洗为只读的融资记录快照。
//! 金额或日期无法解析、缺少公司名或城市的行在这里被丢弃，
//! 查询引擎永远只看到满足约束的记录。

use crate::core::error::FundingError;
use crate::core::models::{AmountRange, FundingRecord, InvestmentType};
use crate::core::query_engine::amount_bounds;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// 行业缺失时使用的占位值
pub const UNKNOWN_INDUSTRY: &str = "Unknown";

/// 支持的日期格式
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// 原始融资行，所有字段都可能缺失
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFundingRecord {
    #[serde(default)]
    pub startup_name: Option<String>,
    /// 逗号分隔的投资方
    #[serde(default)]
    pub investors: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub sub_industry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub investment_type: Option<String>,
}

/// 接受字符串或数字
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// 丢弃原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Amount,
    Date,
    StartupName,
    City,
}

/// 加载统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped_amount: usize,
    pub dropped_date: usize,
    pub dropped_startup: usize,
    pub dropped_city: usize,
}

impl LoadReport {
    fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::Amount => self.dropped_amount += 1,
            DropReason::Date => self.dropped_date += 1,
            DropReason::StartupName => self.dropped_startup += 1,
            DropReason::City => self.dropped_city += 1,
        }
    }

    /// 被丢弃的总行数
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.rows_kept
    }
}

/// 解析金额，去除千分位逗号；非有限值或负数视为缺失
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let amount = cleaned.parse::<f64>().ok()?;
    if amount.is_finite() && amount >= 0.0 {
        Some(amount)
    } else {
        None
    }
}

/// 按支持的格式依次尝试解析日期
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 清洗单行
pub fn clean_record(raw: &RawFundingRecord) -> Result<FundingRecord, DropReason> {
    let amount = raw
        .amount
        .as_deref()
        .and_then(parse_amount)
        .ok_or(DropReason::Amount)?;
    let date = raw
        .date
        .as_deref()
        .and_then(parse_date)
        .ok_or(DropReason::Date)?;
    let startup_name =
        non_empty(raw.startup_name.as_deref()).ok_or(DropReason::StartupName)?;
    let city = non_empty(raw.city.as_deref()).ok_or(DropReason::City)?;
    let industry =
        non_empty(raw.industry.as_deref()).unwrap_or_else(|| UNKNOWN_INDUSTRY.to_string());

    // 投资方原样保留（仅去空白），排除规则只作用于投资方聚合
    let investors: Vec<String> = raw
        .investors
        .as_deref()
        .map(|s| s.split(',').map(|name| name.trim().to_string()).collect())
        .unwrap_or_default();

    let mut record = FundingRecord::new(startup_name, investors, city, industry, amount, date);
    if let Some(sub) = non_empty(raw.sub_industry.as_deref()) {
        record = record.with_sub_industry(sub);
    }
    // 同义词归一化发生在缺失值丢弃之后
    if let Some(t) = raw.investment_type.as_deref().and_then(InvestmentType::normalize) {
        record = record.with_investment_type(t);
    }
    Ok(record)
}

/// 只读的融资记录快照，克隆代价很低，可在多个会话间共享
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<[FundingRecord]>,
}

impl Dataset {
    /// 空数据集
    pub fn empty() -> Self {
        Self {
            records: Arc::from(Vec::new()),
        }
    }

    /// 由已清洗的记录构造，违反约束时报错
    pub fn from_records(records: Vec<FundingRecord>) -> Result<Self, FundingError> {
        for (index, record) in records.iter().enumerate() {
            record
                .validate()
                .map_err(|reason| FundingError::InvalidRecord { index, reason })?;
        }
        Ok(Self {
            records: Arc::from(records),
        })
    }

    /// 由原始行构造，无效行被丢弃并计数
    pub fn from_raw(raw: &[RawFundingRecord]) -> (Self, LoadReport) {
        let mut report = LoadReport {
            rows_read: raw.len(),
            ..Default::default()
        };
        let mut records = Vec::with_capacity(raw.len());

        for (index, row) in raw.iter().enumerate() {
            match clean_record(row) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    tracing::debug!("丢弃第 {} 行: {:?}", index, reason);
                    report.record_drop(reason);
                }
            }
        }
        report.rows_kept = records.len();

        tracing::info!(
            "数据集加载完成，读取 {} 行，保留 {} 行，丢弃 {} 行",
            report.rows_read,
            report.rows_kept,
            report.rows_dropped()
        );

        (
            Self {
                records: Arc::from(records),
            },
            report,
        )
    }

    pub fn records(&self) -> &[FundingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FundingRecord> {
        self.records.iter()
    }

    /// 所有城市（去重排序）
    pub fn cities(&self) -> Vec<String> {
        self.distinct(|r| Some(r.city.clone()))
    }

    /// 所有年份（去重排序）
    pub fn years(&self) -> Vec<i32> {
        self.distinct(|r| Some(r.year()))
    }

    /// 所有行业（去重排序）
    pub fn industries(&self) -> Vec<String> {
        self.distinct(|r| Some(r.industry.clone()))
    }

    /// 所有融资类型标签（去重排序）
    pub fn investment_types(&self) -> Vec<String> {
        self.distinct(|r| r.investment_type.as_ref().map(|t| t.label().to_string()))
    }

    /// 金额上下界，用于构建金额区间滑块
    pub fn amount_bounds(&self) -> Option<AmountRange> {
        amount_bounds(self.records.iter())
    }

    fn distinct<T, F>(&self, f: F) -> Vec<T>
    where
        T: Ord,
        F: Fn(&FundingRecord) -> Option<T>,
    {
        self.records
            .iter()
            .filter_map(f)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a FundingRecord;
    type IntoIter = std::slice::Iter<'a, FundingRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(amount: Option<&str>, date: Option<&str>, city: Option<&str>) -> RawFundingRecord {
        RawFundingRecord {
            startup_name: Some("Acme".to_string()),
            investors: Some("Inv1, Inv2".to_string()),
            city: city.map(str::to_string),
            industry: Some("FinTech".to_string()),
            amount: amount.map(str::to_string),
            date: date.map(str::to_string),
            investment_type: Some("Seed/ Angel Funding".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,000,000"), Some(1_000_000.0));
        assert_eq!(parse_amount(" 2500 "), Some(2500.0));
        assert_eq!(parse_amount("undisclosed"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("-5"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2017, 8, 1).unwrap();
        assert_eq!(parse_date("2017-08-01"), Some(expected));
        assert_eq!(parse_date("01/08/2017"), Some(expected));
        assert_eq!(parse_date("01.08.2017"), Some(expected));
        assert_eq!(parse_date("05/072018"), None);
    }

    #[test]
    fn test_clean_record_normalizes_fields() {
        let record = clean_record(&raw(Some("1,500"), Some("01/02/2016"), Some(" Pune ")))
            .unwrap();
        assert_eq!(record.city, "Pune");
        assert_eq!(record.amount_usd, 1500.0);
        assert_eq!(record.investor_names, vec!["Inv1", "Inv2"]);
        assert_eq!(record.investment_type, Some(InvestmentType::SeedFunding));
        assert_eq!(record.year(), 2016);
        assert_eq!(record.month(), 2);
    }

    #[test]
    fn test_from_raw_counts_drops() {
        let rows = vec![
            raw(Some("100"), Some("2016-01-01"), Some("Pune")),
            raw(Some("n/a"), Some("2016-01-01"), Some("Pune")),
            raw(Some("100"), Some("garbage"), Some("Pune")),
            raw(Some("100"), Some("2016-01-01"), None),
            RawFundingRecord {
                startup_name: Some("  ".to_string()),
                ..raw(Some("100"), Some("2016-01-01"), Some("Pune"))
            },
        ];

        let (dataset, report) = Dataset::from_raw(&rows);
        assert_eq!(dataset.len(), 1);
        assert_eq!(report.rows_read, 5);
        assert_eq!(report.rows_kept, 1);
        assert_eq!(report.dropped_amount, 1);
        assert_eq!(report.dropped_date, 1);
        assert_eq!(report.dropped_city, 1);
        assert_eq!(report.dropped_startup, 1);
        assert_eq!(report.rows_dropped(), 4);
    }

    #[test]
    fn test_missing_industry_becomes_unknown() {
        let row = RawFundingRecord {
            industry: None,
            ..raw(Some("100"), Some("2016-01-01"), Some("Pune"))
        };
        assert_eq!(clean_record(&row).unwrap().industry, UNKNOWN_INDUSTRY);
    }

    #[test]
    fn test_from_records_rejects_invalid() {
        let good = clean_record(&raw(Some("100"), Some("2016-01-01"), Some("Pune"))).unwrap();
        let mut bad = good.clone();
        bad.amount_usd = -1.0;
        let err = Dataset::from_records(vec![good, bad]).unwrap_err();
        assert!(matches!(err, FundingError::InvalidRecord { index: 1, .. }));
    }

    #[test]
    fn test_option_helpers() {
        let rows = vec![
            raw(Some("100"), Some("2016-01-01"), Some("Pune")),
            raw(Some("300"), Some("2015-01-01"), Some("Delhi")),
            raw(Some("200"), Some("2016-03-01"), Some("Pune")),
        ];
        let (dataset, _) = Dataset::from_raw(&rows);
        assert_eq!(dataset.cities(), vec!["Delhi", "Pune"]);
        assert_eq!(dataset.years(), vec![2015, 2016]);
        assert_eq!(dataset.investment_types(), vec!["Seed Funding"]);
        let bounds = dataset.amount_bounds().unwrap();
        assert_eq!((bounds.min, bounds.max), (100.0, 300.0));
        assert!(Dataset::empty().amount_bounds().is_none());
    }

    #[test]
    fn test_raw_record_accepts_numeric_amount() {
        let row: RawFundingRecord =
            serde_json::from_str(r#"{"startup_name":"A","amount":2500,"date":"2016-01-01"}"#)
                .unwrap();
        assert_eq!(row.amount.as_deref(), Some("2500"));
    }
}
