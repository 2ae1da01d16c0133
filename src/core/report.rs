//! 仪表盘报告模块
//!
//! 对一组筛选条件一次性计算仪表盘上的所有面板：
//! 头部公司、头部投资方、城市、行业、趋势线、融资类型占比和汇总指标。

use crate::core::dataset::Dataset;
use crate::core::models::{
    AmountRange, FilterCriteria, GroupKey, Period, PeriodTotal, RankedCount, RankedEntry,
    ShareEntry, SummaryMetrics,
};
use crate::core::query_engine::{amount_bounds, FundingQueryEngine};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// 仪表盘报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    /// 使用的筛选条件
    pub criteria: FilterCriteria,
    /// 筛选后的记录数
    pub record_count: usize,
    /// 筛选结果为空（“无数据”，不是错误）
    pub is_empty: bool,
    pub summary: SummaryMetrics,
    pub top_startups: Vec<RankedEntry>,
    pub top_investors: Vec<RankedEntry>,
    pub most_active_investors: Vec<RankedCount>,
    pub top_cities: Vec<RankedEntry>,
    pub top_industries: Vec<RankedEntry>,
    pub trend_period: Period,
    pub trend: Vec<PeriodTotal>,
    pub investment_type_share: Vec<ShareEntry>,
    /// 筛选结果的金额范围
    pub amount_bounds: Option<AmountRange>,
}

impl DashboardReport {
    /// 渲染为纯文本摘要
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "筛选条件: {}", self.criteria);

        if self.is_empty {
            let _ = writeln!(out, "没有符合条件的数据");
            return out;
        }

        let _ = writeln!(out, "记录数: {}", self.summary.count);
        let _ = writeln!(out, "总金额: {}", format_usd(self.summary.total));
        if let Some(mean) = self.summary.mean {
            let _ = writeln!(out, "平均金额: {}", format_usd(mean));
        }
        let _ = writeln!(out, "投资方数量: {}", self.summary.unique_investor_count);

        write_ranked(&mut out, "头部创业公司", &self.top_startups);
        write_ranked(&mut out, "头部投资方", &self.top_investors);
        write_ranked(&mut out, "城市", &self.top_cities);
        write_ranked(&mut out, "行业", &self.top_industries);

        if !self.most_active_investors.is_empty() {
            let _ = writeln!(out, "\n[最活跃投资方]");
            for (i, entry) in self.most_active_investors.iter().enumerate() {
                let _ = writeln!(out, "{:>3}. {} ({} 笔)", i + 1, entry.label, entry.count);
            }
        }

        let _ = writeln!(out, "\n[趋势 - {}]", self.trend_period);
        for point in &self.trend {
            let _ = writeln!(out, "  {}  {}", point.period, format_usd(point.total));
        }

        if !self.investment_type_share.is_empty() {
            let _ = writeln!(out, "\n[融资类型占比]");
            for share in &self.investment_type_share {
                let _ = writeln!(
                    out,
                    "  {:<20} {:>6.1}%  {}",
                    share.label,
                    share.fraction * 100.0,
                    format_usd(share.total)
                );
            }
        }

        out
    }
}

fn write_ranked(out: &mut String, title: &str, entries: &[RankedEntry]) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n[{title}]");
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {}  {}", i + 1, entry.label, format_usd(entry.total));
    }
}

/// 金额格式化，带千分位
pub fn format_usd(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// 报告生成器
pub struct ReportBuilder {
    /// 排名面板条目数
    top_n: usize,
    /// 趋势线粒度
    trend_period: Period,
    /// 趋势线是否补齐空缺时间段
    dense_trend: bool,
}

impl ReportBuilder {
    /// 创建新的报告生成器
    pub fn new(top_n: usize, trend_period: Period) -> Self {
        Self {
            top_n,
            trend_period,
            dense_trend: false,
        }
    }

    /// 趋势线补齐空缺时间段
    pub fn dense_trend(mut self, dense: bool) -> Self {
        self.dense_trend = dense;
        self
    }

    /// 生成报告
    pub fn build(&self, dataset: &Dataset, criteria: &FilterCriteria) -> DashboardReport {
        let subset = FundingQueryEngine::filter(dataset, criteria);
        tracing::info!(
            "生成报告 [{}]，{} / {} 条记录",
            criteria,
            subset.len(),
            dataset.len()
        );

        let investor_rows = FundingQueryEngine::explode_investors(&subset);
        let mut trend = FundingQueryEngine::aggregate_by_period(&subset, self.trend_period);
        if self.dense_trend {
            trend = FundingQueryEngine::densify(&trend);
        }

        let report = DashboardReport {
            criteria: criteria.clone(),
            record_count: subset.len(),
            is_empty: subset.is_empty(),
            summary: FundingQueryEngine::summary_metrics(&subset),
            top_startups: FundingQueryEngine::top_n_by_sum(&subset, GroupKey::Startup, self.top_n),
            top_investors: FundingQueryEngine::top_n_by_sum(
                &investor_rows,
                GroupKey::Investor,
                self.top_n,
            ),
            most_active_investors: FundingQueryEngine::deal_count_by_group(
                &investor_rows,
                GroupKey::Investor,
                self.top_n,
            ),
            top_cities: FundingQueryEngine::top_n_by_sum(&subset, GroupKey::City, self.top_n),
            top_industries: FundingQueryEngine::top_n_by_sum(
                &subset,
                GroupKey::Industry,
                self.top_n,
            ),
            trend_period: self.trend_period,
            trend,
            investment_type_share: FundingQueryEngine::share_by_group(
                &subset,
                GroupKey::InvestmentType,
            ),
            amount_bounds: amount_bounds(&subset),
        };

        tracing::debug!(
            "面板大小: 公司 {}，投资方 {}，趋势 {}",
            report.top_startups.len(),
            report.top_investors.len(),
            report.trend.len()
        );
        report
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(10, Period::YearMonth)
    }
}
