//! 查询引擎模块
//!
//! 对只读数据集执行筛选，并计算排名、时间趋势和汇总指标。
//! 所有操作都是纯函数：不修改输入，不做IO，空结果是正常输出而不是错误。

use crate::core::models::{
    AmountRange, Aggregatable, FilterCriteria, FundingRecord, GroupKey, InvestorRow, Period,
    PeriodTotal, RankedCount, RankedEntry, ShareEntry, SummaryMetrics,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::mem;

/// 金额上下界，空输入返回 None
pub fn amount_bounds<'a, I>(records: I) -> Option<AmountRange>
where
    I: IntoIterator<Item = &'a FundingRecord>,
{
    records.into_iter().fold(None, |bounds, r| match bounds {
        None => Some(AmountRange::new(r.amount_usd, r.amount_usd)),
        Some(b) => Some(AmountRange::new(
            b.min.min(r.amount_usd),
            b.max.max(r.amount_usd),
        )),
    })
}

/// 分组汇总：(分组值, 金额合计, 行数)，按首次出现顺序
struct GroupTotals {
    groups: Vec<(String, f64, usize)>,
}

impl GroupTotals {
    fn collect<R: Aggregatable>(rows: &[R], key: GroupKey) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(String, f64, usize)> = Vec::new();

        for row in rows {
            let Some(value) = row.group_value(key) else {
                continue;
            };
            match index.get(value).copied() {
                Some(pos) => {
                    groups[pos].1 += row.amount_usd();
                    groups[pos].2 += 1;
                }
                None => {
                    index.insert(value, groups.len());
                    groups.push((value.to_string(), row.amount_usd(), 1));
                }
            }
        }

        Self { groups }
    }

    /// 按金额降序（稳定排序，并列时保持首次出现顺序）
    fn sorted_by_total(mut self) -> Vec<(String, f64, usize)> {
        self.groups.sort_by(|a, b| b.1.total_cmp(&a.1));
        self.groups
    }

    /// 按行数降序（稳定排序）
    fn sorted_by_count(mut self) -> Vec<(String, f64, usize)> {
        self.groups.sort_by(|a, b| b.2.cmp(&a.2));
        self.groups
    }
}

/// 融资查询引擎
///
/// 无状态，多个会话可以对同一个数据集快照并发调用，各自传入自己的筛选条件。
pub struct FundingQueryEngine;

impl FundingQueryEngine {
    /// 按条件筛选记录，保持原有顺序
    pub fn filter<'a, I>(records: I, criteria: &FilterCriteria) -> Vec<FundingRecord>
    where
        I: IntoIterator<Item = &'a FundingRecord>,
    {
        let subset: Vec<FundingRecord> = records
            .into_iter()
            .filter(|r| criteria.matches(r))
            .cloned()
            .collect();

        tracing::debug!("筛选完成 [{}]，命中 {} 条", criteria, subset.len());
        subset
    }

    /// 把记录按投资方展开
    ///
    /// 每个有效投资方一行，每行都计入完整金额。
    /// 多投资方的交易会在投资方维度上重复计数，这是预期行为。
    pub fn explode_investors<'a, I>(records: I) -> Vec<InvestorRow>
    where
        I: IntoIterator<Item = &'a FundingRecord>,
    {
        let mut rows = Vec::new();
        for record in records {
            for investor in record.disclosed_investors() {
                rows.push(InvestorRow {
                    investor: investor.to_string(),
                    startup_name: record.startup_name.clone(),
                    city: record.city.clone(),
                    industry: record.industry.clone(),
                    sub_industry: record.sub_industry.clone(),
                    investment_type: record.investment_type.clone(),
                    amount_usd: record.amount_usd,
                    date: record.date,
                });
            }
        }
        rows
    }

    /// 按分组字段求和，返回金额最大的前n组
    pub fn top_n_by_sum<R: Aggregatable>(rows: &[R], key: GroupKey, n: usize) -> Vec<RankedEntry> {
        if n == 0 {
            return Vec::new();
        }

        GroupTotals::collect(rows, key)
            .sorted_by_total()
            .into_iter()
            .take(n)
            .map(|(label, total, _)| RankedEntry { label, total })
            .collect()
    }

    /// 按行数排名，返回笔数最多的前n组
    pub fn deal_count_by_group<R: Aggregatable>(
        rows: &[R],
        key: GroupKey,
        n: usize,
    ) -> Vec<RankedCount> {
        if n == 0 {
            return Vec::new();
        }

        GroupTotals::collect(rows, key)
            .sorted_by_count()
            .into_iter()
            .take(n)
            .map(|(label, _, count)| RankedCount { label, count })
            .collect()
    }

    /// 每组金额及其占总额的比例
    pub fn share_by_group<R: Aggregatable>(rows: &[R], key: GroupKey) -> Vec<ShareEntry> {
        let groups = GroupTotals::collect(rows, key).sorted_by_total();
        let grand_total: f64 = groups.iter().map(|(_, total, _)| total).sum();

        groups
            .into_iter()
            .map(|(label, total, _)| ShareEntry {
                label,
                total,
                fraction: if grand_total > 0.0 {
                    total / grand_total
                } else {
                    0.0
                },
            })
            .collect()
    }

    /// 按时间段求和，按时间先后排序，没有记录的时间段不出现
    pub fn aggregate_by_period<'a, I>(records: I, period: Period) -> Vec<PeriodTotal>
    where
        I: IntoIterator<Item = &'a FundingRecord>,
    {
        let mut totals = BTreeMap::new();
        for record in records {
            *totals.entry(period.key_of(record.date)).or_insert(0.0) += record.amount_usd;
        }

        totals
            .into_iter()
            .map(|(period, total)| PeriodTotal { period, total })
            .collect()
    }

    /// 补齐首尾之间缺失的时间段（金额为0）
    ///
    /// 输入需为 [`aggregate_by_period`](Self::aggregate_by_period) 的输出；
    /// 混合了不同粒度的输入原样返回。
    pub fn densify(totals: &[PeriodTotal]) -> Vec<PeriodTotal> {
        let (Some(first), Some(last)) = (totals.first(), totals.last()) else {
            return Vec::new();
        };
        let kind = mem::discriminant(&first.period);
        if totals.iter().any(|t| mem::discriminant(&t.period) != kind) {
            return totals.to_vec();
        }

        let present: BTreeMap<_, _> = totals.iter().map(|t| (t.period, t.total)).collect();
        let mut dense = Vec::new();
        let mut current = first.period;
        while current <= last.period {
            dense.push(PeriodTotal {
                period: current,
                total: present.get(&current).copied().unwrap_or(0.0),
            });
            current = current.next();
        }
        dense
    }

    /// 汇总指标
    pub fn summary_metrics(records: &[FundingRecord]) -> SummaryMetrics {
        let total: f64 = records.iter().map(|r| r.amount_usd).sum();
        let count = records.len();
        let mean = if count == 0 {
            None
        } else {
            Some(total / count as f64)
        };
        let unique_investor_count = records
            .iter()
            .flat_map(|r| r.disclosed_investors())
            .collect::<BTreeSet<_>>()
            .len();

        SummaryMetrics {
            total,
            count,
            mean,
            unique_investor_count,
        }
    }
}
