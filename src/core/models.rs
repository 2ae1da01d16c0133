//! 核心数据模型定义
//!
//! 融资记录、筛选条件以及各类聚合结果的数据结构。
//! 数据集一经加载即为只读，这里的类型都不提供修改数据集的入口。

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 不计入投资方聚合的占位投资方名称
pub const UNDISCLOSED_INVESTORS: &str = "Undisclosed Investors";

/// 字符串筛选中表示“全部”的哨兵值
pub const ALL_SENTINEL: &str = "All";

/// 判断投资方名称是否应从投资方聚合中排除
pub fn is_excluded_investor(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNDISCLOSED_INVESTORS)
}

/// 融资记录 - 核心数据结构
/// 描述一次融资事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRecord {
    /// 稳定唯一标识符（基于内容的hash）
    pub id: String,
    /// 创业公司名称
    pub startup_name: String,
    /// 投资方列表（保留原始顺序，包括未披露的占位名称）
    pub investor_names: Vec<String>,
    /// 所在城市
    pub city: String,
    /// 行业
    pub industry: String,
    /// 细分行业（可选）
    pub sub_industry: Option<String>,
    /// 融资金额（美元）
    pub amount_usd: f64,
    /// 融资日期
    pub date: NaiveDate,
    /// 融资类型（已归一化）
    pub investment_type: Option<InvestmentType>,
}

impl FundingRecord {
    /// 创建新的融资记录
    pub fn new(
        startup_name: String,
        investor_names: Vec<String>,
        city: String,
        industry: String,
        amount_usd: f64,
        date: NaiveDate,
    ) -> Self {
        use sha2::{Digest, Sha256};

        // 生成稳定ID
        let mut hasher = Sha256::new();
        hasher.update(startup_name.as_bytes());
        hasher.update(date.to_string().as_bytes());
        hasher.update(amount_usd.to_bits().to_le_bytes());
        for investor in &investor_names {
            hasher.update(b"\x1f");
            hasher.update(investor.as_bytes());
        }
        let id = hex::encode(&hasher.finalize()[..16]);

        Self {
            id,
            startup_name,
            investor_names,
            city,
            industry,
            sub_industry: None,
            amount_usd,
            date,
            investment_type: None,
        }
    }

    /// 设置细分行业
    pub fn with_sub_industry(mut self, sub_industry: impl Into<String>) -> Self {
        self.sub_industry = Some(sub_industry.into());
        self
    }

    /// 设置融资类型
    pub fn with_investment_type(mut self, investment_type: InvestmentType) -> Self {
        self.investment_type = Some(investment_type);
        self
    }

    /// 融资年份
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// 融资月份（1-12）
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// 参与投资方聚合的投资方名称
    ///
    /// 去除首尾空白，排除空字符串和 "Undisclosed Investors"，
    /// 同一条记录内重复出现的名称只保留第一次。
    pub fn disclosed_investors(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.investor_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !is_excluded_investor(name))
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// 检查记录是否满足数据集不变量
    pub fn validate(&self) -> Result<(), String> {
        if self.startup_name.trim().is_empty() {
            return Err("创业公司名称为空".to_string());
        }
        if self.city.trim().is_empty() {
            return Err("城市为空".to_string());
        }
        if !self.amount_usd.is_finite() || self.amount_usd < 0.0 {
            return Err(format!("金额无效: {}", self.amount_usd));
        }
        Ok(())
    }
}

/// 融资类型
/// 加载时把各种同义写法归一化为规范标签
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvestmentType {
    SeedFunding,
    PrivateEquity,
    DebtFunding,
    CrowdFunding,
    /// 其他类型，保留原始标签
    Other(String),
}

impl InvestmentType {
    /// 规范显示标签
    pub fn label(&self) -> &str {
        match self {
            InvestmentType::SeedFunding => "Seed Funding",
            InvestmentType::PrivateEquity => "Private Equity",
            InvestmentType::DebtFunding => "Debt Funding",
            InvestmentType::CrowdFunding => "Crowd Funding",
            InvestmentType::Other(label) => label,
        }
    }

    /// 归一化原始标签，空标签返回 None
    pub fn normalize(raw: &str) -> Option<Self> {
        // 源数据中存在字面量 "\n"
        let cleaned = raw.replace("\\n", " ");
        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return None;
        }

        let key: String = collapsed
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        let normalized = match key.as_str() {
            "seedfunding" | "seedangelfunding" | "angelseedfunding" | "angelfunding"
            | "seedangel" | "seed" => InvestmentType::SeedFunding,
            "privateequity" | "privateequityround" => InvestmentType::PrivateEquity,
            "debtfunding" | "debt" => InvestmentType::DebtFunding,
            "crowdfunding" => InvestmentType::CrowdFunding,
            _ => InvestmentType::Other(collapsed),
        };
        Some(normalized)
    }
}

impl From<String> for InvestmentType {
    fn from(raw: String) -> Self {
        match InvestmentType::normalize(&raw) {
            Some(t) => t,
            None => InvestmentType::Other(raw),
        }
    }
}

impl From<InvestmentType> for String {
    fn from(t: InvestmentType) -> Self {
        t.label().to_string()
    }
}

impl fmt::Display for InvestmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 多值字段的筛选选择
///
/// `Only` 携带空集合时与 `All` 等价。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(bound(deserialize = "T: Deserialize<'de> + Ord"))]
pub enum Selection<T> {
    /// 不限制
    All,
    /// 只允许集合中的值
    Only(BTreeSet<T>),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: Ord> Selection<T> {
    /// 由一组值构造，空集合视为不限制
    pub fn only(values: impl IntoIterator<Item = T>) -> Self {
        let set: BTreeSet<T> = values.into_iter().collect();
        if set.is_empty() {
            Selection::All
        } else {
            Selection::Only(set)
        }
    }

    /// 是否为不限制
    pub fn is_all(&self) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => set.is_empty(),
        }
    }

    /// 值是否通过筛选
    pub fn allows<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Selection::All => true,
            Selection::Only(set) => set.is_empty() || set.contains(value),
        }
    }
}

fn is_all_sentinel(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(ALL_SENTINEL)
}

impl Selection<String> {
    /// 字符串值是否通过筛选，集合中含 "All" 时不限制
    pub fn allows_choice(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => {
                set.is_empty() || set.contains(value) || set.iter().any(|v| is_all_sentinel(v))
            }
        }
    }

    /// 由单选控件的值构造，"All" 或空字符串表示不限制
    pub fn from_choice(choice: &str) -> Self {
        Self::from_choices([choice])
    }

    /// 由多选控件的值构造，任一值为 "All" 即不限制
    pub fn from_choices<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for choice in choices {
            let choice = choice.as_ref().trim();
            if is_all_sentinel(choice) {
                return Selection::All;
            }
            if !choice.is_empty() {
                set.insert(choice.to_string());
            }
        }
        Selection::only(set)
    }
}

/// 年份筛选
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum YearFilter {
    /// 不限制
    #[default]
    Any,
    /// 指定年份集合
    Set(BTreeSet<i32>),
    /// 闭区间
    Range { from: i32, to: i32 },
}

impl YearFilter {
    /// 年份是否通过筛选
    pub fn allows(&self, year: i32) -> bool {
        match self {
            YearFilter::Any => true,
            YearFilter::Set(years) => years.is_empty() || years.contains(&year),
            YearFilter::Range { from, to } => (*from..=*to).contains(&year),
        }
    }

    /// 是否为不限制
    pub fn is_any(&self) -> bool {
        match self {
            YearFilter::Any => true,
            YearFilter::Set(years) => years.is_empty(),
            YearFilter::Range { .. } => false,
        }
    }
}

/// 金额闭区间
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// 金额是否落在区间内（min > max 时不匹配任何值）
    pub fn contains(&self, amount: f64) -> bool {
        self.min <= amount && amount <= self.max
    }
}

/// 筛选条件
/// 字段之间为AND关系，字段内部为成员关系
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FilterCriteria {
    #[serde(default)]
    pub cities: Selection<String>,
    #[serde(default)]
    pub years: YearFilter,
    #[serde(default)]
    pub industries: Selection<String>,
    /// 按规范标签比较
    #[serde(default)]
    pub investment_types: Selection<String>,
    #[serde(default)]
    pub amount_range: Option<AmountRange>,
    /// 月份（1-12）
    #[serde(default)]
    pub months: Selection<u32>,
}

impl FilterCriteria {
    /// 不做任何限制的条件
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cities = Selection::from_choices(cities);
        self
    }

    pub fn with_years(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        let set: BTreeSet<i32> = years.into_iter().collect();
        self.years = if set.is_empty() {
            YearFilter::Any
        } else {
            YearFilter::Set(set)
        };
        self
    }

    pub fn with_year_range(mut self, from: i32, to: i32) -> Self {
        self.years = YearFilter::Range { from, to };
        self
    }

    pub fn with_industries<I, S>(mut self, industries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.industries = Selection::from_choices(industries);
        self
    }

    /// 设置融资类型筛选，输入标签先做同义词归一化
    pub fn with_investment_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.investment_types = match Selection::from_choices(types) {
            Selection::All => Selection::All,
            Selection::Only(labels) => Selection::only(
                labels
                    .iter()
                    .filter_map(|l| InvestmentType::normalize(l))
                    .map(|t| t.label().to_string()),
            ),
        };
        self
    }

    pub fn with_amount_range(mut self, min: f64, max: f64) -> Self {
        self.amount_range = Some(AmountRange::new(min, max));
        self
    }

    /// 设置月份筛选，超出1-12的值被忽略
    pub fn with_months(mut self, months: impl IntoIterator<Item = u32>) -> Self {
        self.months = Selection::only(months.into_iter().filter(|m| (1..=12).contains(m)));
        self
    }

    /// 是否不做任何限制
    pub fn is_unrestricted(&self) -> bool {
        self.cities.is_all()
            && self.years.is_any()
            && self.industries.is_all()
            && self.investment_types.is_all()
            && self.amount_range.is_none()
            && self.months.is_all()
    }

    /// 融资类型是否通过筛选
    ///
    /// 条件中的标签在比较前做同义词归一化，
    /// 反序列化得到的条件（导入的预设、数据库）不一定经过构造器。
    pub fn allows_investment_type(&self, investment_type: Option<&InvestmentType>) -> bool {
        let labels = match &self.investment_types {
            Selection::Only(labels) if !labels.is_empty() => labels,
            _ => return true,
        };
        if labels.iter().any(|l| is_all_sentinel(l)) {
            return true;
        }
        match investment_type {
            Some(t) => labels
                .iter()
                .any(|l| InvestmentType::normalize(l).as_ref() == Some(t)),
            None => false,
        }
    }

    /// 检查记录是否匹配此条件
    pub fn matches(&self, record: &FundingRecord) -> bool {
        // 检查城市
        if !self.cities.allows_choice(&record.city) {
            return false;
        }

        // 检查年份和月份
        if !self.years.allows(record.year()) {
            return false;
        }
        if !self.months.allows(&record.month()) {
            return false;
        }

        // 检查行业
        if !self.industries.allows_choice(&record.industry) {
            return false;
        }

        // 检查融资类型，缺失类型的记录不通过有限制的筛选
        if !self.allows_investment_type(record.investment_type.as_ref()) {
            return false;
        }

        // 检查金额
        if let Some(range) = self.amount_range {
            if !range.contains(record.amount_usd) {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(selection: &Selection<T>) -> String {
            match selection {
                Selection::Only(set) if !set.is_empty() => set
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("|"),
                _ => ALL_SENTINEL.to_string(),
            }
        }

        let years = match &self.years {
            YearFilter::Set(set) if !set.is_empty() => set
                .iter()
                .map(|y| y.to_string())
                .collect::<Vec<_>>()
                .join("|"),
            YearFilter::Range { from, to } => format!("{from}..={to}"),
            _ => ALL_SENTINEL.to_string(),
        };
        let amount = match self.amount_range {
            Some(range) => format!("{}..={}", range.min, range.max),
            None => ALL_SENTINEL.to_string(),
        };

        write!(
            f,
            "city={} year={} month={} industry={} type={} amount={}",
            join(&self.cities),
            years,
            join(&self.months),
            join(&self.industries),
            join(&self.investment_types),
            amount
        )
    }
}

/// 分组字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Startup,
    Investor,
    City,
    Industry,
    SubIndustry,
    InvestmentType,
}

/// 可参与分组求和的行
pub trait Aggregatable {
    /// 参与求和的金额
    fn amount_usd(&self) -> f64;
    /// 分组字段的取值，缺失时返回 None（该行不参与分组）
    fn group_value(&self, key: GroupKey) -> Option<&str>;
}

impl Aggregatable for FundingRecord {
    fn amount_usd(&self) -> f64 {
        self.amount_usd
    }

    /// 记录本身不按投资方分组，需要先展开为 [`InvestorRow`]
    fn group_value(&self, key: GroupKey) -> Option<&str> {
        match key {
            GroupKey::Startup => Some(&self.startup_name),
            GroupKey::Investor => None,
            GroupKey::City => Some(&self.city),
            GroupKey::Industry => Some(&self.industry),
            GroupKey::SubIndustry => self.sub_industry.as_deref(),
            GroupKey::InvestmentType => self.investment_type.as_ref().map(|t| t.label()),
        }
    }
}

/// 投资方展开行
/// 一条记录有k个有效投资方就展开为k行，每行都计入完整金额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorRow {
    pub investor: String,
    pub startup_name: String,
    pub city: String,
    pub industry: String,
    pub sub_industry: Option<String>,
    pub investment_type: Option<InvestmentType>,
    pub amount_usd: f64,
    pub date: NaiveDate,
}

impl Aggregatable for InvestorRow {
    fn amount_usd(&self) -> f64 {
        self.amount_usd
    }

    fn group_value(&self, key: GroupKey) -> Option<&str> {
        match key {
            GroupKey::Startup => Some(&self.startup_name),
            GroupKey::Investor => Some(&self.investor),
            GroupKey::City => Some(&self.city),
            GroupKey::Industry => Some(&self.industry),
            GroupKey::SubIndustry => self.sub_industry.as_deref(),
            GroupKey::InvestmentType => self.investment_type.as_ref().map(|t| t.label()),
        }
    }
}

/// 排名条目（按金额）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub label: String,
    pub total: f64,
}

/// 排名条目（按笔数）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCount {
    pub label: String,
    pub count: usize,
}

/// 占比条目（饼图数据）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareEntry {
    pub label: String,
    pub total: f64,
    /// 占总额的比例（0.0 - 1.0）
    pub fraction: f64,
}

/// 时间粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    /// 按月（用于单一年份内）
    Month,
    /// 按年月（跨年趋势线）
    #[default]
    YearMonth,
    /// 按年
    Year,
}

impl Period {
    /// 记录所属的时间段
    pub fn key_of(&self, date: NaiveDate) -> PeriodKey {
        match self {
            Period::Month => PeriodKey::Month(date.month()),
            Period::YearMonth => PeriodKey::YearMonth {
                year: date.year(),
                month: date.month(),
            },
            Period::Year => PeriodKey::Year(date.year()),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" => Ok(Period::Month),
            "year-month" | "year_month" | "yearmonth" => Ok(Period::YearMonth),
            "year" => Ok(Period::Year),
            other => Err(format!("未知的时间粒度: {other}")),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month => write!(f, "month"),
            Period::YearMonth => write!(f, "year-month"),
            Period::Year => write!(f, "year"),
        }
    }
}

/// 时间段键，按时间先后排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKey {
    Month(u32),
    YearMonth { year: i32, month: u32 },
    Year(i32),
}

impl PeriodKey {
    /// 下一个日历时间段
    pub fn next(&self) -> PeriodKey {
        match *self {
            PeriodKey::Month(month) => PeriodKey::Month(month + 1),
            PeriodKey::YearMonth { year, month } if month >= 12 => PeriodKey::YearMonth {
                year: year + 1,
                month: 1,
            },
            PeriodKey::YearMonth { year, month } => PeriodKey::YearMonth {
                year,
                month: month + 1,
            },
            PeriodKey::Year(year) => PeriodKey::Year(year + 1),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Month(month) => write!(f, "{month:02}"),
            PeriodKey::YearMonth { year, month } => write!(f, "{year}-{month:02}"),
            PeriodKey::Year(year) => write!(f, "{year}"),
        }
    }
}

/// 时间段汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotal {
    pub period: PeriodKey,
    pub total: f64,
}

/// 汇总指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    /// 金额合计
    pub total: f64,
    /// 记录数
    pub count: usize,
    /// 平均金额，记录数为0时为 None
    pub mean: Option<f64>,
    /// 不同投资方数量
    pub unique_investor_count: usize,
}

/// 筛选预设
/// 命名保存的一组筛选条件，取代侧边栏控件的隐式状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    /// 预设唯一ID
    pub id: String,
    /// 预设名称（用于显示和查找）
    pub name: String,
    /// 筛选条件
    pub criteria: FilterCriteria,
    /// 预设来源
    pub origin: PresetOrigin,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 最后修改时间
    pub updated_at: DateTime<Utc>,
    /// 使用次数（统计用）
    pub hit_count: u64,
}

impl FilterPreset {
    /// 创建新的用户预设
    pub fn new(name: String, criteria: FilterCriteria) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        Self {
            id,
            name,
            criteria,
            origin: PresetOrigin::User,
            created_at: now,
            updated_at: now,
            hit_count: 0,
        }
    }
}

/// 预设来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresetOrigin {
    /// 用户保存的预设
    User,
    /// 系统内置预设
    BuiltIn,
}

/// 应用配置
/// 配置文件中缺失的字段取默认值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 默认数据集快照路径
    pub dataset_path: Option<PathBuf>,
    /// 排名面板的条目数
    pub top_n: usize,
    /// 趋势线的时间粒度
    pub trend_period: Period,
    /// 预设数据库路径
    pub database_path: Option<PathBuf>,
    /// 启动时使用的预设名称
    pub default_preset: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            top_n: 10,
            trend_period: Period::YearMonth,
            database_path: None,
            default_preset: None,
        }
    }
}
