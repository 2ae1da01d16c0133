//! FundLens 命令行入口
//!
//! 加载数据集快照，按命令行参数或已保存的预设筛选，输出仪表盘报告。

use anyhow::{Context, Result};
use clap::Parser;
use fundlens::core::models::{FilterCriteria, FilterPreset, Period};
use fundlens::core::presets::PresetRegistry;
use fundlens::core::report::ReportBuilder;
use fundlens::storage::config::ConfigManager;
use fundlens::storage::database::Database;
use fundlens::storage::snapshot::{load_raw_snapshot, load_snapshot};
use fundlens::{Dataset, FundingError};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "fundlens", about = "创业融资数据筛选与聚合")]
struct Cli {
    /// 数据集快照（JSON），缺省时使用配置中的路径
    #[arg(long)]
    data: Option<PathBuf>,

    /// 快照为未清洗的原始行
    #[arg(long)]
    raw: bool,

    /// 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long = "city")]
    cities: Vec<String>,

    #[arg(long = "year")]
    years: Vec<i32>,

    #[arg(long, requires = "to_year")]
    from_year: Option<i32>,

    #[arg(long, requires = "from_year")]
    to_year: Option<i32>,

    #[arg(long = "industry")]
    industries: Vec<String>,

    #[arg(long = "investment-type")]
    investment_types: Vec<String>,

    #[arg(long)]
    min_amount: Option<f64>,

    #[arg(long)]
    max_amount: Option<f64>,

    #[arg(long = "month", value_parser = clap::value_parser!(u32).range(1..=12))]
    months: Vec<u32>,

    /// 使用已保存的预设
    #[arg(long, conflicts_with_all = ["cities", "years", "from_year", "industries", "investment_types", "min_amount", "max_amount", "months"])]
    preset: Option<String>,

    /// 把本次筛选条件保存为预设
    #[arg(long)]
    save_preset: Option<String>,

    /// 排名面板条目数
    #[arg(long)]
    top: Option<usize>,

    /// 趋势线粒度: month | year-month | year
    #[arg(long)]
    period: Option<Period>,

    /// 趋势线补齐空缺时间段
    #[arg(long)]
    dense: bool,

    /// 以JSON输出报告
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// 由命令行参数构造筛选条件
    fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::all()
            .with_cities(&self.cities)
            .with_years(self.years.iter().copied())
            .with_industries(&self.industries)
            .with_investment_types(&self.investment_types)
            .with_months(self.months.iter().copied());

        if let (Some(from), Some(to)) = (self.from_year, self.to_year) {
            criteria = criteria.with_year_range(from, to);
        }
        if self.min_amount.is_some() || self.max_amount.is_some() {
            criteria = criteria.with_amount_range(
                self.min_amount.unwrap_or(0.0),
                self.max_amount.unwrap_or(f64::MAX),
            );
        }
        criteria
    }
}

fn load_dataset(path: &Path, raw: bool) -> Result<Dataset, FundingError> {
    if raw {
        let (dataset, report) = load_raw_snapshot(path)?;
        if report.rows_dropped() > 0 {
            tracing::info!(
                "清洗丢弃: 金额 {}，日期 {}，公司名 {}，城市 {}",
                report.dropped_amount,
                report.dropped_date,
                report.dropped_startup,
                report.dropped_city
            );
        }
        Ok(dataset)
    } else {
        load_snapshot(path)
    }
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ConfigManager::default_path);
    let config = ConfigManager::new(config_path).load()?;

    let data_path = cli
        .data
        .clone()
        .or_else(|| config.dataset_path.clone())
        .ok_or_else(|| FundingError::Configuration("未指定数据集路径 (--data)".to_string()))?;
    let dataset = load_dataset(&data_path, cli.raw)
        .with_context(|| format!("加载数据集失败: {}", data_path.display()))?;

    let preset_name = cli.preset.clone().or_else(|| {
        let has_flags = !cli.criteria().is_unrestricted();
        if has_flags {
            None
        } else {
            config.default_preset.clone()
        }
    });

    // 只有用到或保存预设时才打开数据库
    let db = if preset_name.is_some() || cli.save_preset.is_some() {
        let db_path = config
            .database_path
            .clone()
            .unwrap_or_else(ConfigManager::default_database_path);
        Some(Database::open(&db_path)?)
    } else {
        None
    };

    let criteria = match (preset_name, &db) {
        (Some(name), Some(db)) => {
            // 预设：内置 + 数据库中的用户预设
            let mut registry = PresetRegistry::new();
            for preset in db.load_user_presets()? {
                registry.add(preset);
            }
            let criteria = registry
                .resolve(&name)
                .ok_or_else(|| FundingError::UnknownPreset(name.clone()))?;
            if let Some(preset) = registry.find_by_name(&name) {
                db.record_hit(&preset.id)?;
            }
            criteria
        }
        _ => cli.criteria(),
    };

    if let (Some(name), Some(db)) = (&cli.save_preset, &db) {
        let preset = FilterPreset::new(name.clone(), criteria.clone());
        db.save_preset(&preset)?;
        tracing::info!("已保存预设: {}", name);
    }

    let top_n = cli.top.unwrap_or(config.top_n);
    let period = cli.period.unwrap_or(config.trend_period);
    let report = ReportBuilder::new(top_n, period)
        .dense_trend(cli.dense)
        .build(&dataset, &criteria);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    Ok(())
}
