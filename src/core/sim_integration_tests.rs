use crate::core::dataset::{Dataset, RawFundingRecord};
use crate::core::models::{FilterCriteria, FilterPreset, GroupKey, Period, PeriodKey};
use crate::core::presets::PresetRegistry;
use crate::core::query_engine::FundingQueryEngine;
use crate::core::report::ReportBuilder;
use crate::storage::database::Database;
use crate::storage::snapshot::{load_raw_snapshot, load_snapshot, save_snapshot};
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn row(
    startup: &str,
    investors: &str,
    city: &str,
    industry: &str,
    amount: &str,
    date: &str,
    kind: &str,
) -> RawFundingRecord {
    RawFundingRecord {
        startup_name: Some(startup.to_string()),
        investors: Some(investors.to_string()),
        city: Some(city.to_string()),
        industry: Some(industry.to_string()),
        sub_industry: None,
        amount: Some(amount.to_string()),
        date: Some(date.to_string()),
        investment_type: Some(kind.to_string()),
    }
}

fn sample_rows() -> Vec<RawFundingRecord> {
    vec![
        row("Ola", "SoftBank, Tiger Global", "Bangalore", "Transport", "2,000,000", "05/03/2015", "Private Equity"),
        row("Zomato", "Info Edge", "Gurgaon", "Food", "500,000", "12/03/2015", "Seed/ Angel Funding"),
        row("Paytm", "Alibaba, SoftBank", "Noida", "FinTech", "4,000,000", "20/01/2016", "PrivateEquity"),
        row("Byju", "Undisclosed Investors", "Bangalore", "EdTech", "750,000", "02/07/2016", "SeedFunding"),
        row("Swiggy", "Accel, ", "Bangalore", "Food", "1,250,000", "15/11/2016", "Private Equity"),
        row("Broken", "Someone", "Pune", "Food", "N/A", "15/11/2016", "Seed Funding"),
        row("NoDate", "Someone", "Pune", "Food", "10", "unknown", "Seed Funding"),
    ]
}

#[test]
fn sim_raw_rows_to_dashboard() {
    let (dataset, load) = Dataset::from_raw(&sample_rows());
    assert_eq!(load.rows_read, 7);
    assert_eq!(load.rows_kept, 5);
    assert_eq!(load.dropped_amount, 1);
    assert_eq!(load.dropped_date, 1);

    let criteria = FilterCriteria::all()
        .with_cities(["Bangalore"])
        .with_year_range(2015, 2016);
    let report = ReportBuilder::new(10, Period::YearMonth).build(&dataset, &criteria);

    assert_eq!(report.record_count, 3);
    assert_eq!(report.summary.total, 4_000_000.0);
    assert_eq!(report.summary.unique_investor_count, 3);
    let labels: Vec<_> = report.top_startups.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["Ola", "Swiggy", "Byju"]);
    // Byju 只有未披露投资方，不出现在投资方排名中
    let investors: Vec<_> = report.top_investors.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(investors, vec!["SoftBank", "Tiger Global", "Accel"]);

    let periods: Vec<_> = report.trend.iter().map(|t| t.period).collect();
    assert_eq!(
        periods,
        vec![
            PeriodKey::YearMonth { year: 2015, month: 3 },
            PeriodKey::YearMonth { year: 2016, month: 7 },
            PeriodKey::YearMonth { year: 2016, month: 11 },
        ]
    );

    let pe = report
        .investment_type_share
        .iter()
        .find(|s| s.label == "Private Equity")
        .unwrap();
    assert_eq!(pe.total, 3_250_000.0);
}

#[test]
fn sim_seed_preset_over_whole_dataset() {
    let (dataset, _) = Dataset::from_raw(&sample_rows());
    let mut registry = PresetRegistry::new();
    let criteria = registry.resolve("Seed rounds").unwrap();

    let subset = FundingQueryEngine::filter(&dataset, &criteria);
    let names: Vec<_> = subset.iter().map(|r| r.startup_name.as_str()).collect();
    assert_eq!(names, vec!["Zomato", "Byju"]);

    let metrics = FundingQueryEngine::summary_metrics(&subset);
    assert_eq!(metrics.mean, Some(625_000.0));
}

#[test]
fn sim_investor_double_counting_across_dataset() {
    let (dataset, _) = Dataset::from_raw(&sample_rows());
    let rows = FundingQueryEngine::explode_investors(&dataset);
    let ranked = FundingQueryEngine::top_n_by_sum(&rows, GroupKey::Investor, 1);
    assert_eq!(ranked[0].label, "SoftBank");
    assert_eq!(ranked[0].total, 6_000_000.0);

    let by_year = FundingQueryEngine::aggregate_by_period(&dataset, Period::Year);
    assert_eq!(by_year.len(), 2);
    assert_eq!(by_year[1].total, 6_000_000.0);
}

#[test]
fn sim_concurrent_sessions_share_snapshot() {
    let (dataset, _) = Dataset::from_raw(&sample_rows());
    let dataset = Arc::new(dataset);

    let handles: Vec<_> = ["Bangalore", "Noida", "Gurgaon"]
        .into_iter()
        .map(|city| {
            let dataset = Arc::clone(&dataset);
            thread::spawn(move || {
                let criteria = FilterCriteria::all().with_cities([city]);
                FundingQueryEngine::filter(dataset.as_ref(), &criteria).len()
            })
        })
        .collect();

    let counts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(counts, vec![3, 1, 1]);
    assert_eq!(dataset.len(), 5);
}

#[test]
fn sim_snapshot_and_preset_persistence() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("raw.json");
    fs::write(&raw_path, serde_json::to_string(&sample_rows()).unwrap()).unwrap();

    let (dataset, _) = load_raw_snapshot(&raw_path).unwrap();
    let clean_path = dir.path().join("clean.json");
    save_snapshot(&clean_path, &dataset).unwrap();
    let reloaded = load_snapshot(&clean_path).unwrap();
    assert_eq!(reloaded.records(), dataset.records());

    let db = Database::open(&dir.path().join("presets.db")).unwrap();
    let criteria = FilterCriteria::all().with_industries(["Food"]).with_months([3, 11]);
    db.save_preset(&FilterPreset::new("Food spikes".to_string(), criteria))
        .unwrap();

    let mut registry = PresetRegistry::new();
    for preset in db.load_user_presets().unwrap() {
        registry.add(preset);
    }
    let criteria = registry.resolve("food spikes").unwrap();
    let report = ReportBuilder::default().build(&reloaded, &criteria);
    assert_eq!(report.record_count, 2);
    assert_eq!(report.top_cities[0].label, "Bangalore");
}
