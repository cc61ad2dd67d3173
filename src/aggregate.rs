use std::collections::BTreeMap;

use crate::filter;
use crate::models::{
    AggregateCounts, BarRow, ChartBundle, PieSlice, ResultGroup, ResultKind, TrendPoint,
};

/// Build the overview charts for the selected testplaces. The input is a
/// fresh snapshot per testplace, fetched by the caller; an empty selection
/// yields the no-data sentinel without ever touching the database.
///
/// Aggregation is all-or-nothing: any malformed row degrades the whole
/// invocation to the error sentinel with zeroed status cards. Partial charts
/// are never returned.
pub fn overview(selected: &[(String, Vec<ResultGroup>)]) -> ChartBundle {
    if selected.is_empty() {
        return ChartBundle::no_data();
    }

    match try_overview(selected) {
        Ok(bundle) => bundle,
        Err(err) => {
            tracing::error!(error = %err, "aggregation failed, rendering error placeholder");
            ChartBundle::error()
        }
    }
}

fn try_overview(selected: &[(String, Vec<ResultGroup>)]) -> anyhow::Result<ChartBundle> {
    let mut bars = Vec::new();
    let mut trend = Vec::new();
    let mut totals = AggregateCounts::default();

    for (testplace, groups) in selected {
        // Bucket by calendar day; BTreeMap keeps the chart axes sorted.
        let mut daily: BTreeMap<chrono::NaiveDate, AggregateCounts> = BTreeMap::new();

        for group in groups {
            let date = filter::group_date(&group.ran_at)?;
            let counts = daily.entry(date).or_default();
            for record in &group.records {
                counts.bump(record.kind());
            }
        }

        for (date, counts) in &daily {
            for kind in ResultKind::ALL {
                bars.push(BarRow {
                    date: *date,
                    category: kind,
                    count: counts.count(kind),
                    testplace: testplace.clone(),
                });
                totals.add(kind, counts.count(kind));
            }
            trend.push(TrendPoint {
                date: *date,
                testplace: testplace.clone(),
                count: counts.total(),
            });
        }
    }

    let pie = ResultKind::ALL
        .iter()
        .map(|kind| PieSlice {
            category: *kind,
            count: totals.count(*kind),
        })
        .collect();

    Ok(ChartBundle {
        title: "Combined Testplace Results by Date".to_string(),
        bars,
        pie,
        trend,
        cards: totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultRecord;

    fn record(tag: &str) -> ResultRecord {
        ResultRecord {
            test_name: "tc_boot".to_string(),
            sw_version: "1.4.2".to_string(),
            started_at: "10:00:01".to_string(),
            ended_at: "10:00:09".to_string(),
            runtime: "8s".to_string(),
            try_count: 1,
            result_tag: tag.to_string(),
            detail: String::new(),
        }
    }

    fn group(ran_at: &str, tags: &[&str]) -> ResultGroup {
        ResultGroup {
            ran_at: ran_at.to_string(),
            records: tags.iter().map(|tag| record(tag)).collect(),
        }
    }

    fn selection(tags_by_day: &[(&str, &[&str])]) -> Vec<(String, Vec<ResultGroup>)> {
        let groups = tags_by_day
            .iter()
            .map(|(ran_at, tags)| group(ran_at, tags))
            .collect();
        vec![("TP-01".to_string(), groups)]
    }

    #[test]
    fn counts_are_conserved() {
        let selected = selection(&[
            ("2024-07-21 10:00:00,000000", &["PASS", "FAIL", "APP_ERROR"]),
            ("2024-07-22 09:00:00,000000", &["TC_FAIL", "SPORADIC_BEHAVIOR", "PASS"]),
        ]);
        let bundle = overview(&selected);
        assert_eq!(bundle.cards.total(), 6);
        let pie_total: u64 = bundle.pie.iter().map(|slice| slice.count).sum();
        assert_eq!(pie_total, 6);
    }

    #[test]
    fn two_days_produce_two_bar_buckets() {
        let selected = selection(&[
            ("2024-07-21 10:00:00,000000", &["PASS"]),
            ("2024-07-22 09:00:00,000000", &["FAIL", "PASS"]),
        ]);
        let bundle = overview(&selected);
        assert_eq!(bundle.cards.pass, 2);
        assert_eq!(bundle.cards.fail, 1);
        // Six category bars per (date, testplace) bucket.
        assert_eq!(bundle.bars.len(), 12);
        assert_eq!(bundle.trend.len(), 2);
    }

    #[test]
    fn unrecognized_tag_counts_as_generic_error() {
        let selected = selection(&[("2024-07-21 10:00:00,000000", &["FLAKY"])]);
        let bundle = overview(&selected);
        assert_eq!(bundle.cards.error, 1);
        assert_eq!(bundle.cards.total(), 1);
    }

    #[test]
    fn trend_has_one_point_per_date_and_testplace() {
        let day: &[&str] = &["PASS", "FAIL"];
        let groups = vec![group("2024-07-21 10:00:00,000000", day)];
        let selected = vec![
            ("TP-01".to_string(), groups.clone()),
            ("TP-02".to_string(), groups),
        ];
        let bundle = overview(&selected);
        assert_eq!(bundle.trend.len(), 2);
        assert!(bundle.trend.iter().all(|point| point.count == 2));
        let places: Vec<_> = bundle
            .trend
            .iter()
            .map(|point| point.testplace.as_str())
            .collect();
        assert_eq!(places, vec!["TP-01", "TP-02"]);
    }

    #[test]
    fn empty_selection_yields_no_data_sentinel() {
        let bundle = overview(&[]);
        assert!(bundle.is_sentinel());
        assert_eq!(bundle.title, "No Testplaces Selected");
        assert_eq!(bundle.cards, AggregateCounts::default());
    }

    #[test]
    fn malformed_timestamp_degrades_to_error_sentinel() {
        let selected = selection(&[
            ("2024-07-21 10:00:00,000000", &["PASS"]),
            ("not a timestamp", &["PASS"]),
        ]);
        let bundle = overview(&selected);
        assert!(bundle.is_sentinel());
        assert_eq!(bundle.title, "Error");
        assert_eq!(bundle.cards.total(), 0);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let selected = selection(&[
            ("2024-07-21 10:00:00,000000", &["PASS", "FAIL"]),
            ("2024-07-22 09:00:00,000000", &["APP_ERROR"]),
        ]);
        assert_eq!(overview(&selected), overview(&selected));
    }

    #[test]
    fn same_day_groups_share_a_bucket() {
        let selected = selection(&[
            ("2024-07-21 08:00:00,000000", &["PASS"]),
            ("2024-07-21 18:00:00,000000", &["FAIL"]),
        ]);
        let bundle = overview(&selected);
        assert_eq!(bundle.trend.len(), 1);
        assert_eq!(bundle.trend[0].count, 2);
    }
}
