use std::fmt::Write;

use crate::models::{ChartBundle, ResultGroup, ResultKind, ResultRecord};

// The Nr. column counts flat across group boundaries; detail lookup by
// index walks the same filtered groups.
pub fn results_table(testplace: &str, groups: &[ResultGroup]) -> String {
    let mut pass_count = 0u64;
    let mut fail_count = 0u64;
    let mut other_count = 0u64;

    for group in groups {
        for record in &group.records {
            match record.kind() {
                ResultKind::Pass => pass_count += 1,
                ResultKind::Fail => fail_count += 1,
                _ => other_count += 1,
            }
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "# Results for {testplace}");
    let _ = writeln!(
        output,
        "Total: {} | Pass: {} | Fail: {} | Other: {}",
        pass_count + fail_count + other_count,
        pass_count,
        fail_count,
        other_count
    );
    let _ = writeln!(output);

    if groups.is_empty() {
        let _ = writeln!(output, "No runs in this window.");
        return output;
    }

    let _ = writeln!(
        output,
        "| Nr. | Run | Name | SW Version | Start | End | Runtime | Try | Result |"
    );
    let _ = writeln!(
        output,
        "|-----|-----|------|------------|-------|-----|---------|-----|--------|"
    );

    let mut index = 0usize;
    for group in groups {
        for record in &group.records {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                index,
                group.ran_at,
                record.test_name,
                record.sw_version,
                record.started_at,
                record.ended_at,
                record.runtime,
                record.try_count,
                record.result_tag
            );
            index += 1;
        }
    }

    output
}

pub fn overview_report(bundle: &ChartBundle) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {}", bundle.title);
    let _ = writeln!(output);

    let _ = writeln!(output, "## Status");
    let cards = [
        ("Total Pass", bundle.cards.pass),
        ("Total Fail", bundle.cards.fail),
        ("Total Errors", bundle.cards.error),
        ("Total TC-Errors", bundle.cards.tc_error),
        ("Total App-Errors", bundle.cards.app_error),
        ("Total SOP-Errors", bundle.cards.sop_error),
    ];
    for (title, count) in cards {
        let _ = writeln!(output, "- {title}: {count}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Results by Date");
    if bundle.bars.is_empty() {
        let _ = writeln!(output, "(no data)");
    } else {
        let _ = writeln!(output, "| Date | Result Type | Count | Testplace |");
        let _ = writeln!(output, "|------|-------------|-------|-----------|");
        for bar in &bundle.bars {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                bar.date,
                bar.category.label(),
                bar.count,
                bar.testplace
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Aggregate Results");
    if bundle.pie.is_empty() {
        let _ = writeln!(output, "(no data)");
    } else {
        let _ = writeln!(output, "| Result Type | Count |");
        let _ = writeln!(output, "|-------------|-------|");
        for slice in &bundle.pie {
            let _ = writeln!(output, "| {} | {} |", slice.category.label(), slice.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trend of Results Over Time");
    if bundle.trend.is_empty() {
        let _ = writeln!(output, "(no data)");
    } else {
        let _ = writeln!(output, "| Date | Testplace | Count |");
        let _ = writeln!(output, "|------|-----------|-------|");
        for point in &bundle.trend {
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                point.date, point.testplace, point.count
            );
        }
    }

    output
}

pub fn detail_panel(group: &ResultGroup, record: &ResultRecord) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Details for Test Case: {}", record.test_name);
    let _ = writeln!(output, "- Run: {}", group.ran_at);
    let _ = writeln!(output, "- SW Version: {}", record.sw_version);
    let _ = writeln!(output, "- Start: {}", record.started_at);
    let _ = writeln!(output, "- End: {}", record.ended_at);
    let _ = writeln!(output, "- Runtime: {}", record.runtime);
    let _ = writeln!(output, "- Try: {}", record.try_count);
    let _ = writeln!(output, "- Result: {}", record.result_tag);

    if !record.detail.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Log");
        let _ = writeln!(output, "{}", record.detail);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate;

    fn record(name: &str, tag: &str) -> ResultRecord {
        ResultRecord {
            test_name: name.to_string(),
            sw_version: "1.4.2".to_string(),
            started_at: "10:00:01".to_string(),
            ended_at: "10:00:09".to_string(),
            runtime: "8s".to_string(),
            try_count: 2,
            result_tag: tag.to_string(),
            detail: "assertion failed at step 3".to_string(),
        }
    }

    fn groups() -> Vec<ResultGroup> {
        vec![
            ResultGroup {
                ran_at: "2024-07-21 10:00:00,000000".to_string(),
                records: vec![record("tc_boot", "PASS")],
            },
            ResultGroup {
                ran_at: "2024-07-22 09:00:00,000000".to_string(),
                records: vec![record("tc_update", "FAIL"), record("tc_shutdown", "FLAKY")],
            },
        ]
    }

    #[test]
    fn status_line_counts_pass_fail_other() {
        let table = results_table("TP-01", &groups());
        assert!(table.contains("Total: 3 | Pass: 1 | Fail: 1 | Other: 1"));
    }

    #[test]
    fn rows_are_numbered_across_groups() {
        let table = results_table("TP-01", &groups());
        assert!(table.contains("| 0 | 2024-07-21"));
        assert!(table.contains("| 2 | 2024-07-22"));
    }

    #[test]
    fn overview_report_renders_all_sections() {
        let selected = vec![("TP-01".to_string(), groups())];
        let bundle = aggregate::overview(&selected);
        let rendered = overview_report(&bundle);
        assert!(rendered.contains("## Status"));
        assert!(rendered.contains("## Results by Date"));
        assert!(rendered.contains("## Aggregate Results"));
        assert!(rendered.contains("## Trend of Results Over Time"));
        assert!(rendered.contains("- Total Pass: 1"));
    }

    #[test]
    fn sentinel_bundle_renders_placeholder() {
        let rendered = overview_report(&ChartBundle::no_data());
        assert!(rendered.contains("# No Testplaces Selected"));
        assert!(rendered.contains("(no data)"));
        assert!(rendered.contains("- Total Pass: 0"));
    }

    #[test]
    fn detail_panel_shows_the_selected_row() {
        let all = groups();
        let panel = detail_panel(&all[1], &all[1].records[0]);
        assert!(panel.contains("Details for Test Case: tc_update"));
        assert!(panel.contains("- Result: FAIL"));
        assert!(panel.contains("assertion failed at step 3"));
    }
}
