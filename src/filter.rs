use anyhow::{bail, Context};
use chrono::NaiveDate;

use crate::models::{FilterSpec, ResultFilter, ResultGroup, ResultRecord, RowKey};

/// Date portion of a run timestamp (`YYYY-MM-DD HH:MM:SS,ffffff`). The
/// format is fixed-width and zero-padded, so the first ten characters are
/// always the date.
pub fn group_date(ran_at: &str) -> anyhow::Result<NaiveDate> {
    let date_part = ran_at
        .get(..10)
        .with_context(|| format!("run timestamp too short: {ran_at:?}"))?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .with_context(|| format!("malformed run timestamp: {ran_at:?}"))
}

pub fn apply(groups: &[ResultGroup], spec: &FilterSpec) -> anyhow::Result<Vec<ResultGroup>> {
    let mut filtered = Vec::new();

    for group in groups {
        let date = group_date(&group.ran_at)?;
        if spec.start_date.is_some_and(|start| date < start) {
            continue;
        }
        if spec.end_date.is_some_and(|end| date > end) {
            continue;
        }

        let records = match &spec.result {
            ResultFilter::All => group.records.clone(),
            filter => group
                .records
                .iter()
                .filter(|record| filter.matches(&record.result_tag))
                .cloned()
                .collect(),
        };

        // Emptied groups stay: the rendering still shows the run happened.
        filtered.push(ResultGroup {
            ran_at: group.ran_at.clone(),
            records,
        });
    }

    Ok(filtered)
}

/// The index space is the flat enumeration of the same filtered groups the
/// table renderer numbered.
pub fn locate_by_index(
    groups: &[ResultGroup],
    index: usize,
) -> anyhow::Result<(&ResultGroup, &ResultRecord)> {
    let mut seen = 0usize;

    for group in groups {
        if seen + group.records.len() > index {
            return Ok((group, &group.records[index - seen]));
        }
        seen += group.records.len();
    }

    bail!("row index {index} out of range ({seen} rows available)")
}

pub fn locate_by_key<'a>(
    groups: &'a [ResultGroup],
    key: &RowKey,
) -> anyhow::Result<(&'a ResultGroup, &'a ResultRecord)> {
    for group in groups {
        if group.ran_at != key.ran_at {
            continue;
        }
        for record in &group.records {
            if record.test_name == key.test_name && record.try_count == key.try_count {
                return Ok((group, record));
            }
        }
    }

    bail!(
        "no result for test {:?} (try {}) in run {:?}",
        key.test_name,
        key.try_count,
        key.ran_at
    )
}
