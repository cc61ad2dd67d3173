use anyhow::Context;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{ResultGroup, ResultRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// All known testplace names, sorted.
pub async fn fetch_testplace_names(pool: &PgPool) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM ultratork.testplaces ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("name")).collect())
}

/// Fresh snapshot of result groups for one testplace, named explicitly per
/// call. Rows come back ordered by run timestamp then insertion order and
/// are folded into one group per run.
pub async fn fetch_result_groups(
    pool: &PgPool,
    testplace_name: &str,
) -> anyhow::Result<Vec<ResultGroup>> {
    let rows = sqlx::query(
        "SELECT r.ran_at, r.test_name, r.sw_version, r.started_at, r.ended_at, \
         r.runtime, r.try_count, r.result_tag, r.detail \
         FROM ultratork.test_results r \
         JOIN ultratork.testplaces tp ON tp.id = r.testplace_id \
         WHERE tp.name = $1 \
         ORDER BY r.ran_at, r.seq",
    )
    .bind(testplace_name)
    .fetch_all(pool)
    .await?;

    let mut groups: Vec<ResultGroup> = Vec::new();

    for row in rows {
        let ran_at: String = row.get("ran_at");
        let record = ResultRecord {
            test_name: row.get("test_name"),
            sw_version: row.get("sw_version"),
            started_at: row.get("started_at"),
            ended_at: row.get("ended_at"),
            runtime: row.get("runtime"),
            try_count: row.get("try_count"),
            result_tag: row.get("result_tag"),
            detail: row.get("detail"),
        };

        match groups.last_mut() {
            Some(group) if group.ran_at == ran_at => group.records.push(record),
            _ => groups.push(ResultGroup {
                ran_at,
                records: vec![record],
            }),
        }
    }

    Ok(groups)
}

async fn upsert_testplace(pool: &PgPool, name: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO ultratork.testplaces (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

async fn insert_result(
    pool: &PgPool,
    testplace_id: Uuid,
    ran_at: &str,
    record: &ResultRecord,
    source_key: &str,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO ultratork.test_results
        (id, testplace_id, ran_at, test_name, sw_version, started_at, ended_at,
         runtime, try_count, result_tag, detail, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(testplace_id)
    .bind(ran_at)
    .bind(&record.test_name)
    .bind(&record.sw_version)
    .bind(&record.started_at)
    .bind(&record.ended_at)
    .bind(&record.runtime)
    .bind(record.try_count)
    .bind(&record.result_tag)
    .bind(&record.detail)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let results = vec![
        ("TP-01", "2024-07-21 10:00:00,000000", "tc_boot_sequence", "1.4.2", "10:00:01", "10:00:09", "8s", 1, "PASS", "", "seed-001"),
        ("TP-01", "2024-07-21 10:00:00,000000", "tc_display_selftest", "1.4.2", "10:00:10", "10:00:31", "21s", 1, "FAIL", "pixel check failed on segment 4", "seed-002"),
        ("TP-01", "2024-07-22 09:00:00,000000", "tc_boot_sequence", "1.4.3", "09:00:01", "09:00:08", "7s", 1, "PASS", "", "seed-003"),
        ("TP-01", "2024-07-22 09:00:00,000000", "tc_can_gateway", "1.4.3", "09:00:09", "09:01:02", "53s", 2, "TC_FAIL", "testcase setup aborted", "seed-004"),
        ("TP-02", "2024-07-22 11:30:00,000000", "tc_boot_sequence", "1.4.3", "11:30:01", "11:30:09", "8s", 1, "PASS", "", "seed-005"),
        ("TP-02", "2024-07-23 11:30:00,000000", "tc_update_service", "1.4.3", "11:30:10", "11:34:45", "275s", 1, "APP_ERROR", "updater crashed with exit code 3", "seed-006"),
        ("TP-02", "2024-07-23 11:30:00,000000", "tc_touch_panel", "1.4.3", "11:34:50", "11:35:12", "22s", 3, "SPORADIC_BEHAVIOR", "intermittent touch events", "seed-007"),
    ];

    for (tp_name, ran_at, test_name, sw_version, started_at, ended_at, runtime, try_count, tag, detail, source_key) in results {
        let testplace_id = upsert_testplace(pool, tp_name).await?;
        let record = ResultRecord {
            test_name: test_name.to_string(),
            sw_version: sw_version.to_string(),
            started_at: started_at.to_string(),
            ended_at: ended_at.to_string(),
            runtime: runtime.to_string(),
            try_count,
            result_tag: tag.to_string(),
            detail: detail.to_string(),
        };
        insert_result(pool, testplace_id, ran_at, &record, source_key).await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        testplace: String,
        ran_at: String,
        test_name: String,
        sw_version: String,
        started_at: String,
        ended_at: String,
        runtime: String,
        try_count: i32,
        result_tag: String,
        #[serde(default)]
        detail: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let testplace_id = upsert_testplace(pool, &row.testplace).await?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let record = ResultRecord {
            test_name: row.test_name,
            sw_version: row.sw_version,
            started_at: row.started_at,
            ended_at: row.ended_at,
            runtime: row.runtime,
            try_count: row.try_count,
            result_tag: row.result_tag,
            detail: row.detail,
        };

        if insert_result(pool, testplace_id, &row.ran_at, &record, &source_key).await? > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
