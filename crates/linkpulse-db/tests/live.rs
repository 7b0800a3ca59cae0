//! Live integration tests for linkpulse-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness from `DATABASE_URL`. They are ignored by default; run
//! them with `cargo test -p linkpulse-db -- --ignored` against a database.

use chrono::{TimeZone, Utc};
use linkpulse_core::{ClickEvent, EnrichedClickRecord, SourceType};
use linkpulse_db::{
    count_link_clicks, get_link_click, list_link_clicks_for_export, upsert_link_click, DbError,
    ExportFilter,
};
use rust_decimal::Decimal;
use serde_json::json;

fn record(firestore_id: &str, project_id: &str, day: u32, source_type: SourceType) -> EnrichedClickRecord {
    let click = ClickEvent {
        short_id: Some("abc123".to_string()),
        timestamp: Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).single(),
        project_id: Some(project_id.to_string()),
        source_type: Some(source_type),
        geoip_data: Some(json!({"city": "LA", "country": "US"})),
        ..ClickEvent::default()
    };
    let mut record = EnrichedClickRecord::from_click(firestore_id, &click);
    record.link_id = Some("link-1".to_string());
    record.name = "X".to_string();
    record.link_value = Some(Decimal::from(42));
    record.product_price = Some(Decimal::from(42));
    record
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_is_idempotent_per_firestore_id(pool: sqlx::PgPool) {
    let rec = record("click-1", "proj-1", 1, SourceType::Link);

    let first = upsert_link_click(&pool, &rec).await.expect("first upsert");
    let second = upsert_link_click(&pool, &rec).await.expect("second upsert");

    assert_eq!(first, second, "same firestore_id must map to the same row");
    assert_eq!(count_link_clicks(&pool, "click-1").await.unwrap(), 1);

    let stored = get_link_click(&pool, "click-1")
        .await
        .expect("row exists")
        .into_record()
        .expect("valid row");
    assert_eq!(stored, rec);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_overwrites_every_column(pool: sqlx::PgPool) {
    let mut rec = record("click-2", "proj-1", 2, SourceType::Link);
    upsert_link_click(&pool, &rec).await.unwrap();

    rec.city_name = None;
    rec.name = "Renamed".to_string();
    rec.product_price = Some(Decimal::new(1999, 2));
    upsert_link_click(&pool, &rec).await.unwrap();

    let stored = get_link_click(&pool, "click-2").await.unwrap();
    assert!(stored.city_name.is_none(), "last write wins, including nulls");
    assert_eq!(stored.name, "Renamed");
    assert_eq!(stored.product_price, Some(Decimal::new(1999, 2)));
    assert!(stored.updated_at >= stored.created_at);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn large_and_fine_grained_amounts_round_trip(pool: sqlx::PgPool) {
    let mut rec = record("click-big", "proj-1", 3, SourceType::Link);
    rec.link_value = Some(Decimal::from(99_999_999_999_i64));
    rec.product_price = Some(Decimal::new(12_345, 3));
    upsert_link_click(&pool, &rec).await.unwrap();

    let stored = get_link_click(&pool, "click-big").await.unwrap();
    assert_eq!(stored.link_value, Some(Decimal::from(99_999_999_999_i64)));
    assert_eq!(stored.product_price, Some(Decimal::new(12_345, 3)));
    assert_eq!(stored.into_record().unwrap(), rec);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn get_missing_click_is_not_found(pool: sqlx::PgPool) {
    let err = get_link_click(&pool, "nope").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn export_filters_by_project_window_and_source(pool: sqlx::PgPool) {
    for rec in [
        record("a", "proj-1", 1, SourceType::Link),
        record("b", "proj-1", 2, SourceType::Qr),
        record("c", "proj-1", 20, SourceType::Link),
        record("d", "proj-2", 2, SourceType::Link),
    ] {
        upsert_link_click(&pool, &rec).await.unwrap();
    }

    let window = |source_type| ExportFilter {
        project_id: "proj-1",
        from: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        until: Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap(),
        source_type,
    };

    let all = list_link_clicks_for_export(&pool, &window(None)).await.unwrap();
    let ids: Vec<_> = all.iter().map(|r| r.firestore_id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);

    let qr = list_link_clicks_for_export(&pool, &window(Some(SourceType::Qr)))
        .await
        .unwrap();
    assert_eq!(qr.len(), 1);
    assert_eq!(qr[0].firestore_id, "b");
}
