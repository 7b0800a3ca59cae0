use std::sync::Arc;

use super::exports::render_csv;
use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use chrono::TimeZone;
use linkpulse_core::{ClickEvent, EnrichedClickRecord, Link, SourceType};
use linkpulse_enrich::memory::{MemoryLinks, MemoryProducts, MemorySink};
use linkpulse_enrich::PgClickSink;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

const KEY: &str = "test-key";

struct TestApp {
    app: Router,
    sink: Arc<MemorySink>,
}

fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://linkpulse@127.0.0.1:1/linkpulse")
        .expect("lazy pool")
}

fn link() -> Link {
    Link {
        url_short_code: Some("abc123".to_string()),
        name: Some("Spring promo".to_string()),
        link_value: Some(Decimal::from(42)),
        ..Link::default()
    }
}

fn test_app() -> TestApp {
    let sink = Arc::new(MemorySink::new());
    let stats = Arc::new(EnrichmentStats::new());
    let enricher = Enricher::new(
        Arc::new(MemoryLinks::new().with_link("link-1", link())),
        Arc::new(MemoryProducts::new()),
        sink.clone(),
    )
    .with_stats(Arc::clone(&stats));
    let state = AppState {
        pool: unreachable_pool(),
        enricher: Arc::new(enricher),
        stats,
    };
    let auth = AuthState::from_raw(KEY, false).expect("auth");
    TestApp {
        app: build_app(state, auth, default_rate_limit_state()),
        sink,
    }
}

fn post_trigger(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/triggers/clicks")
        .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
        .body(Body::empty())
        .expect("request")
}

async fn json_body(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

fn click_created(id: &str) -> Value {
    json!({
        "value": {
            "name": format!("projects/p/databases/(default)/documents/clicks/{id}"),
            "fields": {
                "shortId": {"stringValue": "abc123"},
                "geoipData": {"mapValue": {"fields": {
                    "city": {"stringValue": "LA"},
                    "country": {"stringValue": "US"}
                }}}
            }
        }
    })
}

#[tokio::test]
async fn trigger_enriches_click_into_sink() {
    let t = test_app();
    let response = t
        .app
        .oneshot(post_trigger(click_created("c-1")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["firestore_id"], "c-1");
    assert_eq!(json["data"]["status"], "enriched");
    assert_eq!(json["data"]["written"], true);

    let record = t.sink.get("c-1").expect("record written");
    assert_eq!(record.name, "Spring promo");
    assert_eq!(record.city_name.as_deref(), Some("LA"));
    assert_eq!(record.product_price, Some(Decimal::from(42)));
}

#[tokio::test]
async fn trigger_redelivery_keeps_one_row() {
    let t = test_app();
    for _ in 0..2 {
        let response = t
            .app
            .clone()
            .oneshot(post_trigger(click_created("c-1")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(t.sink.len(), 1);
    assert_eq!(t.sink.writes(), 2);
}

#[tokio::test]
async fn trigger_acknowledges_deletion_without_writing() {
    let t = test_app();
    let response = t
        .app
        .oneshot(post_trigger(json!({
            "oldValue": {
                "name": "projects/p/databases/(default)/documents/clicks/gone",
                "fields": {"shortId": {"stringValue": "abc123"}}
            }
        })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "skipped_deletion");
    assert_eq!(json["data"]["written"], false);
    assert!(t.sink.is_empty());
}

#[tokio::test]
async fn trigger_reports_missing_link_but_still_writes() {
    let t = test_app();
    let mut event = click_created("c-2");
    event["value"]["fields"]["shortId"] = json!({"stringValue": "nope"});

    let response = t.app.oneshot(post_trigger(event)).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["warnings"][0]["kind"], "link_not_found");
    let record = t.sink.get("c-2").expect("minimal record written");
    assert_eq!(record.name, linkpulse_core::DEFAULT_NAME);
}

#[tokio::test]
async fn trigger_enriches_click_with_unknown_typed_field() {
    let t = test_app();
    let mut event = click_created("c-3");
    event["value"]["fields"]["embedding"] = json!({"vectorValue": {"values": []}});

    let response = t.app.oneshot(post_trigger(event)).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "enriched");
    assert_eq!(json["data"]["written"], true);
    let record = t.sink.get("c-3").expect("record written");
    assert_eq!(record.name, "Spring promo");
    assert_eq!(record.city_name.as_deref(), Some("LA"));
}

#[tokio::test]
async fn trigger_prefers_geoip_data_over_legacy_geo() {
    let t = test_app();
    let mut event = click_created("c-4");
    event["value"]["fields"]["geo"] = json!({"mapValue": {"fields": {
        "city": {"stringValue": "Reno"}
    }}});
    event["value"]["fields"]["deviceType"] = json!({"stringValue": "mobile"});

    let response = t.app.oneshot(post_trigger(event)).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let record = t.sink.get("c-4").expect("record written");
    assert_eq!(record.city_name.as_deref(), Some("LA"));
    assert_eq!(record.device_type.as_deref(), Some("mobile"));
    assert_eq!(record.name, "Spring promo");
}

#[tokio::test]
async fn trigger_rejects_payload_that_is_not_a_write_event() {
    let t = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/triggers/clicks")
        .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
        .body(Body::from("not json"))
        .expect("request");

    let response = t.app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "bad_request");
}

#[tokio::test]
async fn trigger_rejects_event_without_documents() {
    let t = test_app();
    let response = t.app.oneshot(post_trigger(json!({}))).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(t.sink.is_empty());
}

#[tokio::test]
async fn trigger_requires_bearer_token() {
    let t = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/triggers/clicks")
        .body(Body::from(click_created("c-1").to_string()))
        .expect("request");

    let response = t.app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(t.sink.is_empty());
}

#[tokio::test]
async fn stats_count_processed_events() {
    let t = test_app();
    t.app
        .clone()
        .oneshot(post_trigger(click_created("c-1")))
        .await
        .expect("response");

    let response = t
        .app
        .oneshot(get("/api/v1/enrichment/stats"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["events_received"], 1);
    assert_eq!(json["data"]["records_written"], 1);
}

#[tokio::test]
async fn export_rejects_missing_parameters() {
    let t = test_app();
    let response = t
        .app
        .oneshot(get("/api/v1/exports/clicks?type=clicks"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(json["error"]["message"]
        .as_str()
        .is_some_and(|m| m.contains("project_id")));
}

#[tokio::test]
async fn export_rejects_inverted_range() {
    let t = test_app();
    let response = t
        .app
        .oneshot(get(
            "/api/v1/exports/clicks?project_id=p1&start_date=2025-06-10&end_date=2025-06-01",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn export_rejects_unknown_format() {
    let t = test_app();
    let response = t
        .app
        .oneshot(get(
            "/api/v1/exports/clicks?project_id=p1&start_date=2025-06-01&end_date=2025-06-10&format=xml",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_degraded_without_database() {
    let t = test_app();
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .expect("request");

    let response = t.app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await["data"]["database"], "unavailable");
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("bad_request", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("unauthorized", StatusCode::UNAUTHORIZED),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "msg").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[test]
fn missing_row_maps_to_not_found() {
    let error = map_db_error("req-1".to_string(), &linkpulse_db::DbError::NotFound);
    assert_eq!(error.error.code, "not_found");
}

fn row() -> linkpulse_db::LinkClickRow {
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid time");
    linkpulse_db::LinkClickRow {
        id: 1,
        firestore_id: "c-1".to_string(),
        short_id: Some("abc123".to_string()),
        clicked_at: Some(at),
        device_type: None,
        ip_address: None,
        referrer: None,
        user_agent: None,
        city_name: Some("Los Angeles, CA".to_string()),
        country_name: Some("US".to_string()),
        postal_code: None,
        region: None,
        region_code: None,
        source_type: "link".to_string(),
        qr_identifier: None,
        campaign_id: None,
        influencer_id: None,
        project_id: Some("p1".to_string()),
        project_details: None,
        link_id: Some("link-1".to_string()),
        name: "X".to_string(),
        page_type: "Unknown".to_string(),
        long_link: None,
        short_link: None,
        link_value: Some(Decimal::new(4250, 2)),
        site_retailer: None,
        link_tags: Some(json!(["a", "b"])),
        utm_parameters: None,
        link_active: Some(true),
        link_created_at: None,
        link_created_by: None,
        product_id: None,
        product_name: None,
        product_price: Some(Decimal::new(4250, 2)),
        product_brand: None,
        product_category: None,
        product_upc: None,
        geoip_raw: None,
        created_at: at,
        updated_at: at,
    }
}

#[test]
fn csv_export_writes_header_and_flat_row() {
    let bytes = render_csv(&[row()]).expect("csv");
    let text = String::from_utf8(bytes).expect("utf8");
    let mut lines = text.lines();

    let header = lines.next().expect("header");
    assert!(header.starts_with("firestore_id,clicked_at,short_id,source_type"));

    let line = lines.next().expect("row");
    assert!(line.starts_with("c-1,2025-06-01T12:00:00+00:00,abc123,link"));
    assert!(line.contains("\"Los Angeles, CA\""));
    assert!(line.contains("42.50"));
    assert!(line.contains(r#""[""a"",""b""]""#));
    assert!(lines.next().is_none());
}

fn stored_record(id: &str) -> EnrichedClickRecord {
    let click = ClickEvent {
        short_id: Some("abc123".to_string()),
        timestamp: Utc.with_ymd_and_hms(2025, 6, 3, 9, 0, 0).single(),
        project_id: Some("p1".to_string()),
        source_type: Some(SourceType::Qr),
        ..ClickEvent::default()
    };
    EnrichedClickRecord::from_click(id, &click)
}

fn db_app(pool: PgPool) -> Router {
    let stats = Arc::new(EnrichmentStats::new());
    let enricher = Enricher::new(
        Arc::new(MemoryLinks::new().with_link("link-1", link())),
        Arc::new(MemoryProducts::new()),
        Arc::new(PgClickSink::new(pool.clone())),
    )
    .with_stats(Arc::clone(&stats));
    let state = AppState {
        pool,
        enricher: Arc::new(enricher),
        stats,
    };
    let auth = AuthState::from_raw(KEY, false).expect("auth");
    build_app(state, auth, default_rate_limit_state())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn trigger_then_fetch_click_by_firestore_id(pool: sqlx::PgPool) {
    let app = db_app(pool);
    let response = app
        .clone()
        .oneshot(post_trigger(click_created("c-9")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/v1/clicks/c-9"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["firestore_id"], "c-9");
    assert_eq!(json["data"]["name"], "Spring promo");
    assert_eq!(json["data"]["city_name"], "LA");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn unknown_click_is_not_found(pool: sqlx::PgPool) {
    let response = db_app(pool)
        .oneshot(get("/api/v1/clicks/missing"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn qr_export_as_csv_is_an_attachment(pool: sqlx::PgPool) {
    linkpulse_db::upsert_link_click(&pool, &stored_record("q-1"))
        .await
        .expect("seed");

    let response = db_app(pool)
        .oneshot(get(
            "/api/v1/exports/clicks?type=qr&project_id=p1&start_date=2025-06-01&end_date=2025-06-30&format=csv",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .expect("ascii");
    assert!(disposition.contains("link_clicks_p1_2025-06-01_to_2025-06-30.csv"));

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let text = String::from_utf8(body.to_vec()).expect("utf8");
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("q-1"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn json_export_excludes_other_source_types(pool: sqlx::PgPool) {
    linkpulse_db::upsert_link_click(&pool, &stored_record("q-1"))
        .await
        .expect("seed");

    let response = db_app(pool)
        .oneshot(get(
            "/api/v1/exports/clicks?type=links&project_id=p1&start_date=2025-06-01&end_date=2025-06-30",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["row_count"], 0);
    assert_eq!(json["data"]["export"]["export_type"], "links");
}
