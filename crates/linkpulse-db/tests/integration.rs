//! Offline unit tests for linkpulse-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use linkpulse_core::{AppConfig, Environment, SourceType};
use linkpulse_db::{DbError, LinkClickRow, PoolConfig};
use rust_decimal::Decimal;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        firestore_project_id: "demo-project".to_string(),
        firestore_database: "(default)".to_string(),
        firestore_base_url: "http://localhost:8081".to_string(),
        firestore_token: None,
        firestore_timeout_secs: 10,
        firestore_max_retries: 2,
        firestore_retry_backoff_ms: 200,
        links_collection: "links".to_string(),
        products_collection: "products".to_string(),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

fn sample_row(source_type: &str) -> LinkClickRow {
    LinkClickRow {
        id: 1,
        firestore_id: "click-1".to_string(),
        short_id: Some("abc123".to_string()),
        clicked_at: Some(Utc::now()),
        device_type: None,
        ip_address: None,
        referrer: None,
        user_agent: None,
        city_name: Some("LA".to_string()),
        country_name: Some("US".to_string()),
        postal_code: None,
        region: None,
        region_code: None,
        source_type: source_type.to_string(),
        qr_identifier: None,
        campaign_id: None,
        influencer_id: None,
        project_id: Some("proj-1".to_string()),
        project_details: None,
        link_id: Some("link-1".to_string()),
        name: "X".to_string(),
        page_type: "Unknown".to_string(),
        long_link: None,
        short_link: None,
        link_value: Some(Decimal::from(42)),
        site_retailer: None,
        link_tags: None,
        utm_parameters: None,
        link_active: None,
        link_created_at: None,
        link_created_by: None,
        product_id: None,
        product_name: None,
        product_price: Some(Decimal::from(42)),
        product_brand: None,
        product_category: None,
        product_upc: None,
        geoip_raw: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn row_converts_back_into_record() {
    let record = sample_row("qr").into_record().expect("valid row");

    assert_eq!(record.firestore_id, "click-1");
    assert_eq!(record.source_type, SourceType::Qr);
    assert_eq!(record.product_price, Some(Decimal::from(42)));
    assert_eq!(record.link_id.as_deref(), Some("link-1"));
}

#[test]
fn row_with_unknown_source_type_is_rejected() {
    let err = sample_row("email").into_record().unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidValue {
            column: "source_type",
            ..
        }
    ));
}

#[test]
fn amount_columns_carry_no_precision_limit() {
    let migration = include_str!("../../../migrations/20260301000100_create_link_clicks.sql");
    assert!(!migration.contains("NUMERIC("), "amounts must be unconstrained NUMERIC");
    assert!(migration.contains("link_value"));
    assert!(migration.contains("product_price"));
}
