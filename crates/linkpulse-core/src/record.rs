use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clicks::{ClickEvent, SourceType};
use crate::coalesce::coalesce_geo;

/// Name recorded when neither the link nor the click carries one.
pub const DEFAULT_NAME: &str = "Untitled";
/// Page type recorded when neither the link nor the click carries one.
pub const DEFAULT_PAGE_TYPE: &str = "Unknown";

/// One flattened row of the `link_clicks` analytics table.
///
/// Keyed by `firestore_id`, the click document's own identifier, so that
/// re-processing the same click overwrites the row it produced before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedClickRecord {
    pub firestore_id: String,
    pub short_id: Option<String>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub device_type: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,

    pub city_name: Option<String>,
    pub country_name: Option<String>,
    pub postal_code: Option<String>,
    pub region: Option<String>,
    pub region_code: Option<String>,

    pub source_type: SourceType,
    pub qr_identifier: Option<String>,
    pub campaign_id: Option<String>,
    pub influencer_id: Option<String>,
    pub project_id: Option<String>,
    pub project_details: Option<Value>,

    pub link_id: Option<String>,
    pub name: String,
    pub page_type: String,
    pub long_link: Option<String>,
    pub short_link: Option<String>,
    pub link_value: Option<Decimal>,
    pub site_retailer: Option<String>,
    pub link_tags: Option<Value>,
    pub utm_parameters: Option<Value>,
    pub link_active: Option<bool>,
    pub link_created_at: Option<DateTime<Utc>>,
    pub link_created_by: Option<String>,

    pub product_id: Option<String>,
    pub product_name: Option<String>,
    /// Effective price: the product's price, else the link's value.
    pub product_price: Option<Decimal>,
    pub product_brand: Option<String>,
    pub product_category: Option<String>,
    pub product_upc: Option<String>,

    /// The geo payload exactly as the click carried it.
    pub geoip_raw: Option<Value>,
}

impl EnrichedClickRecord {
    /// Builds the click-only part of a record. Link and product columns are
    /// left empty; `name` and `page_type` come from the click or the defaults.
    #[must_use]
    pub fn from_click(firestore_id: impl Into<String>, click: &ClickEvent) -> Self {
        let geo = click.geo_payload().map(coalesce_geo).unwrap_or_default();

        Self {
            firestore_id: firestore_id.into(),
            short_id: click.short_id.clone(),
            clicked_at: click.timestamp,
            device_type: click.device_type.clone(),
            ip_address: click.ip_address.clone(),
            referrer: click.referrer.clone(),
            user_agent: click.user_agent.clone(),
            city_name: geo.city_name,
            country_name: geo.country_name,
            postal_code: geo.postal_code,
            region: geo.region,
            region_code: geo.region_code,
            source_type: click.source_type.unwrap_or_default(),
            qr_identifier: click.qr_identifier().map(str::to_owned),
            campaign_id: click.campaign_id.clone(),
            influencer_id: click.influencer_id.clone(),
            project_id: click.project_id(),
            project_details: click.project_details.clone(),
            link_id: None,
            name: click
                .display_name()
                .unwrap_or(DEFAULT_NAME)
                .to_owned(),
            page_type: click
                .page_type
                .clone()
                .unwrap_or_else(|| DEFAULT_PAGE_TYPE.to_owned()),
            long_link: None,
            short_link: None,
            link_value: None,
            site_retailer: None,
            link_tags: None,
            utm_parameters: None,
            link_active: None,
            link_created_at: None,
            link_created_by: None,
            product_id: None,
            product_name: None,
            product_price: None,
            product_brand: None,
            product_category: None,
            product_upc: None,
            geoip_raw: click.geo_payload().cloned(),
        }
    }

    /// True when a link contributed to this record.
    #[must_use]
    pub fn has_link(&self) -> bool {
        self.link_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn click_only_record_uses_defaults() {
        let record = EnrichedClickRecord::from_click("click-1", &ClickEvent::default());

        assert_eq!(record.firestore_id, "click-1");
        assert_eq!(record.name, DEFAULT_NAME);
        assert_eq!(record.page_type, DEFAULT_PAGE_TYPE);
        assert_eq!(record.source_type, SourceType::Link);
        assert!(record.qr_identifier.is_none());
        assert!(!record.has_link());
        assert!(record.product_price.is_none());
    }

    #[test]
    fn click_fields_and_geo_are_flattened() {
        let click = ClickEvent {
            short_id: Some("abc123".into()),
            device_type: Some("desktop".into()),
            name: Some("Click-side name".into()),
            source_type: Some(SourceType::Qr),
            qr_code_id: Some("qr-7".into()),
            geoip_data: Some(json!({"city": "LA", "country": "US"})),
            ..ClickEvent::default()
        };

        let record = EnrichedClickRecord::from_click("click-2", &click);

        assert_eq!(record.city_name.as_deref(), Some("LA"));
        assert_eq!(record.country_name.as_deref(), Some("US"));
        assert_eq!(record.name, "Click-side name");
        assert_eq!(record.source_type, SourceType::Qr);
        assert_eq!(record.qr_identifier.as_deref(), Some("qr-7"));
        assert_eq!(record.geoip_raw, click.geoip_data);
    }

    #[test]
    fn legacy_geo_is_used_only_without_geoip_data() {
        let legacy = ClickEvent {
            geo: Some(json!({"city": "LA"})),
            link_name: Some("Denormalized".into()),
            ..ClickEvent::default()
        };
        let record = EnrichedClickRecord::from_click("click-4", &legacy);
        assert_eq!(record.city_name.as_deref(), Some("LA"));
        assert_eq!(record.geoip_raw, Some(json!({"city": "LA"})));
        assert_eq!(record.name, "Denormalized");

        let both = ClickEvent {
            geoip_data: Some(json!({"cityName": "Los Angeles"})),
            ..legacy
        };
        let record = EnrichedClickRecord::from_click("click-5", &both);
        assert_eq!(record.city_name.as_deref(), Some("Los Angeles"));
    }

    #[test]
    fn record_serializes_source_type_lowercase() {
        let record = EnrichedClickRecord::from_click("click-3", &ClickEvent::default());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["source_type"], json!("link"));
        assert_eq!(value["firestore_id"], json!("click-3"));
    }
}
