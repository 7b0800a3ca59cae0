//! Source documents read by the enrichment pipeline.
//!
//! Field names follow the Firestore documents (`camelCase`). Every field is
//! optional and decoded through [`crate::lenient`], so a document written by
//! an older client never fails to parse because of one odd field.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::lenient;

/// How a visit reached the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// A QR-code scan.
    Qr,
    /// A plain short-link visit. Older click documents carry no source type
    /// and are treated as link visits.
    #[default]
    Link,
}

impl SourceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Qr => "qr",
            SourceType::Link => "link",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qr" => Ok(SourceType::Qr),
            "link" => Ok(SourceType::Link),
            other => Err(format!("unknown source type '{other}'")),
        }
    }
}

fn opt_source_type<'de, D>(de: D) -> Result<Option<SourceType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient::opt_string(de)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// One visit or scan, as captured by the click-capture process.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    /// Short code of the owning link; joins to [`Link::url_short_code`].
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub short_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub device_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub ip_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub referrer: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_json")]
    pub geoip_data: Option<Value>,
    /// Geo payload under the key older capture code used.
    #[serde(default, deserialize_with = "lenient::opt_json")]
    pub geo: Option<Value>,
    #[serde(default, deserialize_with = "opt_source_type")]
    pub source_type: Option<SourceType>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub qr_identifier: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub qr_code_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub campaign_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub influencer_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_json")]
    pub project_details: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    /// Link name denormalized onto the click by some capture clients.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub link_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub page_type: Option<String>,
}

impl ClickEvent {
    /// Decodes a click from a document's field map.
    ///
    /// # Errors
    ///
    /// Fails only on structurally invalid input.
    pub fn from_fields(fields: &serde_json::Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields.clone()))
    }

    /// Like [`ClickEvent::from_fields`], but an undecodable field is dropped
    /// instead of failing the click. Returns the dropped field names.
    #[must_use]
    pub fn from_fields_lossy(fields: &serde_json::Map<String, Value>) -> (Self, Vec<String>) {
        lenient::from_fields_lossy(fields)
    }

    /// `geoipData` wins over the older `geo`.
    #[must_use]
    pub fn geo_payload(&self) -> Option<&Value> {
        self.geoip_data.as_ref().or(self.geo.as_ref())
    }

    /// `name` wins over `linkName`.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.link_name.as_deref())
    }

    /// `qrIdentifier` wins over the older `qrCodeId`.
    #[must_use]
    pub fn qr_identifier(&self) -> Option<&str> {
        self.qr_identifier
            .as_deref()
            .or(self.qr_code_id.as_deref())
    }

    /// The explicit `projectId`, falling back to the id inside `projectDetails`.
    #[must_use]
    pub fn project_id(&self) -> Option<String> {
        self.project_id
            .clone()
            .or_else(|| self.project_details.as_ref().and_then(project_id_of))
    }
}

/// Creation metadata stamped on a link.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCreated {
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub user_id: Option<String>,
}

/// A shortened URL owning zero or one product and many clicks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub url_short_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub long_link: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub short_link: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub link_value: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub page_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub site_retailer: Option<String>,
    #[serde(
        default,
        rename = "siteplainname",
        deserialize_with = "lenient::opt_string"
    )]
    pub site_plain_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_json")]
    pub link_tags: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_json")]
    pub utm_parameters: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_json")]
    pub project_details: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_nested")]
    pub created: Option<LinkCreated>,
    #[serde(
        default,
        rename = "linkactiveflag",
        deserialize_with = "lenient::opt_bool"
    )]
    pub link_active: Option<bool>,
}

impl Link {
    /// Decodes a link from a document's field map.
    ///
    /// # Errors
    ///
    /// Fails only on structurally invalid input.
    pub fn from_fields(fields: &serde_json::Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields.clone()))
    }

    /// `siteRetailer`, or the older `siteplainname` spelling.
    #[must_use]
    pub fn retailer(&self) -> Option<&str> {
        self.site_retailer
            .as_deref()
            .or(self.site_plain_name.as_deref())
    }

    #[must_use]
    pub fn project_id(&self) -> Option<String> {
        self.project_details.as_ref().and_then(project_id_of)
    }
}

/// A catalog product a link may point at.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub product_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub upc: Option<String>,
}

impl Product {
    /// Decodes a product from a document's field map.
    ///
    /// # Errors
    ///
    /// Fails only on structurally invalid input.
    pub fn from_fields(fields: &serde_json::Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields.clone()))
    }
}

// `projectDetails` has been written as `{projectId}` and as `{id}`.
fn project_id_of(details: &Value) -> Option<String> {
    details
        .get("projectId")
        .or_else(|| details.get("id"))
        .and_then(lenient::scalar_string)
}
