//! Geo field coalescing.
//!
//! Click documents carry their geo payload in one of two naming families:
//! the structured camelCase form written by the current capture service
//! (`cityName`, `countryName`, `postalCode`, `state: [{isoCode, name}]`)
//! and the flat lowercase form written by the legacy GeoIP lookup (`city`,
//! `country`, `postal`, `region`). Each concept is resolved by a fixed
//! (primary, fallback) pair; the primary wins whenever it is present.

use serde::Serialize;
use serde_json::Value;

use crate::lenient::scalar_string;

/// One canonical geo concept and the two keys it may be stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoField {
    City,
    Country,
    PostalCode,
    /// Primary source is the first entry of the `state` list, not a flat key.
    Region,
}

impl GeoField {
    pub const ALL: [GeoField; 4] = [
        GeoField::City,
        GeoField::Country,
        GeoField::PostalCode,
        GeoField::Region,
    ];

    /// Key of the camelCase family. For [`GeoField::Region`] this names the
    /// list whose first element supplies the value.
    #[must_use]
    pub fn primary_key(self) -> &'static str {
        match self {
            GeoField::City => "cityName",
            GeoField::Country => "countryName",
            GeoField::PostalCode => "postalCode",
            GeoField::Region => "state",
        }
    }

    #[must_use]
    pub fn fallback_key(self) -> &'static str {
        match self {
            GeoField::City => "city",
            GeoField::Country => "country",
            GeoField::PostalCode => "postal",
            GeoField::Region => "region",
        }
    }

    fn primary(self, geo: &Value) -> Option<String> {
        match self {
            GeoField::Region => first_state(geo).and_then(|s| s.get("name")).and_then(scalar_string),
            _ => geo.get(self.primary_key()).and_then(scalar_string),
        }
    }

    fn fallback(self, geo: &Value) -> Option<String> {
        geo.get(self.fallback_key()).and_then(scalar_string)
    }

    /// Primary value, then fallback value, then `None`.
    #[must_use]
    pub fn resolve(self, geo: &Value) -> Option<String> {
        self.primary(geo).or_else(|| self.fallback(geo))
    }
}

/// The normalized geo columns of an enriched click.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoalescedGeo {
    pub city_name: Option<String>,
    pub country_name: Option<String>,
    pub postal_code: Option<String>,
    pub region: Option<String>,
    /// `state[0].isoCode`; the flat family has no equivalent.
    pub region_code: Option<String>,
}

/// Collapses both naming families of a geo payload into one record.
///
/// Never fails: a non-object payload, a `state` that is not a list, or a
/// list whose first entry is not an object all count as absent.
#[must_use]
pub fn coalesce_geo(geo: &Value) -> CoalescedGeo {
    if !geo.is_object() {
        return CoalescedGeo::default();
    }

    CoalescedGeo {
        city_name: GeoField::City.resolve(geo),
        country_name: GeoField::Country.resolve(geo),
        postal_code: GeoField::PostalCode.resolve(geo),
        region: GeoField::Region.resolve(geo),
        region_code: first_state(geo)
            .and_then(|s| s.get("isoCode"))
            .and_then(scalar_string),
    }
}

fn first_state(geo: &Value) -> Option<&Value> {
    geo.get("state")
        .and_then(Value::as_array)
        .and_then(|states| states.first())
        .filter(|state| state.is_object())
}
