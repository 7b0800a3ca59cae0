//! Pure construction of an enriched record from its three sources.

use linkpulse_core::{ClickEvent, EnrichedClickRecord, Link, Product};
use rust_decimal::Decimal;

use crate::ports::{LinkRecord, ProductRecord};

/// Price recorded for a click.
///
/// A found product's price wins; a link without a product, a link whose
/// product is missing, and a product without a price all fall back to the
/// link's own value.
#[must_use]
pub fn effective_price(link: &Link, product: Option<&Product>) -> Option<Decimal> {
    product
        .and_then(|p| p.product_price)
        .or(link.link_value)
}

/// Flattens a click, its link, and its product into one record.
///
/// Link-sourced `name`, `page_type`, and project fields win over the click's
/// own; the click's win over the defaults.
#[must_use]
pub fn build_record(
    firestore_id: &str,
    click: &ClickEvent,
    link: Option<&LinkRecord>,
    product: Option<&ProductRecord>,
) -> EnrichedClickRecord {
    let mut record = EnrichedClickRecord::from_click(firestore_id, click);

    let Some(LinkRecord { id: link_id, link }) = link else {
        return record;
    };
    let product = product.map(|p| &p.product);

    record.link_id = Some(link_id.clone());
    if let Some(name) = &link.name {
        record.name.clone_from(name);
    }
    if let Some(page_type) = &link.page_type {
        record.page_type.clone_from(page_type);
    }
    if let Some(project_id) = link.project_id() {
        record.project_id = Some(project_id);
    }
    if link.project_details.is_some() {
        record.project_details.clone_from(&link.project_details);
    }

    record.long_link.clone_from(&link.long_link);
    record.short_link.clone_from(&link.short_link);
    record.link_value = link.link_value;
    record.site_retailer = link.retailer().map(str::to_owned);
    record.link_tags.clone_from(&link.link_tags);
    record.utm_parameters.clone_from(&link.utm_parameters);
    record.link_active = link.link_active;
    record.link_created_at = link.created.as_ref().and_then(|c| c.timestamp);
    record.link_created_by = link.created.as_ref().and_then(|c| c.user_id.clone());

    record.product_id.clone_from(&link.product_id);
    record.product_price = effective_price(link, product);
    if let Some(product) = product {
        record.product_name.clone_from(&product.name);
        record.product_brand.clone_from(&product.brand);
        record.product_category.clone_from(&product.category);
        record.product_upc.clone_from(&product.upc);
    }

    record
}
