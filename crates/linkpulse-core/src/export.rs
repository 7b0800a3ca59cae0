//! Validation of click export requests.
//!
//! The HTTP layer deserializes query parameters into [`RawExportRequest`]
//! and calls [`RawExportRequest::validate`]; everything downstream works
//! with the checked [`ExportRequest`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clicks::SourceType;

/// Longest span, in days, a single export may cover.
pub const MAX_EXPORT_RANGE_DAYS: i64 = 365;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    #[error("invalid {field} '{value}': expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("start_date must be on or before end_date")]
    InvertedRange,

    #[error("date range of {days} days exceeds the maximum of {max} days")]
    RangeTooLarge { days: i64, max: i64 },

    #[error("invalid type '{0}': expected one of clicks, links, qr")]
    InvalidType(String),

    #[error("invalid format '{0}': expected one of json, csv")]
    InvalidFormat(String),
}

/// Which clicks an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    /// Every click.
    #[default]
    Clicks,
    /// Short-link visits only.
    Links,
    /// QR scans only.
    Qr,
}

impl ExportType {
    /// Source-type filter implied by the export type; `None` means all.
    #[must_use]
    pub fn source_filter(self) -> Option<SourceType> {
        match self {
            ExportType::Clicks => None,
            ExportType::Links => Some(SourceType::Link),
            ExportType::Qr => Some(SourceType::Qr),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExportType::Clicks => "clicks",
            ExportType::Links => "links",
            ExportType::Qr => "qr",
        }
    }
}

impl FromStr for ExportType {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clicks" => Ok(ExportType::Clicks),
            "links" => Ok(ExportType::Links),
            "qr" => Ok(ExportType::Qr),
            _ => Err(ExportError::InvalidType(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(ExportError::InvalidFormat(s.to_owned())),
        }
    }
}

/// Export parameters exactly as the caller sent them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExportRequest {
    #[serde(rename = "type")]
    pub export_type: Option<String>,
    pub project_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub format: Option<String>,
}

/// A validated export request. `end_date` is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    pub export_type: ExportType,
    pub project_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub format: ExportFormat,
}

impl RawExportRequest {
    /// Checks presence, date shape, range, and enum membership.
    ///
    /// # Errors
    ///
    /// Returns the first [`ExportError`] found, in that order. All missing
    /// parameters are reported together.
    pub fn validate(&self) -> Result<ExportRequest, ExportError> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        let start = present(&self.start_date);
        let end = present(&self.end_date);
        let project_id = present(&self.project_id);

        let mut missing = Vec::new();
        if start.is_none() {
            missing.push("start_date");
        }
        if end.is_none() {
            missing.push("end_date");
        }
        if project_id.is_none() {
            missing.push("project_id");
        }
        let (Some(start), Some(end), Some(project_id)) = (start, end, project_id) else {
            return Err(ExportError::MissingParameters(missing));
        };

        let start_date = parse_date("start_date", &start)?;
        let end_date = parse_date("end_date", &end)?;
        if start_date > end_date {
            return Err(ExportError::InvertedRange);
        }
        let days = (end_date - start_date).num_days();
        if days > MAX_EXPORT_RANGE_DAYS {
            return Err(ExportError::RangeTooLarge {
                days,
                max: MAX_EXPORT_RANGE_DAYS,
            });
        }

        let export_type = match present(&self.export_type) {
            Some(raw) => raw.parse()?,
            None => ExportType::default(),
        };
        let format = match present(&self.format) {
            Some(raw) => raw.parse()?,
            None => ExportFormat::default(),
        };

        Ok(ExportRequest {
            export_type,
            project_id,
            start_date,
            end_date,
            format,
        })
    }
}

impl ExportRequest {
    /// Half-open UTC window `[start 00:00, day after end 00:00)`.
    #[must_use]
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = Utc.from_utc_datetime(&self.start_date.and_time(chrono::NaiveTime::MIN));
        let until = Utc.from_utc_datetime(&self.end_date.and_time(chrono::NaiveTime::MIN))
            + Duration::days(1);
        (from, until)
    }

    #[must_use]
    pub fn filename(&self) -> String {
        format!(
            "link_clicks_{}_{}_to_{}.{}",
            self.project_id,
            self.start_date.format(DATE_FORMAT),
            self.end_date.format(DATE_FORMAT),
            self.format.extension()
        )
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ExportError> {
    // chrono accepts "2025-1-5" for %Y-%m-%d; require the zero-padded form.
    let well_formed = value.len() == 10
        && value
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if !well_formed {
        return Err(ExportError::InvalidDate {
            field,
            value: value.to_owned(),
        });
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ExportError::InvalidDate {
        field,
        value: value.to_owned(),
    })
}
