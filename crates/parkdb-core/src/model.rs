//! Canonical parking model shared by every source adapter.
//!
//! Adapters produce [`LotInfo`] (static attributes) and [`LotData`]
//! (occupancy observations) grouped under a [`PoolInfo`]. Batch output is
//! always an [`ImportSourceResult`] so that rejected records stay visible to
//! the caller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sentinel stored in [`LotInfo::opening_hours`] for facilities that never close.
pub const OPEN_24_7: &str = "24/7";

/// A logical grouping of lots published by one provider or dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub id: String,
    pub name: String,
    pub public_url: String,
    /// Machine-readable endpoint or file the lots are read from.
    pub source_url: Option<String>,
    /// IANA timezone name, e.g. `"Europe/Berlin"`.
    pub timezone: String,
    pub attribution_license: Option<String>,
    pub attribution_contributor: Option<String>,
}

/// Canonical facility type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotType {
    OffStreetParkingGround,
    CarPark,
    Underground,
    ParkAndRide,
    OnStreet,
    Other,
}

impl std::fmt::Display for LotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotType::OffStreetParkingGround => write!(f, "OFF_STREET_PARKING_GROUND"),
            LotType::CarPark => write!(f, "CAR_PARK"),
            LotType::Underground => write!(f, "UNDERGROUND"),
            LotType::ParkAndRide => write!(f, "PARK_AND_RIDE"),
            LotType::OnStreet => write!(f, "ON_STREET"),
            LotType::Other => write!(f, "OTHER"),
        }
    }
}

/// Static description of one parking facility.
///
/// Built once per import cycle and superseded, never patched, by the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotInfo {
    /// Provider-prefixed id, see [`lot_id`].
    pub id: String,
    pub name: String,
    /// `None` when the provider code is not in the adapter's type table.
    pub lot_type: Option<LotType>,
    pub public_url: Option<String>,
    pub source_url: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<u32>,
    pub capacity_disabled: Option<u32>,
    pub capacity_charging: Option<u32>,
    pub capacity_carsharing: Option<u32>,
    pub capacity_women: Option<u32>,
    pub has_live_capacity: bool,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    /// Display text or [`OPEN_24_7`]. Not machine-parseable.
    pub opening_hours: Option<String>,
    pub operator: Option<String>,
    pub has_fee: Option<bool>,
    pub fee_description: Option<String>,
    pub max_stay: Option<String>,
    pub park_ride: Option<bool>,
    pub description: Option<String>,
    pub static_data_updated_at: Option<DateTime<Utc>>,
}

impl LotInfo {
    /// Creates a lot with only the mandatory attributes set.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lot_type: None,
            public_url: None,
            source_url: None,
            address: None,
            capacity: None,
            capacity_disabled: None,
            capacity_charging: None,
            capacity_carsharing: None,
            capacity_women: None,
            has_live_capacity: false,
            latitude: None,
            longitude: None,
            opening_hours: None,
            operator: None,
            has_fee: None,
            fee_description: None,
            max_stay: None,
            park_ride: None,
            description: None,
            static_data_updated_at: None,
        }
    }

    /// Named sub-capacities in a fixed order, for invariant checks.
    #[must_use]
    pub fn sub_capacities(&self) -> [(&'static str, Option<u32>); 4] {
        [
            ("capacity_disabled", self.capacity_disabled),
            ("capacity_charging", self.capacity_charging),
            ("capacity_carsharing", self.capacity_carsharing),
            ("capacity_women", self.capacity_women),
        ]
    }
}

/// Occupancy state of a single observation.
///
/// Every observation starts at `Nodata`; see the scraper's status derivation
/// for the transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    #[default]
    Nodata,
    Open,
    Error,
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotStatus::Nodata => write!(f, "nodata"),
            LotStatus::Open => write!(f, "open"),
            LotStatus::Error => write!(f, "error"),
        }
    }
}

/// One timestamped occupancy observation for a [`LotInfo`] id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotData {
    pub id: String,
    /// When the scraper observed the value.
    pub timestamp: DateTime<Utc>,
    /// When the source last updated the value, if it says so.
    pub lot_timestamp: Option<DateTime<Utc>>,
    pub status: LotStatus,
    pub num_free: Option<u32>,
    /// Overrides [`LotInfo::capacity`] for this observation when present.
    pub capacity: Option<u32>,
}

/// Why a record ended up in [`ImportSourceResult::errors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportErrorKind {
    /// Type, range, required-field or invariant check failed.
    Validation,
    /// A provider code or text bucket could not be mapped.
    Normalization,
    /// Provider rules exclude the record (e.g. facility out of service).
    Ignored,
}

impl std::fmt::Display for ImportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportErrorKind::Validation => write!(f, "validation"),
            ImportErrorKind::Normalization => write!(f, "normalization"),
            ImportErrorKind::Ignored => write!(f, "ignored"),
        }
    }
}

/// A rejected record, identified by its source key when one was recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecordError {
    pub uid: Option<String>,
    pub kind: ImportErrorKind,
    pub message: String,
}

impl std::fmt::Display for ImportRecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.uid {
            Some(uid) => write!(f, "{} error for {uid}: {}", self.kind, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

/// Output of one batch: accepted records in input order plus one error entry
/// per rejected record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSourceResult<T> {
    pub items: Vec<T>,
    pub errors: Vec<ImportRecordError>,
}

impl<T> Default for ImportSourceResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> ImportSourceResult<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of input records accounted for.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len() + self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.errors.is_empty()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Builds a globally unique lot id from a provider prefix and the
/// provider's own identifier.
///
/// The raw id is lower-cased; runs of characters other than ASCII
/// alphanumerics collapse into a single `-`.
#[must_use]
pub fn lot_id(prefix: &str, raw_id: &str) -> String {
    let slug = raw_id
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    format!("{prefix}-{slug}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lot_id_prefixes_numeric_ids() {
        assert_eq!(lot_id("db", "4711"), "db-4711");
    }

    #[test]
    fn lot_id_collapses_separators() {
        assert_eq!(lot_id("neckarsulm", "P 12 / Nord"), "neckarsulm-p-12-nord");
    }

    #[test]
    fn lot_status_defaults_to_nodata() {
        assert_eq!(LotStatus::default(), LotStatus::Nodata);
    }

    #[test]
    fn lot_status_serializes_lowercase() {
        let json = serde_json::to_string(&LotStatus::Error).unwrap();
        assert_eq!(json, "\"error\"");
    }

    #[test]
    fn lot_type_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&LotType::OffStreetParkingGround).unwrap();
        assert_eq!(json, "\"OFF_STREET_PARKING_GROUND\"");
        assert_eq!(LotType::CarPark.to_string(), "CAR_PARK");
    }

    #[test]
    fn import_source_result_counts_both_sequences() {
        let mut result: ImportSourceResult<LotInfo> = ImportSourceResult::new();
        assert!(result.is_empty());
        result.items.push(LotInfo::new("db-1", "Hauptbahnhof"));
        result.errors.push(ImportRecordError {
            uid: Some("2".to_string()),
            kind: ImportErrorKind::Validation,
            message: "capacity: not an integer".to_string(),
        });
        assert_eq!(result.len(), 2);
        assert!(result.has_errors());
    }

    #[test]
    fn record_error_display_includes_uid() {
        let err = ImportRecordError {
            uid: Some("7".to_string()),
            kind: ImportErrorKind::Ignored,
            message: "facility is out of service".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ignored error for 7: facility is out of service"
        );
    }

    #[test]
    fn sub_capacities_are_named() {
        let mut lot = LotInfo::new("db-1", "P1");
        lot.capacity_disabled = Some(3);
        let subs = lot.sub_capacities();
        assert_eq!(subs[0], ("capacity_disabled", Some(3)));
        assert_eq!(subs[3], ("capacity_women", None));
    }
}
