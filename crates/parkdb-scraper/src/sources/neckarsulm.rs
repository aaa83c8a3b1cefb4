//! City of Neckarsulm parking export (CSV or XLSX).
//!
//! The export uses German column names, decimal commas in coordinates, and
//! is not guaranteed to keep its column order, so rows are mapped by header.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parkdb_core::{lot_id, ImportSourceResult, LotData, LotInfo, LotType, PoolInfo};

use super::{SourceAdapter, SourceFuture};
use crate::batch::{import_table as import_rows, RecordError};
use crate::client::{is_remote_location, HttpClient};
use crate::error::ScraperError;
use crate::mapping::{FieldMapper, HeaderColumn, RawRecord};
use crate::normalize::{map_lot_type, normalize_decimal_comma, parse_flag};
use crate::table::{decode_table, Table};
use crate::validate::{check_lot_info, validate_record, FieldKind, FieldSpec, GeoBounds, Schema};

pub const SOURCE_ID: &str = "neckarsulm";
const KEY_FIELD: &str = "uid";

/// Export columns in the order the city publishes them.
pub const CANONICAL_FIELDS: &[&str] = &[
    "uid",
    "name",
    "type",
    "lat",
    "lon",
    "street",
    "postcode",
    "city",
    "max_stay",
    "capacity",
    "capacity_carsharing",
    "capacity_charging",
    "capacity_women",
    "capacity_disabled",
    "has_fee",
    "opening_hours",
    "opening_hours_monday",
    "opening_hours_tuesday",
    "opening_hours_wednesday",
    "opening_hours_thursday",
    "opening_hours_friday",
    "opening_hours_saturday",
    "opening_hours_sunday",
    "opening_hours_public_holiday",
    "opening_days",
];

pub const HEADER_COLUMNS: &[HeaderColumn] = &[
    HeaderColumn::required("id", "uid"),
    HeaderColumn::required("name", "name"),
    HeaderColumn::required("kategorie", "type"),
    HeaderColumn::required("y-koord", "lat"),
    HeaderColumn::required("x-koord", "lon"),
    HeaderColumn::optional("strasse", "street"),
    HeaderColumn::optional("plz", "postcode"),
    HeaderColumn::optional("stadt", "city"),
    HeaderColumn::optional("maxparken_1", "max_stay"),
    HeaderColumn::required("anz_plaetze", "capacity"),
    HeaderColumn::optional("anzcarsharing", "capacity_carsharing"),
    HeaderColumn::optional("anzeladestation", "capacity_charging"),
    HeaderColumn::optional("anzfrauenpark", "capacity_women"),
    HeaderColumn::optional("anzbehinderte", "capacity_disabled"),
    HeaderColumn::optional("gebuehren", "has_fee"),
    HeaderColumn::optional("open_time", "opening_hours"),
    HeaderColumn::optional("open_mo", "opening_hours_monday"),
    HeaderColumn::optional("open_di", "opening_hours_tuesday"),
    HeaderColumn::optional("open_mi", "opening_hours_wednesday"),
    HeaderColumn::optional("open_do", "opening_hours_thursday"),
    HeaderColumn::optional("open_fr", "opening_hours_friday"),
    HeaderColumn::optional("open_sa", "opening_hours_saturday"),
    HeaderColumn::optional("open_so", "opening_hours_sunday"),
    HeaderColumn::optional("open_feier", "opening_hours_public_holiday"),
    HeaderColumn::optional("open_day", "opening_days"),
];

pub const LOT_TYPES: &[(&str, LotType)] = &[
    ("Parkplatz", LotType::OffStreetParkingGround),
    ("Wanderparkplatz", LotType::OffStreetParkingGround),
    ("Parkhaus", LotType::CarPark),
    ("Tiefgarage", LotType::Underground),
    ("p+r", LotType::ParkAndRide),
];

const TEXT: FieldKind = FieldKind::Text { max_length: 255 };
const COUNT: FieldKind = FieldKind::Integer {
    min: Some(0),
    max: None,
};

const ROW_SCHEMA: &Schema = &[
    FieldSpec::required("uid", FieldKind::Integer { min: None, max: None }),
    FieldSpec::required("name", TEXT),
    FieldSpec::required("type", TEXT),
    FieldSpec::required("lat", FieldKind::Decimal { min: Some(40), max: Some(60) }),
    FieldSpec::required("lon", FieldKind::Decimal { min: Some(7), max: Some(10) }),
    FieldSpec::optional("street", TEXT),
    FieldSpec::optional("postcode", TEXT),
    FieldSpec::optional("city", TEXT),
    FieldSpec::optional("max_stay", TEXT),
    FieldSpec::required("capacity", COUNT),
    FieldSpec::optional("capacity_carsharing", COUNT),
    FieldSpec::optional("capacity_charging", COUNT),
    FieldSpec::optional("capacity_women", COUNT),
    FieldSpec::optional("capacity_disabled", COUNT),
    FieldSpec::optional("has_fee", TEXT),
    FieldSpec::optional("opening_hours", TEXT),
];

const BOUNDS: GeoBounds = GeoBounds {
    min_latitude: 40,
    max_latitude: 60,
    min_longitude: 7,
    max_longitude: 10,
};

/// Static lots from the city's export. There is no live data.
pub struct NeckarsulmSource {
    pool: PoolInfo,
    client: HttpClient,
    location: String,
    timeout: Option<Duration>,
}

impl NeckarsulmSource {
    /// `location` is a local path or an `http(s)` URL.
    #[must_use]
    pub fn new(client: HttpClient, location: String, timeout_secs: Option<u64>) -> Self {
        let pool = PoolInfo {
            id: SOURCE_ID.to_string(),
            name: "Stadt Neckarsulm".to_string(),
            public_url: "https://www.neckarsulm.de".to_string(),
            source_url: Some(location.clone()),
            timezone: "Europe/Berlin".to_string(),
            attribution_license: None,
            attribution_contributor: Some("Stadt Neckarsulm".to_string()),
        };
        Self {
            pool,
            client,
            location,
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }

    async fn read_export(&self) -> Result<Vec<u8>, ScraperError> {
        if is_remote_location(&self.location) {
            return self
                .client
                .get_bytes(self.location.trim(), &[], self.timeout)
                .await;
        }
        tokio::fs::read(&self.location)
            .await
            .map_err(|source| ScraperError::Io {
                path: self.location.clone(),
                source,
            })
    }

    async fn lot_infos(&self) -> Result<ImportSourceResult<LotInfo>, ScraperError> {
        let bytes = self.read_export().await?;
        let table = decode_table(SOURCE_ID, &self.location, &bytes)?;
        import_table(&table, Utc::now())
    }
}

impl SourceAdapter for NeckarsulmSource {
    fn pool(&self) -> &PoolInfo {
        &self.pool
    }

    fn fetch_lot_infos(&self) -> SourceFuture<'_, ImportSourceResult<LotInfo>> {
        Box::pin(self.lot_infos())
    }

    fn fetch_lot_data(&self) -> SourceFuture<'_, ImportSourceResult<LotData>> {
        Box::pin(async { Ok(ImportSourceResult::new()) })
    }
}

/// Converts a decoded export into lots, mapping columns by header.
///
/// # Errors
///
/// Returns [`ScraperError::Mapping`] when a mandatory column is missing from
/// the header.
pub fn import_table(
    table: &Table,
    now: DateTime<Utc>,
) -> Result<ImportSourceResult<LotInfo>, ScraperError> {
    let mapper = FieldMapper::header_driven(HEADER_COLUMNS, &table.header)?;
    let result = import_rows(
        table,
        &mapper,
        KEY_FIELD,
        |record| lot_info_from_row(record, now),
        |lot: &LotInfo| lot.id.as_str(),
    )?;
    tracing::debug!(
        source = SOURCE_ID,
        items = result.items.len(),
        errors = result.errors.len(),
        "imported export"
    );
    Ok(result)
}

fn lot_info_from_row(mut record: RawRecord, now: DateTime<Utc>) -> Result<LotInfo, RecordError> {
    for field in ["lat", "lon"] {
        if let Some(value) = record.get_mut(field) {
            *value = normalize_decimal_comma(value).into_owned();
        }
    }
    let row = validate_record(&record, ROW_SCHEMA)?;

    let uid = row.integer("uid").unwrap_or_default();
    let mut lot = LotInfo::new(
        lot_id(SOURCE_ID, &uid.to_string()),
        row.text("name").unwrap_or_default(),
    );
    lot.lot_type = row.text("type").and_then(|t| map_lot_type(t, LOT_TYPES));
    lot.latitude = row.decimal("lat");
    lot.longitude = row.decimal("lon");
    lot.address = address(
        row.text("street"),
        row.text("postcode"),
        row.text("city"),
    );
    lot.max_stay = row.text("max_stay").map(str::to_string);
    lot.capacity = row.count("capacity");
    lot.capacity_carsharing = row.count("capacity_carsharing");
    lot.capacity_charging = row.count("capacity_charging");
    lot.capacity_women = row.count("capacity_women");
    lot.capacity_disabled = row.count("capacity_disabled");
    lot.has_fee = row.text("has_fee").and_then(parse_flag);
    lot.opening_hours = row.text("opening_hours").map(str::to_string);
    lot.static_data_updated_at = Some(now);

    check_lot_info(&lot, Some(BOUNDS))?;
    Ok(lot)
}

fn address(street: Option<&str>, postcode: Option<&str>, city: Option<&str>) -> Option<String> {
    if street.is_none() && postcode.is_none() && city.is_none() {
        return None;
    }
    Some(format!(
        "{}, {} {}",
        street.unwrap_or_default(),
        postcode.unwrap_or_default(),
        city.unwrap_or_default()
    ))
}
